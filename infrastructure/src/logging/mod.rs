//! Structured message journal.
//!
//! Provides [`JsonlMessageJournal`], a JSONL file writer implementing the
//! [`MessageJournal`](conductor_application::MessageJournal) port.

mod jsonl_journal;

pub use jsonl_journal::JsonlMessageJournal;

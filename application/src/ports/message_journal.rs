//! Port for the structured message journal.
//!
//! The journal keeps a machine-readable transcript of the traffic that
//! crossed the message bus. `tracing` stays responsible for diagnostics;
//! this port only records what was published and what was dropped.

use conductor_domain::AgentMessage;

/// What happened to a message on the bus.
#[derive(Debug, Clone, Copy)]
pub enum JournalEntry<'a> {
    /// Accepted and fanned out to `delivered` receivers (possibly zero).
    Published {
        message: &'a AgentMessage,
        delivered: usize,
    },
    /// Accepted by validation but discarded before fan-out.
    Dropped {
        message: &'a AgentMessage,
        reason: &'static str,
    },
}

impl<'a> JournalEntry<'a> {
    pub fn message(&self) -> &'a AgentMessage {
        match self {
            JournalEntry::Published { message, .. } | JournalEntry::Dropped { message, .. } => {
                message
            }
        }
    }

    pub fn delivered(&self) -> usize {
        match self {
            JournalEntry::Published { delivered, .. } => *delivered,
            JournalEntry::Dropped { .. } => 0,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            JournalEntry::Published { .. } => None,
            JournalEntry::Dropped { reason, .. } => Some(reason),
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, JournalEntry::Dropped { .. })
    }
}

/// Sink for journal records.
///
/// `record` is synchronous and infallible; the bus never stalls on its
/// journal.
pub trait MessageJournal: Send + Sync {
    fn record(&self, entry: JournalEntry<'_>);
}

/// Journal that discards everything.
pub struct NoMessageJournal;

impl MessageJournal for NoMessageJournal {
    fn record(&self, _entry: JournalEntry<'_>) {}
}

//! Output formatting for plans and run results

pub mod console;
pub mod formatter;

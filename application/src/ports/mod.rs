//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent;
pub mod message_journal;
pub mod planner;
pub mod progress;
pub mod resolver;

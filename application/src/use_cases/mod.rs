//! Application use cases

pub mod adaptive_planner;
pub mod orchestrator;
pub mod request_planner;

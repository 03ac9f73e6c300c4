//! Application-level configuration.
//!
//! - [`CoordinationConfig`]: bus, registry, orchestrator and planner parameters

pub mod coordination;

pub use coordination::{
    BusParams, CoordinationConfig, OrchestratorParams, PlannerParams, RegistryParams,
};

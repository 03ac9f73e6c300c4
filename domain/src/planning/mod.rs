//! Planning vocabulary
//!
//! Task classification, complexity signals and the step templates the
//! planners instantiate.

pub mod task_type;
pub mod templates;
pub mod value_objects;

pub use task_type::TaskType;
pub use templates::{FINAL_QUALITY_CHECK, StepTemplate, templates_for};
pub use value_objects::{ComplexityLevel, ComplexitySignal, PlanningContext, RequestAnalysis};

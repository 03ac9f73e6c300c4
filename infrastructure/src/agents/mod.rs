//! Tool agent implementations shipped with the conductor.

mod echo;
mod legacy_adapter;

pub use echo::EchoToolAgent;
pub use legacy_adapter::{EXECUTE_STEP_MESSAGE_TYPE, LegacyAgentAdapter};

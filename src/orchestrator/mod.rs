pub mod runner;
pub mod state;

pub use runner::{ExecutePlanOptions, WorkflowEngine};
pub use state::RunContext;

//! Shared domain types for the Crossport migration gateway.
//!
//! Everything here is plain data: code projects as they travel between the
//! gateway and the remote generator/picker services, the textual AI-plan
//! protocol, and the typed stage responses. The gateway crate owns all
//! behavior; this crate stays dependency-light so other tools can reuse the
//! wire types.

pub mod plan;
pub mod project;
pub mod response;

pub use plan::{AiPlan, Operation, PlanError};
pub use project::{CodeFile, CodeProject};
pub use response::{GeneratorResponse, PickerResponse, PlanGeneratorResponse, ReturnCode};

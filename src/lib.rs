//! Crossport: an AI-powered code-migration gateway.
//!
//! The gateway drives remote "generator" and "picker" services through named
//! workflows (migrate, plan generation/execution, test generation, retries,
//! translation improvement), streaming progress and results to registered
//! event sinks as it goes. See [`orchestrator::WorkflowEngine`] for the
//! entry points.

pub mod auth;
pub mod backup;
pub mod config;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod project_io;
pub mod rpc;
pub mod stages;

//! Stage callers: one thin wrapper per remote pipeline stage.
//!
//! Every caller follows the same contract: announce the stage on the log
//! view and flip its progress key to `in_progress`, invoke the remote method
//! (transport failures are swallowed into a `Failed` response, never
//! re-thrown raw), then either publish the stage's result events on success
//! or publish the taxonomy error's user-safe message and an `error` progress
//! update on failure.
//!
//! Generators raise the taxonomy error after publishing it; pickers return
//! the failed response instead, because the orchestrator needs the pick's
//! return code and diagnostics to drive autofix and to decide whether to
//! abort.

pub mod plan_generator;
pub mod tl_generator;
pub mod tl_picker;
pub mod ut_generator;
pub mod ut_picker;

pub use plan_generator::PlanGeneratorCaller;
pub use tl_generator::TlGeneratorCaller;
pub use tl_picker::TlPickerCaller;
pub use ut_generator::UtGeneratorCaller;
pub use ut_picker::{SUPPORTED_PICK_LANGUAGES, UtPickerCaller};

//! Caller for the unit-test picking stage.

use crate::errors::{ErrorKind, GatewayError};
use crate::events::{LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::RunContext;
use crate::rpc::{METHOD_PICK_UNITTESTS, StageTransport, UtPickerRequest, call_stage};
use crossport_common::{CodeProject, PickerResponse, ReturnCode};
use std::sync::Arc;
use tracing::{error, info};

/// Languages the remote picker can actually compile and run tests for.
/// Anything else short-circuits to the first candidate.
pub const SUPPORTED_PICK_LANGUAGES: [&str; 4] = ["dotnetframework", "dotnet8", "java8", "java21"];

#[derive(Clone)]
pub struct UtPickerCaller {
    transport: Arc<dyn StageTransport>,
}

impl UtPickerCaller {
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self { transport }
    }

    /// Pick the best test project among `test_projects`.
    ///
    /// Always returns the picker's response: the orchestrator inspects the
    /// return code to decide between aborting and autofixing. The user-safe
    /// failure message and progress/error events are published here either
    /// way, and for `FailedTestCompile`/`FailedTestExecution` the
    /// best-effort solution is re-emitted at `error` level so it stays
    /// inspectable.
    pub async fn pick(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        test_projects: &[CodeProject],
        target_language: &str,
    ) -> PickerResponse {
        ctx.events
            .log_view("UTGEN Picking unit tests...", LogLevel::Info);
        ctx.events
            .progress_update(ProgressStep::GenerateUnittests, ProgressState::InProgress);

        let response = self.pick_base(source, test_projects, target_language).await;

        if response.return_code == ReturnCode::Success {
            ctx.events
                .log_view("UTGEN Finished picking unit tests", LogLevel::Info);
            ctx.events
                .progress_update(ProgressStep::GenerateUnittests, ProgressState::Completed);
            ctx.events.ut_result(response.clone(), LogLevel::Info);
            response
        } else {
            error!(error = %response.error, "picking unit tests failed");
            let kind = if response.return_code == ReturnCode::FailedSourceCompile {
                ErrorKind::SourceCompile
            } else {
                ErrorKind::TestPick
            };
            let err = GatewayError::new(kind, response.error.clone());
            ctx.events
                .log_view(format!("UTGEN {}", err.user_message()), LogLevel::Error);
            ctx.events
                .progress_update(ProgressStep::GenerateUnittests, ProgressState::Error);
            if matches!(
                response.return_code,
                ReturnCode::FailedTestCompile | ReturnCode::FailedTestExecution
            ) {
                ctx.events.ut_result(response.clone(), LogLevel::Error);
            }
            response
        }
    }

    async fn pick_base(
        &self,
        source: &CodeProject,
        test_projects: &[CodeProject],
        target_language: &str,
    ) -> PickerResponse {
        if !SUPPORTED_PICK_LANGUAGES.contains(&target_language) {
            // deliberate fallback, not an error path
            info!(
                target_language,
                "picking unit tests is not supported for this language; returning first candidate"
            );
            return match test_projects.first() {
                Some(first) => PickerResponse::success(first.clone()),
                None => PickerResponse::failed("no test candidates supplied"),
            };
        }

        let request = UtPickerRequest {
            source_project: source.clone(),
            test_projects: test_projects.to_vec(),
            target_language: target_language.to_string(),
        };
        match call_stage(self.transport.as_ref(), METHOD_PICK_UNITTESTS, &request).await {
            Ok(response) => response,
            Err(err) => PickerResponse::failed(err.to_string()),
        }
    }
}

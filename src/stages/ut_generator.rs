//! Caller for the unit-test generation stage.

use crate::errors::{ErrorKind, GatewayError};
use crate::events::{LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::RunContext;
use crate::rpc::{METHOD_GENERATE_UNITTESTS, StageTransport, UtGeneratorRequest, call_stage};
use crossport_common::{CodeProject, GeneratorResponse, ReturnCode};
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct UtGeneratorCaller {
    transport: Arc<dyn StageTransport>,
}

impl UtGeneratorCaller {
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self { transport }
    }

    /// Generate unit-test candidate projects for `source`.
    ///
    /// The picker owns the `completed` transition for the test step, so a
    /// successful generation only publishes the candidates.
    pub async fn generate(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        test_project: Option<&CodeProject>,
        target_language: &str,
        instruction: &str,
    ) -> Result<GeneratorResponse, GatewayError> {
        ctx.events
            .log_view("UTGEN Generating unit test candidates...", LogLevel::Info);
        ctx.events
            .progress_update(ProgressStep::GenerateUnittests, ProgressState::InProgress);

        let response = self
            .generate_base(source, test_project, target_language, instruction)
            .await;

        if response.return_code == ReturnCode::Success {
            ctx.events.ut_candidates(response.solutions.clone());
            ctx.events.log_view(
                "UTGEN Finished generating unit test candidates",
                LogLevel::Info,
            );
            Ok(response)
        } else {
            ctx.events
                .progress_update(ProgressStep::GenerateUnittests, ProgressState::Error);
            error!(error = %response.error, "generating unit tests failed");
            let err = GatewayError::new(ErrorKind::TestGeneration, response.error);
            ctx.events
                .log_view(format!("UTGEN {}", err.user_message()), LogLevel::Error);
            Err(err.notified())
        }
    }

    async fn generate_base(
        &self,
        source: &CodeProject,
        test_project: Option<&CodeProject>,
        target_language: &str,
        instruction: &str,
    ) -> GeneratorResponse {
        let request = UtGeneratorRequest {
            source_project: source.clone(),
            test_project: test_project.cloned().unwrap_or_default(),
            target_language: target_language.to_string(),
            instruction: instruction.to_string(),
        };
        match call_stage(self.transport.as_ref(), METHOD_GENERATE_UNITTESTS, &request).await {
            Ok(response) => response,
            Err(err) => GeneratorResponse::failed(err.to_string()),
        }
    }
}

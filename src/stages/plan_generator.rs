//! Caller for the plan generation stage.

use crate::errors::{ErrorKind, GatewayError};
use crate::events::{LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::RunContext;
use crate::rpc::{METHOD_GENERATE_PLAN, StageTransport, TlGeneratorRequest, call_stage};
use crossport_common::{CodeProject, PlanGeneratorResponse, ReturnCode};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct PlanGeneratorCaller {
    transport: Arc<dyn StageTransport>,
}

impl PlanGeneratorCaller {
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self { transport }
    }

    /// Ask the remote service for an execution plan for `source`.
    pub async fn generate(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        target_language: &str,
        instruction: &str,
    ) -> Result<PlanGeneratorResponse, GatewayError> {
        let msg = format!(
            "PLANGEN Generating plan for {} ({target_language})",
            source.display_name
        );
        ctx.events.log_view(msg.clone(), LogLevel::Info);
        info!(instruction, "{msg}");
        ctx.events
            .progress_update(ProgressStep::Translate, ProgressState::InProgress);

        let response = self.base(source, target_language, instruction).await;

        if response.return_code == ReturnCode::Success {
            ctx.events.log_view(
                format!("PLANGEN Finished {target_language} plan..."),
                LogLevel::Info,
            );
            ctx.events
                .progress_update(ProgressStep::Translate, ProgressState::Completed);
            Ok(response)
        } else {
            ctx.events
                .progress_update(ProgressStep::Translate, ProgressState::Error);
            error!(error = %response.error, "generating plan failed");
            let err = GatewayError::new(ErrorKind::PlanGeneration, response.error);
            ctx.events
                .log_view(format!("PLANGEN {}", err.user_message()), LogLevel::Error);
            Err(err.notified())
        }
    }

    async fn base(
        &self,
        source: &CodeProject,
        target_language: &str,
        instruction: &str,
    ) -> PlanGeneratorResponse {
        // the plan generator shares the translation service's request shape
        let request = TlGeneratorRequest {
            source_project: source.clone(),
            target_language: target_language.to_string(),
            model: String::new(),
            instruction: instruction.to_string(),
        };
        match call_stage(self.transport.as_ref(), METHOD_GENERATE_PLAN, &request).await {
            Ok(response) => response,
            Err(err) => PlanGeneratorResponse::failed(err.to_string()),
        }
    }
}

//! Caller for the translation generation stage.
//!
//! Also owns the pre-migration assessment, which goes through the same
//! remote service with a dedicated method.

use crate::errors::{ErrorKind, GatewayError};
use crate::events::{LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::RunContext;
use crate::rpc::{
    METHOD_ASSESS, METHOD_GENERATE_TRANSLATIONS, StageTransport, TlGeneratorRequest, call_stage,
};
use crossport_common::{CodeProject, GeneratorResponse, ReturnCode};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct TlGeneratorCaller {
    transport: Arc<dyn StageTransport>,
}

impl TlGeneratorCaller {
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self { transport }
    }

    /// Generate translation candidates for `source` into `target_language`.
    pub async fn generate(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        target_language: &str,
        model: &str,
        instruction: &str,
    ) -> Result<GeneratorResponse, GatewayError> {
        let msg = format!("Translating code to language {target_language}...");
        ctx.events.log_view(format!("TLGEN {msg}"), LogLevel::Info);
        info!("{msg}");
        ctx.events
            .progress_update(ProgressStep::Translate, ProgressState::InProgress);

        let response = self
            .base(source, target_language, model, instruction, METHOD_GENERATE_TRANSLATIONS)
            .await;

        if response.return_code == ReturnCode::Success {
            ctx.events
                .translation_candidates(response.clone(), LogLevel::Info);
            ctx.events.log_view(
                format!("TLGEN Finished {target_language} translation candidates..."),
                LogLevel::Info,
            );
            ctx.events
                .progress_update(ProgressStep::Translate, ProgressState::Completed);
            Ok(response)
        } else {
            ctx.events
                .progress_update(ProgressStep::Translate, ProgressState::Error);
            error!(error = %response.error, "generating translations failed");
            let err = GatewayError::new(ErrorKind::TranslationGeneration, response.error);
            ctx.events
                .log_view(format!("TLGEN {}", err.user_message()), LogLevel::Error);
            Err(err.notified())
        }
    }

    /// Assess a source project ahead of migration. The result travels over
    /// the assessment event; a missing result is an internal error (the
    /// wrapper publishes the generic user message).
    pub async fn assess(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        target_language: &str,
    ) -> Result<GeneratorResponse, GatewayError> {
        ctx.events
            .log_view("PLANGEN Assessing source project...", LogLevel::Info);
        info!("assessing source project");

        let mut response = self
            .base(source, target_language, "", "", METHOD_ASSESS)
            .await;

        if response.solutions.is_empty() {
            if response.error.is_empty() {
                response.error =
                    "No error message provided, but no assessment was returned".to_string();
            }
            ctx.events.log_view(
                "PLANGEN Error occurred while assessing source project",
                LogLevel::Error,
            );
            return Err(GatewayError::internal(format!(
                "assessing source project failed: {}",
                response.error
            )));
        }

        ctx.events
            .log_view("PLANGEN Finished assessing source project...", LogLevel::Info);
        ctx.events.assessment_result(response.clone(), LogLevel::Info);
        Ok(response)
    }

    async fn base(
        &self,
        source: &CodeProject,
        target_language: &str,
        model: &str,
        instruction: &str,
        method: &str,
    ) -> GeneratorResponse {
        let request = TlGeneratorRequest {
            source_project: source.clone(),
            target_language: target_language.to_string(),
            model: model.to_string(),
            instruction: instruction.to_string(),
        };
        match call_stage(self.transport.as_ref(), method, &request).await {
            Ok(response) => response,
            Err(err) => GeneratorResponse::failed(err.to_string()),
        }
    }
}

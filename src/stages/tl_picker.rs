//! Caller for the translation picking stage.

use crate::errors::{ErrorKind, GatewayError};
use crate::events::{LogLevel, ProgressState, ProgressStep};
use crate::orchestrator::RunContext;
use crate::rpc::{METHOD_PICK_TRANSLATION, StageTransport, TlPickerRequest, call_stage};
use crossport_common::{CodeProject, PickerResponse, ReturnCode};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct TlPickerCaller {
    transport: Arc<dyn StageTransport>,
}

impl TlPickerCaller {
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self { transport }
    }

    /// Validate translation candidates against the picked test project and
    /// return the picker's choice.
    ///
    /// Like the unit-test picker, this returns the response rather than
    /// raising; the orchestrator decides whether a non-success aborts the
    /// run. Failed-but-inspectable results are re-emitted at `error` level.
    pub async fn pick(
        &self,
        ctx: &RunContext,
        source: &CodeProject,
        test_project: &CodeProject,
        translations: &[CodeProject],
        target_language: &str,
    ) -> PickerResponse {
        info!("translation picker started");
        ctx.events.log_view(
            format!(
                "TLVAL Validating {target_language} translation candidates against generated unit tests..."
            ),
            LogLevel::Info,
        );
        ctx.events
            .progress_update(ProgressStep::Validate, ProgressState::InProgress);

        let response = self
            .pick_base(source, test_project, translations, target_language)
            .await;
        info!("translation picker done");

        if response.return_code == ReturnCode::Success {
            ctx.events
                .translation_result(response.clone(), LogLevel::Info);
            info!(solution = %response.solution, "best translation selected");
            ctx.events.log_view(
                format!("TLVAL {target_language} code validation successful"),
                LogLevel::Info,
            );
            ctx.events
                .progress_update(ProgressStep::Validate, ProgressState::Completed);
            response
        } else {
            error!(error = %response.error, "picking translation failed");
            let err = GatewayError::new(ErrorKind::TranslationPick, response.error.clone());
            ctx.events
                .log_view(format!("TLVAL {}", err.user_message()), LogLevel::Error);
            ctx.events
                .progress_update(ProgressStep::Validate, ProgressState::Error);
            if matches!(
                response.return_code,
                ReturnCode::FailedTestCompile | ReturnCode::FailedTestExecution
            ) {
                ctx.events
                    .translation_result(response.clone(), LogLevel::Error);
                info!(solution = %response.solution, "best failed translation");
            }
            response
        }
    }

    async fn pick_base(
        &self,
        source: &CodeProject,
        test_project: &CodeProject,
        translations: &[CodeProject],
        target_language: &str,
    ) -> PickerResponse {
        let request = TlPickerRequest {
            source_project: source.clone(),
            test_project: test_project.clone(),
            translations: translations.to_vec(),
            target_language: target_language.to_string(),
        };
        match call_stage(self.transport.as_ref(), METHOD_PICK_TRANSLATION, &request).await {
            Ok(response) => response,
            Err(err) => PickerResponse::failed(err.to_string()),
        }
    }
}

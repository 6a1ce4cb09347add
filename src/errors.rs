//! Typed error taxonomy for the gateway.
//!
//! Every failure a workflow can surface is a [`GatewayError`]: a kind, the
//! raw diagnostic from the remote service or the local subsystem, and a
//! pre-baked user-safe message derived from both. The user message is a pure
//! function of `(kind, diagnostic)` - diagnostics carrying the AI backend's
//! rate-limit or max-length signals override the kind's message with a more
//! specific one.

use crossport_common::PlanError;
use thiserror::Error;

/// Appended to every user-facing message.
pub const SUPPORT_MESSAGE: &str = " If the problem persists, please contact support.";

/// Substring the backend emits when the model provider is rate limiting.
const HIGH_DEMAND_SIGNAL: &str = "token rate limit";

/// Substring the backend emits when a prompt exceeded the provider's maximum.
const CONTENT_TOO_LARGE_SIGNAL: &str = "string_above_max_length";

/// Classification of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PlanParse,
    TranslationGeneration,
    PlanGeneration,
    TestGeneration,
    TranslationPick,
    TestPick,
    SourceCompile,
    HighDemand,
    ContentTooLarge,
    Internal,
}

impl ErrorKind {
    fn base_user_message(self) -> &'static str {
        match self {
            ErrorKind::PlanParse => {
                "Failed to read the AI plan. Please check the plan format and try again."
            }
            ErrorKind::TranslationGeneration => {
                "Failed to generate translations, please try again."
            }
            ErrorKind::PlanGeneration => "Failed to generate plan, please try again.",
            ErrorKind::TestGeneration => "Failed to generate tests, please try again.",
            ErrorKind::TranslationPick => {
                "Failed to pick translations, please fix the code and try again."
            }
            ErrorKind::TestPick => "Failed to pick tests, please fix the code and try again.",
            ErrorKind::SourceCompile => "Failed to compile source project.",
            ErrorKind::HighDemand => {
                "Request failed due to high demand. Please try again in 30 seconds."
            }
            ErrorKind::ContentTooLarge => {
                "Request failed due to the content being too long. Please remove some files and try again."
            }
            ErrorKind::Internal => "Unexpected error occurred. Please try again.",
        }
    }
}

/// Derive the user-safe message for a failure.
///
/// Backend signals in the diagnostic win over the kind's own message so the
/// user sees "high demand" rather than a generic stage failure.
pub fn user_message_for(kind: ErrorKind, diagnostic: &str) -> String {
    let base = if diagnostic.contains(HIGH_DEMAND_SIGNAL) {
        ErrorKind::HighDemand.base_user_message()
    } else if diagnostic.contains(CONTENT_TOO_LARGE_SIGNAL) {
        ErrorKind::ContentTooLarge.base_user_message()
    } else {
        kind.base_user_message()
    };
    format!("{base}{SUPPORT_MESSAGE}")
}

/// A classified gateway failure.
///
/// `notified` records whether the user-safe message has already been
/// published to the log view; stage callers publish before raising, and the
/// workflow wrapper publishes exactly once for errors that were not.
#[derive(Debug, Clone, Error)]
#[error("{diagnostic}")]
pub struct GatewayError {
    kind: ErrorKind,
    diagnostic: String,
    user_message: String,
    notified: bool,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        let user_message = user_message_for(kind, &diagnostic);
        Self {
            kind,
            diagnostic,
            user_message,
            notified: false,
        }
    }

    pub fn internal(diagnostic: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, diagnostic)
    }

    /// Mark the user-safe message as already published.
    pub fn notified(mut self) -> Self {
        self.notified = true;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }
}

impl From<PlanError> for GatewayError {
    fn from(err: PlanError) -> Self {
        GatewayError::new(ErrorKind::PlanParse, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_comes_from_kind() {
        let err = GatewayError::new(ErrorKind::TestPick, "picker exited with code 3");
        assert!(err.user_message().starts_with("Failed to pick tests"));
        assert!(err.user_message().ends_with(SUPPORT_MESSAGE));
    }

    #[test]
    fn high_demand_signal_overrides_kind_message() {
        let err = GatewayError::new(
            ErrorKind::TranslationGeneration,
            "backend: token rate limit exceeded for model",
        );
        assert!(err.user_message().contains("high demand"));
    }

    #[test]
    fn content_too_large_signal_overrides_kind_message() {
        let err = GatewayError::new(
            ErrorKind::TestGeneration,
            "openai error: string_above_max_length",
        );
        assert!(err.user_message().contains("too long"));
    }

    #[test]
    fn display_is_the_diagnostic() {
        let err = GatewayError::new(ErrorKind::PlanGeneration, "upstream timed out");
        assert_eq!(err.to_string(), "upstream timed out");
    }

    #[test]
    fn notified_is_sticky() {
        let err = GatewayError::internal("boom");
        assert!(!err.is_notified());
        assert!(err.notified().is_notified());
    }

    #[test]
    fn plan_errors_convert_to_plan_parse() {
        let err: GatewayError = PlanError::Parse("not a plan".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::PlanParse);
        assert!(err.diagnostic().contains("not a plan"));
    }
}

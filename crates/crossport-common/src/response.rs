//! Typed outcomes of the remote pipeline stages.
//!
//! Two shapes cover every stage: generators return a set of candidate
//! projects, pickers return the single selected solution plus the diagnostic
//! output of the validation run. The plan generator returns a parsed plan.

use crate::plan::AiPlan;
use crate::project::CodeProject;
use serde::{Deserialize, Serialize};

/// Status of a remote stage invocation.
///
/// Anything other than `Success` means the payload must not be trusted, with
/// one exception: `FailedTestCompile` and `FailedTestExecution` still carry a
/// best-effort solution so the user can inspect what failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCode {
    Success,
    #[default]
    Failed,
    FailedSourceCompile,
    FailedTestCompile,
    FailedTestExecution,
}

/// Response shape shared by the unit-test and translation generators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorResponse {
    #[serde(default)]
    pub solutions: Vec<CodeProject>,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub return_code: ReturnCode,
}

impl GeneratorResponse {
    pub fn success(solutions: Vec<CodeProject>) -> Self {
        Self {
            solutions,
            error: String::new(),
            return_code: ReturnCode::Success,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            solutions: Vec::new(),
            error: error.into(),
            return_code: ReturnCode::Failed,
        }
    }
}

/// Response shape shared by the unit-test and translation pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickerResponse {
    #[serde(default)]
    pub solution: CodeProject,
    #[serde(default)]
    pub test_output: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub return_code: ReturnCode,
}

impl PickerResponse {
    pub fn success(solution: CodeProject) -> Self {
        Self {
            solution,
            test_output: String::new(),
            error: String::new(),
            return_code: ReturnCode::Success,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            solution: CodeProject::default(),
            test_output: String::new(),
            error: error.into(),
            return_code: ReturnCode::Failed,
        }
    }
}

/// Response of the plan-generation stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanGeneratorResponse {
    #[serde(default)]
    pub plan: AiPlan,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub return_code: ReturnCode,
}

impl PlanGeneratorResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            plan: AiPlan::default(),
            error: error.into(),
            return_code: ReturnCode::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::CodeFile;

    #[test]
    fn return_code_serializes_snake_case() {
        let json = serde_json::to_string(&ReturnCode::FailedTestExecution).unwrap();
        assert_eq!(json, "\"failed_test_execution\"");
    }

    #[test]
    fn generator_response_deserializes_with_defaults() {
        let response: GeneratorResponse =
            serde_json::from_str(r#"{"return_code":"success"}"#).unwrap();
        assert_eq!(response.return_code, ReturnCode::Success);
        assert!(response.solutions.is_empty());
        assert!(response.error.is_empty());
    }

    #[test]
    fn picker_response_round_trips() {
        let response = PickerResponse {
            solution: CodeProject::new(
                vec![CodeFile::new("Tests.cs", "[Test] void T() {}")],
                "dotnet8",
                None,
                None,
            ),
            test_output: "2 passed".to_string(),
            error: String::new(),
            return_code: ReturnCode::Success,
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: PickerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn failed_constructors_carry_the_error() {
        let generator = GeneratorResponse::failed("connection refused");
        assert_eq!(generator.return_code, ReturnCode::Failed);
        assert_eq!(generator.error, "connection refused");
        let picker = PickerResponse::failed("timed out");
        assert_eq!(picker.return_code, ReturnCode::Failed);
        assert_eq!(picker.error, "timed out");
    }
}

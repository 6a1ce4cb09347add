//! Boundary to the remote generator/picker services.
//!
//! Each stage caller issues one request/response invocation against a named
//! remote method. The transport itself is pluggable behind [`StageTransport`]
//! so tests can script responses; the production adapter speaks JSON over
//! HTTP ([`HttpStageTransport`]).

mod http;

pub use http::HttpStageTransport;

use anyhow::Result;
use crossport_common::CodeProject;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const METHOD_GENERATE_UNITTESTS: &str = "generate_unittests";
pub const METHOD_PICK_UNITTESTS: &str = "pick_unittests";
pub const METHOD_GENERATE_TRANSLATIONS: &str = "generate_translations";
pub const METHOD_PICK_TRANSLATION: &str = "pick_translation";
pub const METHOD_GENERATE_PLAN: &str = "generate_plan";
pub const METHOD_ASSESS: &str = "assess";

/// One request/response call to a named remote method.
///
/// Implementations own their timeout policy; a timeout surfaces as an
/// ordinary error from `invoke`, which the stage callers convert into a
/// `Failed` response - it never reaches the orchestrator raw.
#[async_trait::async_trait]
pub trait StageTransport: Send + Sync {
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value>;
}

/// Serialize a typed request, invoke the method, deserialize the response.
pub(crate) async fn call_stage<Req, Resp>(
    transport: &dyn StageTransport,
    method: &str,
    request: &Req,
) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_value(request)?;
    let raw = transport.invoke(method, payload).await?;
    Ok(serde_json::from_value(raw)?)
}

#[derive(Debug, Clone, Serialize)]
pub struct UtGeneratorRequest {
    pub source_project: CodeProject,
    pub test_project: CodeProject,
    pub target_language: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtPickerRequest {
    pub source_project: CodeProject,
    pub test_projects: Vec<CodeProject>,
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TlGeneratorRequest {
    pub source_project: CodeProject,
    pub target_language: String,
    pub model: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TlPickerRequest {
    pub source_project: CodeProject,
    pub test_project: CodeProject,
    pub translations: Vec<CodeProject>,
    pub target_language: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossport_common::{GeneratorResponse, ReturnCode};
    use serde_json::json;

    struct EchoTransport;

    #[async_trait::async_trait]
    impl StageTransport for EchoTransport {
        async fn invoke(&self, method: &str, payload: Value) -> Result<Value> {
            assert_eq!(method, METHOD_GENERATE_TRANSLATIONS);
            assert_eq!(payload["target_language"], "dotnet8");
            Ok(json!({
                "solutions": [],
                "error": "",
                "return_code": "success"
            }))
        }
    }

    #[tokio::test]
    async fn call_stage_round_trips_typed_payloads() {
        let request = TlGeneratorRequest {
            source_project: CodeProject::default(),
            target_language: "dotnet8".to_string(),
            model: "default".to_string(),
            instruction: String::new(),
        };
        let response: GeneratorResponse =
            call_stage(&EchoTransport, METHOD_GENERATE_TRANSLATIONS, &request)
                .await
                .unwrap();
        assert_eq!(response.return_code, ReturnCode::Success);
    }
}

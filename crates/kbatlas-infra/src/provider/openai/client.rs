//! OpenAiAssistantsProvider -- concrete [`AgentProvider`] for the OpenAI
//! Assistants API (v2) or any compatible endpoint.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use kbatlas_core::provider::AgentProvider;
use kbatlas_types::config::ProviderSettings;
use kbatlas_types::error::ProviderError;
use kbatlas_types::provider::{
    AgentCreateRequest, AgentTool, CreatedAgent, FilePurpose, FileRef, FileUpload, VectorStoreRef,
};

use super::types::{
    AssistantTool, CreateAssistantRequest, CreateVectorStoreRequest, ErrorEnvelope,
    FileSearchResources, FunctionDefinition, METADATA_VALUE_LIMIT, ObjectResponse, ToolResources,
};

/// Agent provider backed by the OpenAI Assistants API.
pub struct OpenAiAssistantsProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiAssistantsProvider {
    const BETA_HEADER: &'static str = "assistants=v2";

    /// Create a provider.
    ///
    /// * `api_key` - API key wrapped in SecretString
    /// * `base_url` - API root including the version, e.g. `https://api.openai.com/v1`
    /// * `timeout` - per-request timeout
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(
        settings: &ProviderSettings,
        api_key: SecretString,
    ) -> Result<Self, ProviderError> {
        Self::new(
            api_key,
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(self.api_key.expose_secret())
            .header("OpenAI-Beta", Self::BETA_HEADER)
    }
}

// No Debug impl: keeps the client and key out of logs entirely.

/// Convert a provider-agnostic request into the Assistants wire format.
pub(crate) fn to_assistant_request(request: &AgentCreateRequest) -> CreateAssistantRequest {
    let tools = request
        .tools
        .iter()
        .map(|tool| match tool {
            AgentTool::CodeInterpreter => AssistantTool::CodeInterpreter,
            AgentTool::FileSearch => AssistantTool::FileSearch,
            AgentTool::Function {
                name,
                description,
                parameters,
            } => AssistantTool::Function {
                function: FunctionDefinition {
                    name: name.clone(),
                    description: description.clone(),
                    parameters: parameters.clone(),
                },
            },
        })
        .collect();

    let tool_resources = (!request.vector_store_ids.is_empty()).then(|| ToolResources {
        file_search: FileSearchResources {
            vector_store_ids: request.vector_store_ids.clone(),
        },
    });

    let metadata = request
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), fit_metadata_value(k, v, METADATA_VALUE_LIMIT)))
        .collect();

    CreateAssistantRequest {
        model: request.model.clone(),
        name: Some(request.name.clone()).filter(|s| !s.is_empty()),
        description: Some(request.description.clone()).filter(|s| !s.is_empty()),
        instructions: request.instructions.clone(),
        tools,
        tool_resources,
        metadata,
        temperature: request.generation.temperature,
        top_p: request.generation.top_p,
    }
}

/// Shorten a metadata value to at most `max_chars` characters.
///
/// JSON arrays lose trailing elements so the value still parses. Anything
/// else is cut at a character boundary.
fn fit_metadata_value(key: &str, value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if let Ok(serde_json::Value::Array(mut items)) = serde_json::from_str(value) {
        let total = items.len();
        let mut fitted = serde_json::Value::Array(items.clone()).to_string();
        while fitted.chars().count() > max_chars && items.pop().is_some() {
            fitted = serde_json::Value::Array(items.clone()).to_string();
        }
        tracing::warn!(
            key,
            kept = items.len(),
            dropped = total - items.len(),
            "Metadata list too long, dropped trailing entries"
        );
        return fitted;
    }

    tracing::warn!(key, limit = max_chars, "Metadata value truncated");
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Map a non-success HTTP response to a [`ProviderError`].
pub(crate) fn error_for_status(
    status: u16,
    retry_after_secs: Option<u64>,
    body: &str,
) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed,
        429 => ProviderError::RateLimited {
            retry_after_ms: retry_after_secs.map(|s| s.saturating_mul(1000)),
        },
        _ => {
            let message = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.to_string());
            ProviderError::Rejected { status, message }
        }
    }
}

async fn parse_response(response: reqwest::Response) -> Result<ObjectResponse, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        return Err(error_for_status(status.as_u16(), retry_after, &body));
    }

    response
        .json::<ObjectResponse>()
        .await
        .map_err(|e| ProviderError::Deserialization(e.to_string()))
}

fn http_err(e: reqwest::Error) -> ProviderError {
    ProviderError::Http(e.to_string())
}

impl AgentProvider for OpenAiAssistantsProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_agent(
        &self,
        request: &AgentCreateRequest,
    ) -> Result<CreatedAgent, ProviderError> {
        let body = to_assistant_request(request);
        let mut builder = self.authorized(self.client.post(self.url("/assistants")));
        if let Some(key) = request.idempotency_key {
            builder = builder.header("Idempotency-Key", key.to_string());
        }

        let response = builder.json(&body).send().await.map_err(http_err)?;
        let created = parse_response(response).await?;
        tracing::debug!(agent_id = %created.id, "Created assistant");
        Ok(CreatedAgent { id: created.id })
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), ProviderError> {
        let url = self.url(&format!("/assistants/{agent_id}"));
        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .map_err(http_err)?;
        parse_response(response).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        file: &FileUpload,
        purpose: FilePurpose,
    ) -> Result<FileRef, ProviderError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ProviderError::Http(format!("invalid mime type: {e}")))?;
        let form = Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);

        let response = self
            .authorized(self.client.post(self.url("/files")))
            .multipart(form)
            .send()
            .await
            .map_err(http_err)?;
        let uploaded = parse_response(response).await?;
        Ok(FileRef {
            id: uploaded.id,
            bytes: uploaded.bytes,
        })
    }

    async fn create_vector_store(
        &self,
        name: &str,
        file_ids: &[String],
    ) -> Result<VectorStoreRef, ProviderError> {
        let body = CreateVectorStoreRequest { name, file_ids };
        let response = self
            .authorized(self.client.post(self.url("/vector_stores")))
            .json(&body)
            .send()
            .await
            .map_err(http_err)?;
        let store = parse_response(response).await?;
        Ok(VectorStoreRef {
            id: store.id,
            name: store.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use kbatlas_types::builder::{FallbackBehavior, ToolChoice};
    use kbatlas_types::provider::GenerationParams;
    use uuid::Uuid;

    use super::*;

    fn request() -> AgentCreateRequest {
        AgentCreateRequest {
            name: "Support Bot".to_string(),
            description: String::new(),
            model: "gpt-4o".to_string(),
            instructions: "Be helpful".to_string(),
            tools: vec![
                AgentTool::FileSearch,
                AgentTool::Function {
                    name: "lookup_order".to_string(),
                    description: "Look up an order".to_string(),
                    parameters: serde_json::json!({"type": "object"}),
                },
            ],
            vector_store_ids: vec!["vs_1".to_string()],
            generation: GenerationParams {
                temperature: 0.4,
                top_p: 1.0,
                max_tokens: 2048,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
                seed: None,
                timeout_seconds: 30,
                max_retries: 3,
                fallback_behavior: FallbackBehavior::Error,
                parallel_tool_calls: true,
                tool_choice: ToolChoice::Auto,
            },
            metadata: BTreeMap::from([("environment".to_string(), "production".to_string())]),
            idempotency_key: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_wire_request_shape() {
        let wire = serde_json::to_value(to_assistant_request(&request())).unwrap();

        assert_eq!(wire["model"], "gpt-4o");
        assert_eq!(wire["name"], "Support Bot");
        assert!(wire.get("description").is_none());
        assert_eq!(wire["tools"][0], serde_json::json!({"type": "file_search"}));
        assert_eq!(wire["tools"][1]["type"], "function");
        assert_eq!(wire["tools"][1]["function"]["name"], "lookup_order");
        assert_eq!(
            wire["tool_resources"]["file_search"]["vector_store_ids"],
            serde_json::json!(["vs_1"])
        );
        assert_eq!(wire["metadata"]["environment"], "production");
        assert_eq!(wire["temperature"], 0.4);
    }

    #[test]
    fn test_no_vector_stores_omits_tool_resources() {
        let mut req = request();
        req.vector_store_ids.clear();
        let wire = serde_json::to_value(to_assistant_request(&req)).unwrap();
        assert!(wire.get("tool_resources").is_none());
    }

    #[test]
    fn test_long_metadata_values_are_truncated() {
        let mut req = request();
        req.metadata.insert("personality".to_string(), "é".repeat(600));
        let wire = to_assistant_request(&req);
        assert_eq!(
            wire.metadata["personality"].chars().count(),
            METADATA_VALUE_LIMIT
        );
    }

    #[test]
    fn test_long_metadata_lists_drop_trailing_entries() {
        let goals: Vec<String> = (0..40).map(|i| format!("goal number {i:02}")).collect();
        let mut req = request();
        req.metadata
            .insert("goals".to_string(), serde_json::json!(goals).to_string());

        let wire = to_assistant_request(&req);
        let fitted = &wire.metadata["goals"];
        assert!(fitted.chars().count() <= METADATA_VALUE_LIMIT);

        let kept: Vec<String> = serde_json::from_str(fitted).unwrap();
        assert!(!kept.is_empty() && kept.len() < goals.len());
        assert_eq!(kept[..], goals[..kept.len()]);
    }

    #[test]
    fn test_short_metadata_values_pass_through() {
        assert_eq!(fit_metadata_value("tags", r#"["a","b"]"#, 9), r#"["a","b"]"#);
        assert_eq!(fit_metadata_value("tags", r#"["a","b"]"#, 5), r#"["a"]"#);
        assert_eq!(fit_metadata_value("tags", r#"["abcdef"]"#, 4), "[]");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            error_for_status(401, None, ""),
            ProviderError::AuthenticationFailed
        ));
        assert!(matches!(
            error_for_status(429, Some(2), ""),
            ProviderError::RateLimited {
                retry_after_ms: Some(2000)
            }
        ));
        assert!(matches!(
            error_for_status(429, Some(u64::MAX), ""),
            ProviderError::RateLimited {
                retry_after_ms: Some(u64::MAX)
            }
        ));
        match error_for_status(400, None, r#"{"error":{"message":"model not found"}}"#) {
            ProviderError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected {other:?}"),
        }
        match error_for_status(502, None, "bad gateway") {
            ProviderError::Rejected { message, .. } => assert_eq!(message, "bad gateway"),
            other => panic!("unexpected {other:?}"),
        }
    }

    type Captured = Arc<Mutex<Vec<(HeaderMap, serde_json::Value)>>>;

    async fn spawn_stub(status: StatusCode, reply: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/v1/assistants",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| {
                        let reply = reply.clone();
                        async move {
                            captured.lock().unwrap().push((headers, body));
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), captured)
    }

    fn provider(base_url: &str) -> OpenAiAssistantsProvider {
        OpenAiAssistantsProvider::new(
            SecretString::from("sk-test".to_string()),
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_agent_sends_auth_and_idempotency_headers() {
        let (base_url, captured) =
            spawn_stub(StatusCode::OK, serde_json::json!({"id": "asst_abc"})).await;
        let req = request();

        let created = provider(&base_url).create_agent(&req).await.unwrap();
        assert_eq!(created.id, "asst_abc");

        let captured = captured.lock().unwrap();
        let (headers, body) = &captured[0];
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(headers["openai-beta"], "assistants=v2");
        assert_eq!(
            headers["idempotency-key"],
            req.idempotency_key.unwrap().to_string().as_str()
        );
        assert_eq!(body["instructions"], "Be helpful");
    }

    #[tokio::test]
    async fn test_create_agent_surfaces_rejection() {
        let (base_url, _) = spawn_stub(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": {"message": "model 'gpt-x' does not exist"}}),
        )
        .await;

        let err = provider(&base_url).create_agent(&request()).await.unwrap_err();
        assert!(err.to_string().contains("gpt-x"));
    }

    #[tokio::test]
    async fn test_delete_agent_hits_assistant_path() {
        let app = Router::new().route(
            "/v1/assistants/{id}",
            axum::routing::delete(|axum::extract::Path(id): axum::extract::Path<String>| async move {
                if id == "asst_gone" {
                    (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({"error": {"message": "No assistant found"}})),
                    )
                } else {
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({"id": id, "object": "assistant.deleted", "deleted": true})),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let provider = provider(&format!("http://{addr}/v1"));

        provider.delete_agent("asst_abc").await.unwrap();
        match provider.delete_agent("asst_gone").await.unwrap_err() {
            ProviderError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No assistant found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! Provider-agnostic agent-execution types.
//!
//! These describe what the Deployment Publisher asks of an external
//! agent-execution provider. Wire formats for a concrete provider (e.g. the
//! OpenAI Assistants API) live next to its adapter in `kbatlas-infra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builder::{FallbackBehavior, ToolChoice};

/// A tool the created agent may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentTool {
    CodeInterpreter,
    FileSearch,
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
    },
}

/// Generation parameters carried through from the advanced step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub seed: Option<i64>,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub fallback_behavior: FallbackBehavior,
    pub parallel_tool_calls: bool,
    pub tool_choice: ToolChoice,
}

/// Everything needed to create one agent resource upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCreateRequest {
    pub name: String,
    pub description: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<AgentTool>,
    /// Attached only when file search is enabled.
    pub vector_store_ids: Vec<String>,
    pub generation: GenerationParams,
    /// Opaque key/value blob for fields the provider has no slot for.
    pub metadata: BTreeMap<String, String>,
    /// Stable per builder session; lets the provider deduplicate retries.
    pub idempotency_key: Option<Uuid>,
}

/// A created agent resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAgent {
    pub id: String,
}

/// Intended use of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            FilePurpose::Assistants => "assistants",
        }
    }
}

/// A file to upload to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

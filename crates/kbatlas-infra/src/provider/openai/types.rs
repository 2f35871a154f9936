//! OpenAI Assistants API wire types.
//!
//! Only the subset of fields KB-Atlas sends or reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The API caps metadata values at 512 characters.
pub const METADATA_VALUE_LIMIT: usize = 512;

#[derive(Debug, Serialize)]
pub struct CreateAssistantRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub instructions: String,
    pub tools: Vec<AssistantTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
    pub metadata: BTreeMap<String, String>,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    CodeInterpreter,
    FileSearch,
    Function { function: FunctionDefinition },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ToolResources {
    pub file_search: FileSearchResources,
}

#[derive(Debug, Serialize)]
pub struct FileSearchResources {
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateVectorStoreRequest<'a> {
    pub name: &'a str,
    pub file_ids: &'a [String],
}

/// Any object response: assistants, files and vector stores all carry `id`.
#[derive(Debug, Deserialize)]
pub struct ObjectResponse {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

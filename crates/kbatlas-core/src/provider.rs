//! AgentProvider trait definition.
//!
//! The external agent-execution provider (e.g. an OpenAI-compatible
//! Assistants API) that deployed agents live on. The Deployment Publisher
//! depends only on these four operations and their error signaling.
//!
//! Implementations live in kbatlas-infra (e.g. `OpenAiAssistantsProvider`).

use std::future::Future;

use kbatlas_types::error::ProviderError;
use kbatlas_types::provider::{
    AgentCreateRequest, CreatedAgent, FilePurpose, FileRef, FileUpload, VectorStoreRef,
};

pub trait AgentProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Create an agent resource and return its provider-side id.
    fn create_agent(
        &self,
        request: &AgentCreateRequest,
    ) -> impl Future<Output = Result<CreatedAgent, ProviderError>> + Send;

    /// Delete a previously created agent resource.
    fn delete_agent(&self, agent_id: &str)
    -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Upload a file for use by agents.
    fn upload_file(
        &self,
        file: &FileUpload,
        purpose: FilePurpose,
    ) -> impl Future<Output = Result<FileRef, ProviderError>> + Send;

    /// Create a vector store indexing the given uploaded files.
    fn create_vector_store(
        &self,
        name: &str,
        file_ids: &[String],
    ) -> impl Future<Output = Result<VectorStoreRef, ProviderError>> + Send;
}

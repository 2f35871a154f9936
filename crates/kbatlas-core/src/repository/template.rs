//! Agent template repository trait definition.

use std::future::Future;

use kbatlas_types::error::RepositoryError;
use kbatlas_types::template::AgentTemplate;

pub trait TemplateRepository: Send + Sync {
    /// Get a template by its id.
    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<AgentTemplate>, RepositoryError>> + Send;

    /// List templates ordered by name. With `public_only`, private
    /// templates are omitted.
    fn list(
        &self,
        public_only: bool,
    ) -> impl Future<Output = Result<Vec<AgentTemplate>, RepositoryError>> + Send;

    /// Insert or replace a template by id.
    fn upsert(
        &self,
        template: &AgentTemplate,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

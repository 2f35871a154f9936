//! Builder state repository trait definition.

use std::future::Future;

use kbatlas_types::builder::{BuilderId, BuilderState, BuilderSummary, OwnerId};
use kbatlas_types::error::RepositoryError;

/// Persistence for builder sessions, one record per [`BuilderId`].
///
/// Implementations live in kbatlas-infra (e.g., `SqliteBuilderStateRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait BuilderStateRepository: Send + Sync {
    /// Insert a new session. Fails with `Conflict` if the id already exists.
    fn insert(
        &self,
        state: &BuilderState,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session by id, regardless of owner.
    fn get(
        &self,
        id: &BuilderId,
    ) -> impl Future<Output = Result<Option<BuilderState>, RepositoryError>> + Send;

    /// Overwrite a session only if its stored version equals
    /// `expected_version`.
    ///
    /// Fails with `NotFound` if the id does not exist and with
    /// `VersionConflict` if another write advanced the stored version.
    fn update(
        &self,
        state: &BuilderState,
        expected_version: u64,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// List an owner's sessions, most recently updated first.
    fn list_by_owner(
        &self,
        owner: &OwnerId,
    ) -> impl Future<Output = Result<Vec<BuilderSummary>, RepositoryError>> + Send;

    /// Delete a session. No-op if it does not exist.
    fn delete(&self, id: &BuilderId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

//! Step Controller.
//!
//! Walks a builder session through the fixed step order
//! (`basic -> instructions -> tools -> files -> advanced -> test -> deploy`),
//! merges section edits into the persisted configuration, and recomputes
//! validation over the whole configuration after every mutation.
//!
//! Navigation is free: any step can be reached from any other, in either
//! direction. Edits replace a whole section; nested fields are never merged.
//! Failures are surfaced unchanged and never retried here.

use std::sync::Arc;

use tracing::{debug, info};

use kbatlas_types::builder::{
    BuilderId, BuilderState, BuilderStep, DeploymentStatus, OwnerId, SectionUpdate,
    TestConversation,
};
use kbatlas_types::error::BuilderError;

use crate::builder::store::BuilderStore;
use crate::builder::validation::validate;
use crate::repository::builder_state::BuilderStateRepository;
use crate::repository::template::TemplateRepository;

/// Reject mutations on sessions that are deploying or already deployed.
pub(crate) fn ensure_mutable(state: &BuilderState) -> Result<(), BuilderError> {
    match state.deployment.status {
        DeploymentStatus::Deployed => Err(BuilderError::InvalidState(
            "session is already deployed; start a new builder session".to_string(),
        )),
        DeploymentStatus::Deploying => Err(BuilderError::InvalidState(
            "deployment in progress".to_string(),
        )),
        DeploymentStatus::Draft | DeploymentStatus::Failed => Ok(()),
    }
}

pub struct StepController<R: BuilderStateRepository, T: TemplateRepository> {
    store: Arc<BuilderStore<R, T>>,
}

impl<R: BuilderStateRepository, T: TemplateRepository> StepController<R, T> {
    pub fn new(store: Arc<BuilderStore<R, T>>) -> Self {
        Self { store }
    }

    /// Move the session to `target`.
    ///
    /// `leaving_edits` carries any unsaved form edits for the step being
    /// left; they are applied before validation so nothing typed is lost
    /// when switching steps.
    #[tracing::instrument(skip(self, owner, leaving_edits), fields(builder_id = %id, target = %target))]
    pub async fn navigate_to(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        target: BuilderStep,
        leaving_edits: Option<SectionUpdate>,
    ) -> Result<BuilderState, BuilderError> {
        let mut state = self.store.load(id, owner).await?;
        ensure_mutable(&state)?;
        let expected_version = state.version;
        let leaving = state.config.step;

        if let Some(update) = leaving_edits {
            state.config.apply(update);
        }
        state.validation = validate(&state.config);
        state.config.step = target;

        let state = self.store.save(id, owner, expected_version, state).await?;
        info!(
            from = %leaving,
            to = %target,
            is_valid = state.validation.is_valid,
            "Navigated builder step"
        );
        Ok(state)
    }

    /// Replace one configuration section wholesale and re-validate.
    #[tracing::instrument(skip(self, owner, update), fields(builder_id = %id, section = %update.step()))]
    pub async fn update_step(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        update: SectionUpdate,
    ) -> Result<BuilderState, BuilderError> {
        let mut state = self.store.load(id, owner).await?;
        ensure_mutable(&state)?;
        let expected_version = state.version;

        state.config.apply(update);
        state.validation = validate(&state.config);
        debug!(
            errors = state.validation.error_count(),
            warnings = state.validation.warnings.len(),
            "Revalidated builder config"
        );

        self.store.save(id, owner, expected_version, state).await
    }

    /// Record a conversation run against the agent while on the test step.
    #[tracing::instrument(skip(self, owner, conversation), fields(builder_id = %id))]
    pub async fn record_test_conversation(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        conversation: TestConversation,
    ) -> Result<BuilderState, BuilderError> {
        let mut state = self.store.load(id, owner).await?;
        ensure_mutable(&state)?;
        if state.config.step != BuilderStep::Test {
            return Err(BuilderError::InvalidState(format!(
                "test conversations can only be recorded on the test step (current: {})",
                state.config.step
            )));
        }
        let expected_version = state.version;

        state.preview.test_conversations.push(conversation);
        state.validation = validate(&state.config);

        self.store.save(id, owner, expected_version, state).await
    }
}

//! BuilderState Store.
//!
//! Durable storage of one [`BuilderState`] per builder id, layered over the
//! [`BuilderStateRepository`] and [`TemplateRepository`] ports. Every
//! operation is scoped to an explicit owner: a session owned by someone
//! else is reported as `NotFound`.
//!
//! Writes are conditional on the version the caller loaded, so two editors
//! racing on the same session get a `Conflict` instead of silently
//! overwriting each other.

use chrono::Utc;
use tracing::{debug, info};

use kbatlas_types::builder::{
    BuilderConfig, BuilderId, BuilderState, BuilderStep, BuilderSummary, DeploymentState,
    OwnerId, PreviewState, ValidationReport,
};
use kbatlas_types::error::BuilderError;
use kbatlas_types::template::AgentTemplate;

use crate::builder::templates::builtin_templates;
use crate::builder::validation::validate;
use crate::repository::builder_state::BuilderStateRepository;
use crate::repository::template::TemplateRepository;

/// Service owning builder-session persistence.
///
/// Generic over repository traits -- kbatlas-core never depends on
/// kbatlas-infra.
pub struct BuilderStore<R: BuilderStateRepository, T: TemplateRepository> {
    repo: R,
    templates: T,
    default_model: String,
}

impl<R: BuilderStateRepository, T: TemplateRepository> BuilderStore<R, T> {
    /// Create a new store.
    ///
    /// - `repo`: persistence for builder sessions
    /// - `templates`: persistence for agent templates
    /// - `default_model`: model preselected in new sessions
    pub fn new(repo: R, templates: T, default_model: impl Into<String>) -> Self {
        Self {
            repo,
            templates,
            default_model: default_model.into(),
        }
    }

    /// Allocate a new session positioned on the first step, with an empty
    /// validation report and a `draft` deployment.
    pub async fn create(&self, owner: &OwnerId) -> Result<BuilderState, BuilderError> {
        let mut config = BuilderConfig::new(BuilderId::new());
        config.basic.model = self.default_model.clone();

        let state = initial_state(owner, config, ValidationReport::default());
        self.repo.insert(&state).await?;

        info!(builder_id = %state.id(), owner = %owner, "Created builder session");
        Ok(state)
    }

    /// Load a session owned by `owner`.
    pub async fn load(&self, id: &BuilderId, owner: &OwnerId) -> Result<BuilderState, BuilderError> {
        let state = self.repo.get(id).await?.ok_or(BuilderError::NotFound)?;
        if &state.owner_id != owner {
            debug!(builder_id = %id, "Builder session belongs to another owner");
            return Err(BuilderError::NotFound);
        }
        Ok(state)
    }

    /// Overwrite a session, conditional on the stored version still being
    /// `expected_version`.
    ///
    /// Returns the state as stored: `version` is `expected_version + 1` and
    /// `updated_at` is now. The session id and owner cannot change.
    pub async fn save(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        expected_version: u64,
        mut state: BuilderState,
    ) -> Result<BuilderState, BuilderError> {
        if state.config.id != *id {
            return Err(BuilderError::InvalidState(format!(
                "session id is immutable: expected {id}, got {}",
                state.config.id
            )));
        }
        if &state.owner_id != owner {
            return Err(BuilderError::InvalidState(
                "session owner is immutable".to_string(),
            ));
        }

        // Confirms existence and ownership before writing.
        self.load(id, owner).await?;

        state.version = expected_version + 1;
        state.updated_at = Utc::now();
        self.repo.update(&state, expected_version).await?;

        debug!(builder_id = %id, version = state.version, "Saved builder session");
        Ok(state)
    }

    /// Start a session from a template. The template's configuration is
    /// copied verbatim except for the id (fresh) and step (reset to basic).
    pub async fn clone_from_template(
        &self,
        template_id: &str,
        owner: &OwnerId,
    ) -> Result<BuilderState, BuilderError> {
        let template = self.get_template(template_id).await?;

        let mut config = template.config;
        config.id = BuilderId::new();
        config.step = BuilderStep::Basic;

        let validation = validate(&config);
        let state = initial_state(owner, config, validation);
        self.repo.insert(&state).await?;

        info!(
            builder_id = %state.id(),
            template_id,
            owner = %owner,
            "Created builder session from template"
        );
        Ok(state)
    }

    /// List an owner's sessions, most recently updated first.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<BuilderSummary>, BuilderError> {
        Ok(self.repo.list_by_owner(owner).await?)
    }

    /// Delete (abandon) a session. No-op if it does not exist.
    pub async fn delete(&self, id: &BuilderId, owner: &OwnerId) -> Result<(), BuilderError> {
        match self.load(id, owner).await {
            Ok(_) => {}
            Err(BuilderError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.repo.delete(id).await?;
        info!(builder_id = %id, "Deleted builder session");
        Ok(())
    }

    pub async fn get_template(&self, template_id: &str) -> Result<AgentTemplate, BuilderError> {
        self.templates
            .get(template_id)
            .await?
            .ok_or(BuilderError::NotFound)
    }

    pub async fn list_templates(&self, public_only: bool) -> Result<Vec<AgentTemplate>, BuilderError> {
        Ok(self.templates.list(public_only).await?)
    }

    /// Insert or refresh the built-in templates. Returns how many were written.
    pub async fn seed_builtin_templates(&self) -> Result<usize, BuilderError> {
        let templates = builtin_templates();
        for template in &templates {
            self.templates.upsert(template).await?;
        }
        info!(count = templates.len(), "Seeded built-in templates");
        Ok(templates.len())
    }
}

fn initial_state(owner: &OwnerId, config: BuilderConfig, validation: ValidationReport) -> BuilderState {
    let now = Utc::now();
    BuilderState {
        owner_id: owner.clone(),
        config,
        validation,
        preview: PreviewState::default(),
        deployment: DeploymentState::default(),
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

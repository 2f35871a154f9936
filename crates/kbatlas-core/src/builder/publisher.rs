//! Deployment Publisher.
//!
//! Turns a validated builder configuration into a live agent on the
//! external [`AgentProvider`] and records the outcome on the session.
//!
//! Deployment status moves `draft -> deploying -> {deployed | failed}`;
//! `failed -> deploying` on a manual retry. `deployed` is terminal. Each
//! session carries one idempotency key, generated on the first attempt
//! and reused by every retry, so the provider can collapse duplicates.
//!
//! An attempt that never settles (the process died mid-call, or its outcome
//! could not be written) stays `deploying` until it is older than the
//! deploy timeout. After that, `deploy` takes it over with the same key.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use kbatlas_types::builder::{
    BuilderId, BuilderState, DeployEnvironment, DeploymentStatus, OwnerId, ProcessingStatus,
};
use kbatlas_types::error::BuilderError;
use kbatlas_types::provider::{
    AgentCreateRequest, AgentTool, FilePurpose, FileUpload, GenerationParams,
};

use crate::builder::controller::ensure_mutable;
use crate::builder::store::BuilderStore;
use crate::builder::validation::validate;
use crate::provider::AgentProvider;
use crate::repository::builder_state::BuilderStateRepository;
use crate::repository::template::TemplateRepository;

/// Translate a session into the provider's create-agent request.
///
/// Disabled functions are dropped. Vector stores are attached only when
/// file search is enabled. Fields the provider has no slot for (category,
/// tags, personality, goals, constraints, and generation settings beyond
/// temperature/top_p) travel in `metadata` as JSON strings.
pub fn build_create_request(
    state: &BuilderState,
    environment: DeployEnvironment,
    idempotency_key: Option<Uuid>,
) -> AgentCreateRequest {
    let config = &state.config;

    let mut tools = Vec::new();
    if config.tools.code_interpreter {
        tools.push(AgentTool::CodeInterpreter);
    }
    if config.tools.file_search {
        tools.push(AgentTool::FileSearch);
    }
    tools.extend(
        config
            .tools
            .functions
            .iter()
            .filter(|f| f.enabled)
            .map(|f| AgentTool::Function {
                name: f.name.clone(),
                description: f.description.clone(),
                parameters: f.parameters.clone(),
            }),
    );

    let vector_store_ids = if config.tools.file_search {
        config.files.vector_store_ids.iter().cloned().collect()
    } else {
        Vec::new()
    };

    let advanced = &config.advanced;
    let generation = GenerationParams {
        temperature: advanced.temperature,
        top_p: advanced.top_p,
        max_tokens: advanced.max_tokens,
        frequency_penalty: advanced.frequency_penalty,
        presence_penalty: advanced.presence_penalty,
        seed: advanced.seed,
        timeout_seconds: advanced.timeout_seconds,
        max_retries: advanced.max_retries,
        fallback_behavior: advanced.fallback_behavior,
        parallel_tool_calls: config.tools.parallel_tool_calls,
        tool_choice: config.tools.tool_choice,
    };

    let to_json = |value: serde_json::Value| value.to_string();
    let mut metadata = BTreeMap::new();
    metadata.insert("builder_id".to_string(), config.id.to_string());
    metadata.insert("owner_id".to_string(), state.owner_id.to_string());
    metadata.insert("environment".to_string(), environment.to_string());
    metadata.insert("category".to_string(), config.basic.category.to_string());
    metadata.insert(
        "tags".to_string(),
        to_json(serde_json::json!(config.basic.tags)),
    );
    metadata.insert(
        "personality".to_string(),
        config.instructions.personality.clone(),
    );
    metadata.insert(
        "goals".to_string(),
        to_json(serde_json::json!(config.instructions.goals)),
    );
    metadata.insert(
        "constraints".to_string(),
        to_json(serde_json::json!(config.instructions.constraints)),
    );
    metadata.insert(
        "generation".to_string(),
        to_json(serde_json::json!({
            "max_tokens": generation.max_tokens,
            "frequency_penalty": generation.frequency_penalty,
            "presence_penalty": generation.presence_penalty,
            "seed": generation.seed,
            "timeout_seconds": generation.timeout_seconds,
            "max_retries": generation.max_retries,
            "fallback_behavior": generation.fallback_behavior,
            "parallel_tool_calls": generation.parallel_tool_calls,
            "tool_choice": generation.tool_choice,
        })),
    );

    AgentCreateRequest {
        name: config.basic.name.trim().to_string(),
        description: config.basic.description.trim().to_string(),
        model: config.basic.model.clone(),
        instructions: config.instructions.system_prompt.clone(),
        tools,
        vector_store_ids,
        generation,
        metadata,
        idempotency_key,
    }
}

/// Age after which an unsettled `deploying` attempt counts as abandoned.
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(120);

fn mark_failed(state: &mut BuilderState, message: &str) {
    state.deployment.status = DeploymentStatus::Failed;
    state.deployment.error = Some(message.to_string());
    state.deployment.deploying_since = None;
}

pub struct DeploymentPublisher<R: BuilderStateRepository, T: TemplateRepository, P: AgentProvider>
{
    store: Arc<BuilderStore<R, T>>,
    provider: P,
    deploy_timeout: Duration,
}

impl<R: BuilderStateRepository, T: TemplateRepository, P: AgentProvider>
    DeploymentPublisher<R, T, P>
{
    pub fn new(store: Arc<BuilderStore<R, T>>, provider: P) -> Self {
        Self {
            store,
            provider,
            deploy_timeout: DEFAULT_DEPLOY_TIMEOUT,
        }
    }

    /// Override [`DEFAULT_DEPLOY_TIMEOUT`]. Should exceed the provider's
    /// own request timeout.
    pub fn with_deploy_timeout(mut self, timeout: Duration) -> Self {
        self.deploy_timeout = timeout;
        self
    }

    /// True for a `deploying` attempt older than the deploy timeout, or one
    /// with no recorded start.
    fn is_abandoned(&self, state: &BuilderState) -> bool {
        if state.deployment.status != DeploymentStatus::Deploying {
            return false;
        }
        match state.deployment.deploying_since {
            Some(since) => (Utc::now() - since)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.deploy_timeout),
            None => true,
        }
    }

    /// Deploy a validated session and return the provider-side agent id.
    ///
    /// Fails with `InvalidState` (without touching the provider) if the
    /// configuration is not valid, a deployment is in progress, or the
    /// session is already deployed. Validation is recomputed here rather
    /// than read from the stored report. A provider failure marks the
    /// session `failed` and surfaces `DeploymentFailed`; no automatic retry.
    /// If that outcome cannot be written, `Persistence` is returned instead.
    #[tracing::instrument(skip(self, owner), fields(builder_id = %id, environment = %environment))]
    pub async fn deploy(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        environment: DeployEnvironment,
    ) -> Result<String, BuilderError> {
        let mut state = self.store.load(id, owner).await?;
        let abandoned = self.is_abandoned(&state);
        if abandoned {
            warn!(
                deploying_since = ?state.deployment.deploying_since,
                "Taking over abandoned deployment attempt"
            );
        } else {
            ensure_mutable(&state)?;
        }

        let report = validate(&state.config);
        if !report.is_valid {
            let message = format!(
                "configuration has {} validation error(s); fix them before deploying",
                report.error_count()
            );
            if abandoned {
                let expected_version = state.version;
                state.validation = report;
                mark_failed(&mut state, &message);
                self.store.save(id, owner, expected_version, state).await?;
            }
            return Err(BuilderError::InvalidState(message));
        }
        state.validation = report;

        let key = *state
            .deployment
            .idempotency_key
            .get_or_insert_with(Uuid::new_v4);
        let request = build_create_request(&state, environment, Some(key));

        let expected_version = state.version;
        state.deployment.status = DeploymentStatus::Deploying;
        state.deployment.error = None;
        state.deployment.environment = Some(environment);
        state.deployment.deploying_since = Some(Utc::now());
        let mut state = self.store.save(id, owner, expected_version, state).await?;

        let span = info_span!(
            "gen_ai.create_agent",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.agent.name = %request.name,
        );
        let result = self.provider.create_agent(&request).instrument(span).await;

        let expected_version = state.version;
        match result {
            Ok(created) => {
                state.deployment.status = DeploymentStatus::Deployed;
                state.deployment.deployed_agent_id = Some(created.id.clone());
                state.deployment.deployed_at = Some(Utc::now());
                state.deployment.deploying_since = None;
                if let Err(e) = self.store.save(id, owner, expected_version, state).await {
                    error!(
                        agent_id = %created.id,
                        error = %e,
                        "Agent created but deployment outcome could not be recorded"
                    );
                    return Err(e);
                }
                info!(agent_id = %created.id, "Deployed agent");
                Ok(created.id)
            }
            Err(provider_err) => {
                let message = provider_err.to_string();
                warn!(error = %message, "Agent deployment failed");
                mark_failed(&mut state, &message);
                if let Err(e) = self.store.save(id, owner, expected_version, state).await {
                    warn!(error = %e, "Recording deployment failure failed; retrying once");
                    self.record_failure_again(id, owner, &message).await?;
                }
                Err(BuilderError::DeploymentFailed(message))
            }
        }
    }

    /// Reload the session and write the `failed` outcome a second time.
    ///
    /// A session no longer `deploying` was settled by someone else and is
    /// left alone. If this write fails too, the store still says
    /// `deploying` and the caller gets `Persistence`.
    async fn record_failure_again(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
        message: &str,
    ) -> Result<(), BuilderError> {
        let retry = async {
            let mut state = self.store.load(id, owner).await?;
            if state.deployment.status != DeploymentStatus::Deploying {
                return Ok(());
            }
            let expected_version = state.version;
            mark_failed(&mut state, message);
            self.store.save(id, owner, expected_version, state).await?;
            Ok::<(), BuilderError>(())
        };

        retry.await.map_err(|e| {
            error!(error = %e, "Deployment failure could not be recorded");
            BuilderError::Persistence(format!(
                "deployment failed ({message}) and the outcome could not be recorded: {e}"
            ))
        })
    }

    /// Upload inline knowledge files and index them in a vector store.
    ///
    /// Files already uploaded (with an `openai_file_id`) are not uploaded
    /// again. A failed upload marks that file `failed` and the rest
    /// continue. A failed vector-store creation is reported as
    /// `DeploymentFailed` after the file statuses are persisted.
    #[tracing::instrument(skip(self, owner), fields(builder_id = %id))]
    pub async fn sync_knowledge_files(
        &self,
        id: &BuilderId,
        owner: &OwnerId,
    ) -> Result<BuilderState, BuilderError> {
        let mut state = self.store.load(id, owner).await?;
        ensure_mutable(&state)?;
        let expected_version = state.version;

        let mut indexed = Vec::new();
        for (index, file) in state.config.files.knowledge_files.iter_mut().enumerate() {
            if file.processing_status == ProcessingStatus::Completed {
                continue;
            }
            let Some(content) = file.content.as_ref() else {
                continue;
            };

            if file.openai_file_id.is_none() {
                file.processing_status = ProcessingStatus::Processing;
                let upload = FileUpload {
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    bytes: content.as_bytes().to_vec(),
                };
                match self.provider.upload_file(&upload, FilePurpose::Assistants).await {
                    Ok(file_ref) => file.openai_file_id = Some(file_ref.id),
                    Err(e) => {
                        warn!(file = %file.name, error = %e, "Knowledge file upload failed");
                        file.processing_status = ProcessingStatus::Failed;
                        continue;
                    }
                }
            }
            indexed.push(index);
        }

        let mut store_error = None;
        if !indexed.is_empty() {
            let files = &mut state.config.files;
            let file_ids: Vec<String> = indexed
                .iter()
                .filter_map(|&i| files.knowledge_files[i].openai_file_id.clone())
                .collect();
            let name = format!("{} knowledge", state.config.basic.name.trim());

            match self.provider.create_vector_store(name.trim(), &file_ids).await {
                Ok(vector_store) => {
                    for &i in &indexed {
                        let file = &mut files.knowledge_files[i];
                        file.vector_store_id = Some(vector_store.id.clone());
                        file.processing_status = ProcessingStatus::Completed;
                    }
                    files.vector_store_ids.insert(vector_store.id.clone());
                    info!(
                        vector_store_id = %vector_store.id,
                        files = file_ids.len(),
                        "Indexed knowledge files"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Vector store creation failed");
                    for &i in &indexed {
                        files.knowledge_files[i].processing_status = ProcessingStatus::Failed;
                    }
                    store_error = Some(e.to_string());
                }
            }
        }

        state.validation = validate(&state.config);
        let state = self.store.save(id, owner, expected_version, state).await?;

        match store_error {
            Some(message) => Err(BuilderError::DeploymentFailed(message)),
            None => Ok(state),
        }
    }
}

//! In-memory repositories and a scripted provider for builder tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kbatlas_types::builder::{
    BuilderConfig, BuilderId, BuilderState, BuilderSummary, OwnerId, ValidationReport,
};
use kbatlas_types::error::{ProviderError, RepositoryError};
use kbatlas_types::provider::{
    AgentCreateRequest, CreatedAgent, FilePurpose, FileRef, FileUpload, VectorStoreRef,
};
use kbatlas_types::template::AgentTemplate;

use crate::builder::controller::StepController;
use crate::builder::store::BuilderStore;
use crate::provider::AgentProvider;
use crate::repository::builder_state::BuilderStateRepository;
use crate::repository::template::TemplateRepository;

pub(crate) type TestStore = BuilderStore<InMemoryBuilderStateRepository, InMemoryTemplateRepository>;
pub(crate) type TestController =
    StepController<InMemoryBuilderStateRepository, InMemoryTemplateRepository>;

pub(crate) fn owner() -> OwnerId {
    OwnerId::new("user_test")
}

pub(crate) fn store() -> TestStore {
    store_with_model("gpt-4o")
}

pub(crate) fn store_with_model(model: &str) -> TestStore {
    BuilderStore::new(
        InMemoryBuilderStateRepository::default(),
        InMemoryTemplateRepository::default(),
        model,
    )
}

/// A store whose session writes can be made to fail on demand.
pub(crate) fn store_with_write_faults() -> (TestStore, WriteFaults) {
    let repo = InMemoryBuilderStateRepository::default();
    let faults = repo.faults.clone();
    let store = BuilderStore::new(repo, InMemoryTemplateRepository::default(), "gpt-4o");
    (store, faults)
}

/// Makes upcoming `update` calls fail: after letting `skip` through, the
/// next `fail` calls return a query error.
#[derive(Clone, Default)]
pub(crate) struct WriteFaults(Arc<Mutex<(usize, usize)>>);

impl WriteFaults {
    pub(crate) fn fail_after(&self, skip: usize, fail: usize) {
        *self.0.lock().unwrap() = (skip, fail);
    }

    fn next_write_fails(&self) -> bool {
        let mut plan = self.0.lock().unwrap();
        match *plan {
            (0, 0) => false,
            (0, fail) => {
                plan.1 = fail - 1;
                true
            }
            (skip, _) => {
                plan.0 = skip - 1;
                false
            }
        }
    }
}

/// A fresh, unpersisted session for `owner`.
pub(crate) fn state_for(owner: OwnerId) -> BuilderState {
    let now = chrono::Utc::now();
    BuilderState {
        owner_id: owner,
        config: BuilderConfig::new(BuilderId::new()),
        validation: ValidationReport::default(),
        preview: Default::default(),
        deployment: Default::default(),
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub(crate) struct InMemoryBuilderStateRepository {
    states: Mutex<HashMap<BuilderId, BuilderState>>,
    faults: WriteFaults,
}

impl BuilderStateRepository for InMemoryBuilderStateRepository {
    async fn insert(&self, state: &BuilderState) -> Result<(), RepositoryError> {
        let mut states = self.states.lock().unwrap();
        if states.contains_key(&state.id()) {
            return Err(RepositoryError::Conflict(format!(
                "builder {} already exists",
                state.id()
            )));
        }
        states.insert(state.id(), state.clone());
        Ok(())
    }

    async fn get(&self, id: &BuilderId) -> Result<Option<BuilderState>, RepositoryError> {
        Ok(self.states.lock().unwrap().get(id).cloned())
    }

    async fn update(
        &self,
        state: &BuilderState,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        if self.faults.next_write_fails() {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }
        let mut states = self.states.lock().unwrap();
        let stored = states
            .get_mut(&state.id())
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            });
        }
        *stored = state.clone();
        Ok(())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<BuilderSummary>, RepositoryError> {
        let states = self.states.lock().unwrap();
        let mut owned: Vec<&BuilderState> =
            states.values().filter(|s| &s.owner_id == owner).collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned.into_iter().map(BuilderSummary::from).collect())
    }

    async fn delete(&self, id: &BuilderId) -> Result<(), RepositoryError> {
        self.states.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryTemplateRepository {
    templates: Mutex<HashMap<String, AgentTemplate>>,
}

impl TemplateRepository for InMemoryTemplateRepository {
    async fn get(&self, id: &str) -> Result<Option<AgentTemplate>, RepositoryError> {
        Ok(self.templates.lock().unwrap().get(id).cloned())
    }

    async fn list(&self, public_only: bool) -> Result<Vec<AgentTemplate>, RepositoryError> {
        let templates = self.templates.lock().unwrap();
        let mut listed: Vec<AgentTemplate> = templates
            .values()
            .filter(|t| !public_only || t.is_public)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn upsert(&self, template: &AgentTemplate) -> Result<(), RepositoryError> {
        self.templates
            .lock()
            .unwrap()
            .insert(template.id.clone(), template.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CallLogInner {
    requests: Vec<AgentCreateRequest>,
    uploads: usize,
    vector_stores: usize,
}

/// Shared view of what a [`MockProvider`] was asked to do.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<CallLogInner>>);

impl CallLog {
    pub(crate) fn create_agent(&self) -> usize {
        self.0.lock().unwrap().requests.len()
    }

    pub(crate) fn requests(&self) -> Vec<AgentCreateRequest> {
        self.0.lock().unwrap().requests.clone()
    }

    pub(crate) fn uploads(&self) -> usize {
        self.0.lock().unwrap().uploads
    }
}

/// Scripted provider: fails `create_agent` for the first `failures`
/// attempts, then succeeds with `agent_id`.
pub(crate) struct MockProvider {
    agent_id: String,
    failures: Mutex<Vec<String>>,
    vector_store_fails: bool,
    log: CallLog,
}

impl MockProvider {
    pub(crate) fn ok(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            failures: Mutex::new(Vec::new()),
            vector_store_fails: false,
            log: CallLog::default(),
        }
    }

    pub(crate) fn failing_then_ok(message: &str, agent_id: &str) -> Self {
        let provider = Self::ok(agent_id);
        provider.failures.lock().unwrap().push(message.to_string());
        provider
    }

    pub(crate) fn with_failing_vector_store(mut self) -> Self {
        self.vector_store_fails = true;
        self
    }

    pub(crate) fn calls(&self) -> CallLog {
        self.log.clone()
    }
}

impl AgentProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_agent(
        &self,
        request: &AgentCreateRequest,
    ) -> Result<CreatedAgent, ProviderError> {
        self.log.0.lock().unwrap().requests.push(request.clone());
        let failure = {
            let mut failures = self.failures.lock().unwrap();
            (!failures.is_empty()).then(|| failures.remove(0))
        };
        match failure {
            Some(message) => Err(ProviderError::Rejected {
                status: 400,
                message,
            }),
            None => Ok(CreatedAgent {
                id: self.agent_id.clone(),
            }),
        }
    }

    async fn delete_agent(&self, _agent_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn upload_file(
        &self,
        file: &FileUpload,
        _purpose: FilePurpose,
    ) -> Result<FileRef, ProviderError> {
        self.log.0.lock().unwrap().uploads += 1;
        Ok(FileRef {
            id: format!("file_{}", file.name),
            bytes: Some(file.bytes.len() as u64),
        })
    }

    async fn create_vector_store(
        &self,
        name: &str,
        _file_ids: &[String],
    ) -> Result<VectorStoreRef, ProviderError> {
        if self.vector_store_fails {
            return Err(ProviderError::Http("connection reset".to_string()));
        }
        let mut log = self.log.0.lock().unwrap();
        log.vector_stores += 1;
        Ok(VectorStoreRef {
            id: format!("vs_{}", log.vector_stores),
            name: Some(name.to_string()),
        })
    }
}

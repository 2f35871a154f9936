//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST
//! API. Services are generic over repository/provider traits; AppState pins
//! them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use kbatlas_core::builder::controller::StepController;
use kbatlas_core::builder::publisher::DeploymentPublisher;
use kbatlas_core::builder::store::BuilderStore;
use kbatlas_infra::config::{load_global_config, resolve_data_dir};
use kbatlas_infra::provider::openai::OpenAiAssistantsProvider;
use kbatlas_infra::sqlite::builder_state::SqliteBuilderStateRepository;
use kbatlas_infra::sqlite::pool::DatabasePool;
use kbatlas_infra::sqlite::template::SqliteTemplateRepository;
use kbatlas_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteStore = BuilderStore<SqliteBuilderStateRepository, SqliteTemplateRepository>;

pub type ConcreteController = StepController<SqliteBuilderStateRepository, SqliteTemplateRepository>;

pub type ConcretePublisher = DeploymentPublisher<
    SqliteBuilderStateRepository,
    SqliteTemplateRepository,
    OpenAiAssistantsProvider,
>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConcreteStore>,
    pub controller: Arc<ConcreteController>,
    pub publisher: Arc<ConcretePublisher>,
    pub data_dir: PathBuf,
    pub config: Arc<GlobalConfig>,
}

impl AppState {
    /// Initialize from the resolved data directory and its `config.toml`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        Self::init_with(data_dir, config).await
    }

    /// Connect to the database in `data_dir` and wire services.
    ///
    /// Seeds the built-in templates when the template table is empty.
    pub async fn init_with(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::open(&data_dir).await?;

        let store = Arc::new(BuilderStore::new(
            SqliteBuilderStateRepository::new(db_pool.clone()),
            SqliteTemplateRepository::new(db_pool),
            config.builder.default_model.clone(),
        ));
        if store.list_templates(false).await?.is_empty() {
            store.seed_builtin_templates().await?;
        }

        let api_key = match std::env::var(&config.provider.api_key_env) {
            Ok(key) if !key.trim().is_empty() => SecretString::from(key),
            _ => {
                tracing::warn!(
                    env = %config.provider.api_key_env,
                    "Provider API key not set; deployments will fail authentication"
                );
                SecretString::from(String::new())
            }
        };
        let provider = OpenAiAssistantsProvider::from_settings(&config.provider, api_key)?;

        let controller = Arc::new(StepController::new(store.clone()));
        let deploy_timeout = Duration::from_secs(config.provider.timeout_secs.saturating_mul(2));
        let publisher = Arc::new(
            DeploymentPublisher::new(store.clone(), provider).with_deploy_timeout(deploy_timeout),
        );

        tracing::debug!(data_dir = %data_dir.display(), "Application state initialized");
        Ok(Self {
            store,
            controller,
            publisher,
            data_dir,
            config: Arc::new(config),
        })
    }
}

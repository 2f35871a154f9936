//! Builder session handlers for the REST API.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use kbatlas_types::builder::{
    BuilderId, BuilderState, BuilderStep, BuilderSummary, DeployEnvironment, SectionUpdate,
    TestConversation,
};

use crate::http::error::AppError;
use crate::http::extractors::owner::Owner;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

type BuilderResponse = Result<Json<ApiResponse<BuilderState>>, AppError>;

fn parse_id(raw: &str) -> Result<BuilderId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid builder id: '{raw}'")))
}

fn builder_links(resp: ApiResponse<BuilderState>, id: &BuilderId) -> ApiResponse<BuilderState> {
    resp.with_link("self", format!("/api/v1/builders/{id}"))
        .with_link("deploy", format!("/api/v1/builders/{id}/deploy"))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBuilderRequest {
    /// Start from this template instead of an empty session.
    #[serde(default)]
    pub template_id: Option<String>,
}

/// POST /api/v1/builders - Start a builder session, optionally from a template.
pub async fn create_builder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    body: Option<Json<CreateBuilderRequest>>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let session = match body.template_id.as_deref() {
        Some(template_id) => state.store.clone_from_template(template_id, &owner).await?,
        None => state.store.create(&owner).await?,
    };

    let id = session.id();
    Ok(Json(builder_links(clock.success(session), &id)))
}

/// GET /api/v1/builders - List the caller's sessions, most recent first.
pub async fn list_builders(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<ApiResponse<Vec<BuilderSummary>>>, AppError> {
    let clock = RequestClock::start();
    let sessions = state.store.list(&owner).await?;
    Ok(Json(
        clock.success(sessions).with_link("self", "/api/v1/builders"),
    ))
}

/// GET /api/v1/builders/{id}
pub async fn get_builder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    let session = state.store.load(&id, &owner).await?;
    Ok(Json(builder_links(clock.success(session), &id)))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// DELETE /api/v1/builders/{id} - Abandon a session. Idempotent.
pub async fn delete_builder(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedResponse>>, AppError> {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    state.store.delete(&id, &owner).await?;
    Ok(Json(clock.success(DeletedResponse { deleted: true })))
}

/// PUT /api/v1/builders/{id}/section - Replace one configuration section.
pub async fn update_section(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(update): Json<SectionUpdate>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    let session = state.controller.update_step(&id, &owner, update).await?;
    Ok(Json(builder_links(clock.success(session), &id)))
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub step: BuilderStep,
    /// Unsaved edits from the step being left.
    #[serde(default)]
    pub leaving_edits: Option<SectionUpdate>,
}

/// POST /api/v1/builders/{id}/navigate
pub async fn navigate(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<NavigateRequest>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    let session = state
        .controller
        .navigate_to(&id, &owner, body.step, body.leaving_edits)
        .await?;
    Ok(Json(builder_links(clock.success(session), &id)))
}

/// POST /api/v1/builders/{id}/test-conversations
pub async fn record_test_conversation(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(conversation): Json<TestConversation>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    if conversation.rating.is_some_and(|r| !(1..=5).contains(&r)) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    let session = state
        .controller
        .record_test_conversation(&id, &owner, conversation)
        .await?;
    Ok(Json(builder_links(clock.success(session), &id)))
}

/// POST /api/v1/builders/{id}/files/sync - Upload and index knowledge files.
pub async fn sync_files(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> BuilderResponse {
    let clock = RequestClock::start();
    let id = parse_id(&id)?;
    let session = state.publisher.sync_knowledge_files(&id, &owner).await?;
    Ok(Json(builder_links(clock.success(session), &id)))
}

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    #[serde(default = "default_environment")]
    pub environment: DeployEnvironment,
}

fn default_environment() -> DeployEnvironment {
    DeployEnvironment::Production
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub agent_id: String,
    pub environment: DeployEnvironment,
}

/// POST /api/v1/builders/{id}/deploy
///
/// The body is optional; a bare POST deploys to production.
pub async fn deploy(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    body: Option<Json<DeployRequest>>,
) -> Result<Json<ApiResponse<DeployResponse>>, AppError> {
    let clock = RequestClock::start();
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let id = parse_id(&id)?;
    let agent_id = state
        .publisher
        .deploy(&id, &owner, body.environment)
        .await?;
    Ok(Json(
        clock
            .success(DeployResponse {
                agent_id,
                environment: body.environment,
            })
            .with_link("builder", format!("/api/v1/builders/{id}")),
    ))
}

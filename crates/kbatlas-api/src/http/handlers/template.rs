//! Agent template handlers for the REST API.

use axum::Json;
use axum::extract::{Path, Query, State};

use kbatlas_types::template::AgentTemplate;

use crate::http::error::AppError;
use crate::http::extractors::query::TemplateListQuery;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// GET /api/v1/templates - List templates ordered by name.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<ApiResponse<Vec<AgentTemplate>>>, AppError> {
    let clock = RequestClock::start();
    let templates = state.store.list_templates(query.public_only).await?;
    Ok(Json(
        clock.success(templates).with_link("self", "/api/v1/templates"),
    ))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AgentTemplate>>, AppError> {
    let clock = RequestClock::start();
    let template = state.store.get_template(&id).await?;
    Ok(Json(
        clock
            .success(template)
            .with_link("self", format!("/api/v1/templates/{id}")),
    ))
}

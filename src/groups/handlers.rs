use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{dto::CreateGroupRequest, repo_types::PlanningGroup};
use crate::{error::ServiceError, state::AppState};

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/:id", get(get_group))
}

fn validate(payload: CreateGroupRequest) -> Result<(String, serde_json::Value), ServiceError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("Group name is required"));
    }
    let config = payload
        .planning_config
        .unwrap_or_else(|| serde_json::json!({}));
    if !config.is_object() {
        return Err(ServiceError::validation("planning_config must be an object"));
    }
    Ok((name, config))
}

#[instrument(skip(state, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<PlanningGroup>), (StatusCode, String)> {
    let (name, config) = validate(payload)?;
    let group = PlanningGroup::create(&state.db, &name, &config)
        .await
        .map_err(ServiceError::from)?;
    info!(group_id = %group.id, "planning group created");
    Ok((StatusCode::CREATED, Json(group)))
}

#[instrument(skip(state))]
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanningGroup>, (StatusCode, String)> {
    let group = PlanningGroup::find(&state.db, id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound("Group"))?;
    Ok(Json(group))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreatePlanRequest, PatchPlanRequest, PlanQuery},
    repo_types::DailyPlan,
    services::{create_plan, update_plan},
};
use crate::{error::ServiceError, state::AppState};

type HandlerError = (StatusCode, String);

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", post(post_plan).get(list_plans))
        .route("/plans/:id", patch(patch_plan).delete(delete_plan))
}

#[instrument(skip(state, body), fields(group_id = %body.group_id, date = %body.date))]
pub async fn post_plan(
    State(state): State<AppState>,
    Json(body): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<DailyPlan>), HandlerError> {
    let plan = create_plan(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(q): Query<PlanQuery>,
) -> Result<Json<Vec<DailyPlan>>, HandlerError> {
    let range = q.range()?;
    let plans = DailyPlan::list(&state.db, q.group_id, range)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(plans))
}

#[instrument(skip(state, body))]
pub async fn patch_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchPlanRequest>,
) -> Result<Json<DailyPlan>, HandlerError> {
    Ok(Json(update_plan(&state.db, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let deleted = DailyPlan::delete(&state.db, id)
        .await
        .map_err(ServiceError::from)?;
    if !deleted {
        return Err(ServiceError::NotFound("Plan").into());
    }
    info!(plan_id = %id, "plan deleted");
    Ok(StatusCode::NO_CONTENT)
}

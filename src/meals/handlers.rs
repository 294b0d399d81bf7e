use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ImportRequest, IngredientQuery, IngredientRequest, MealDetails, MealListItem, MealQuery,
        MealRequest,
    },
    repo_types::{Ingredient, Meal},
    services::{create_meal, import_meal, load_details, replace_meal, validate_ingredient_name},
};
use crate::{
    error::{is_unique_violation, ServiceError},
    state::AppState,
};

type HandlerError = (StatusCode, String);

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", post(create_ingredient))
        .route("/meals", post(post_meal))
        .route("/meals/:id", put(put_meal).delete(delete_meal))
        .route("/meals/:id/import", post(post_import))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(payload): Json<IngredientRequest>,
) -> Result<(StatusCode, Json<Ingredient>), HandlerError> {
    let name = validate_ingredient_name(&payload.name)?;
    match Ingredient::create(&state.db, &name, payload.owner_id).await {
        Ok(ingredient) => Ok((StatusCode::CREATED, Json(ingredient))),
        Err(e) if is_unique_violation(&e) => {
            warn!(%name, "ingredient already exists in scope");
            Err(ServiceError::Conflict(format!("Ingredient '{}' already exists", name)).into())
        }
        Err(e) => Err(ServiceError::from(e).into()),
    }
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, HandlerError> {
    let rows = Ingredient::list_visible(&state.db, q.owner_id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    Query(q): Query<MealQuery>,
) -> Result<Json<Vec<MealListItem>>, HandlerError> {
    let (limit, offset) = q.window();
    let meals = Meal::list(&state.db, q.owner_id, limit, offset)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(meals.into_iter().map(MealListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetails>, HandlerError> {
    let meal = Meal::find(&state.db, id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound("Meal"))?;
    Ok(Json(load_details(&state.db, meal).await?))
}

/// POST /meals { name, base_servings?, instructions?, owner_id?, group_id?, lines: [...] }
#[instrument(skip(state, body))]
pub async fn post_meal(
    State(state): State<AppState>,
    Json(body): Json<MealRequest>,
) -> Result<(StatusCode, Json<MealDetails>), HandlerError> {
    let details = create_meal(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state, body))]
pub async fn put_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MealRequest>,
) -> Result<Json<MealDetails>, HandlerError> {
    Ok(Json(replace_meal(&state.db, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    if !Meal::delete(&state.db, id)
        .await
        .map_err(ServiceError::from)?
    {
        return Err(ServiceError::NotFound("Meal").into());
    }
    info!(meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /meals/:id/import { owner_id }
#[instrument(skip(state, body))]
pub async fn post_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ImportRequest>,
) -> Result<(StatusCode, Json<MealDetails>), HandlerError> {
    let details = import_meal(&state.db, id, body.owner_id).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

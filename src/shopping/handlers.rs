use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AddItemRequest, GenerateRequest, ListQuery, PatchItemRequest},
    generator::Generator,
    repo::PgShoppingListStore,
    repo_types::{ShoppingList, ShoppingListItem, ShoppingListWithItems},
};
use crate::{
    error::ServiceError, groups::services::require_group, meals::repo::PgRecipeCatalog,
    plans::repo::PgPlanCalendar, state::AppState,
};

type HandlerError = (StatusCode, String);

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping-lists", get(list_shopping_lists))
        .route("/shopping-lists/generate", post(generate_shopping_list))
        .route(
            "/shopping-lists/:id",
            get(get_shopping_list).delete(delete_shopping_list),
        )
        .route("/shopping-lists/:id/items", post(add_item))
        .route("/shopping-items/:id", patch(update_item).delete(delete_item))
}

/// POST /shopping-lists/generate { group_id, start_date, end_date }
#[instrument(skip(state, body), fields(group_id = %body.group_id))]
pub async fn generate_shopping_list(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<ShoppingListWithItems>), HandlerError> {
    let range = body.date_range(state.config.max_plan_range_days)?;
    require_group(&state.db, body.group_id).await?;

    let plans = PgPlanCalendar::new(state.db.clone());
    let catalog = PgRecipeCatalog::new(state.db.clone());
    let store = PgShoppingListStore::new(state.db.clone());

    let list = Generator::new(&plans, &catalog, &store)
        .generate(body.group_id, range)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(list)))
}

#[instrument(skip(state))]
pub async fn list_shopping_lists(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ShoppingList>>, HandlerError> {
    let lists = ShoppingList::list_by_group(&state.db, q.group_id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(lists))
}

#[instrument(skip(state))]
pub async fn get_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShoppingListWithItems>, HandlerError> {
    let list = ShoppingList::find(&state.db, id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound("Shopping list"))?;
    let full = list.with_items(&state.db).await.map_err(ServiceError::from)?;
    Ok(Json(full))
}

#[instrument(skip(state))]
pub async fn delete_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let deleted = ShoppingList::delete(&state.db, id)
        .await
        .map_err(ServiceError::from)?;
    if !deleted {
        return Err(ServiceError::NotFound("Shopping list").into());
    }
    info!(shopping_list_id = %id, "shopping list deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /shopping-lists/:id/items { name, quantity?, unit? }, e.g. "toilet paper".
#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ShoppingListItem>), HandlerError> {
    let item = body.into_new_item()?;
    if ShoppingList::find(&state.db, id)
        .await
        .map_err(ServiceError::from)?
        .is_none()
    {
        return Err(ServiceError::NotFound("Shopping list").into());
    }
    let created = ShoppingListItem::create(&state.db, id, &item)
        .await
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchItemRequest>,
) -> Result<Json<ShoppingListItem>, HandlerError> {
    let changes = body.into_changes()?;
    let item = ShoppingListItem::update(&state.db, id, &changes)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound("Shopping list item"))?;
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let deleted = ShoppingListItem::delete(&state.db, id)
        .await
        .map_err(ServiceError::from)?;
    if !deleted {
        return Err(ServiceError::NotFound("Shopping list item").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

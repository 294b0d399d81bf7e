use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Header of a generated list. Never re-derived after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShoppingList {
    pub id: Uuid,
    pub group_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A purchasable line. `name` and `unit` are plain text, not references to
/// the recipe catalog, so users can edit them or add items by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub shopping_list_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub is_purchased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingListWithItems {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingListItem>,
}

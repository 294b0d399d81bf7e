use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use super::repo_types::ShoppingListWithItems;

#[derive(Debug, Clone, PartialEq)]
pub struct NewShoppingList {
    pub group_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShoppingListItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub is_purchased: bool,
}

#[async_trait]
pub trait ShoppingListStore: Send + Sync {
    /// Persists the header and all of its items as one unit. On error nothing
    /// from this call is visible afterwards.
    async fn insert_generated(
        &self,
        list: NewShoppingList,
        items: Vec<NewShoppingListItem>,
    ) -> anyhow::Result<ShoppingListWithItems>;
}

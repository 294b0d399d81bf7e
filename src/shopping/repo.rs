use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{
    repo_types::{ShoppingList, ShoppingListItem, ShoppingListWithItems},
    store::{NewShoppingList, NewShoppingListItem, ShoppingListStore},
};

const LIST_COLUMNS: &str = "id, group_id, start_date, end_date, created_at";
const ITEM_COLUMNS: &str = "id, shopping_list_id, name, quantity, unit, is_purchased";

#[derive(Clone)]
pub struct PgShoppingListStore {
    db: PgPool,
}

impl PgShoppingListStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShoppingListStore for PgShoppingListStore {
    async fn insert_generated(
        &self,
        list: NewShoppingList,
        items: Vec<NewShoppingListItem>,
    ) -> anyhow::Result<ShoppingListWithItems> {
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.db.begin().await.context("begin tx")?;
        let header = insert_list_tx(&mut tx, &list).await?;
        let items = insert_items_tx(&mut tx, header.id, &items).await?;
        tx.commit().await.context("commit tx")?;
        Ok(ShoppingListWithItems {
            list: header,
            items,
        })
    }
}

/// Insert a shopping list header within a transaction.
pub async fn insert_list_tx(
    tx: &mut Transaction<'_, Postgres>,
    list: &NewShoppingList,
) -> anyhow::Result<ShoppingList> {
    let sql = format!(
        "INSERT INTO shopping_lists (group_id, start_date, end_date) \
         VALUES ($1, $2, $3) RETURNING {}",
        LIST_COLUMNS
    );
    let header = sqlx::query_as::<_, ShoppingList>(&sql)
        .bind(list.group_id)
        .bind(list.start_date)
        .bind(list.end_date)
        .fetch_one(&mut **tx)
        .await
        .context("insert shopping list")?;
    Ok(header)
}

/// Insert all items of a list with one multi-row statement.
pub async fn insert_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    shopping_list_id: Uuid,
    items: &[NewShoppingListItem],
) -> anyhow::Result<Vec<ShoppingListItem>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO shopping_list_items (shopping_list_id, name, quantity, unit, is_purchased) ",
    );
    qb.push_values(items, |mut row, item| {
        row.push_bind(shopping_list_id)
            .push_bind(item.name.clone())
            .push_bind(item.quantity)
            .push_bind(item.unit.clone())
            .push_bind(item.is_purchased);
    });
    qb.push(" RETURNING ");
    qb.push(ITEM_COLUMNS);

    let rows = qb
        .build_query_as::<ShoppingListItem>()
        .fetch_all(&mut **tx)
        .await
        .context("insert shopping list items")?;
    Ok(rows)
}

// ---- Queries ----

impl ShoppingList {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ShoppingList>> {
        let sql = format!("SELECT {} FROM shopping_lists WHERE id = $1", LIST_COLUMNS);
        let row = sqlx::query_as::<_, ShoppingList>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find shopping list")?;
        Ok(row)
    }

    pub async fn list_by_group(
        db: &PgPool,
        group_id: Uuid,
    ) -> anyhow::Result<Vec<ShoppingList>> {
        let sql = format!(
            "SELECT {} FROM shopping_lists WHERE group_id = $1 ORDER BY created_at DESC, id",
            LIST_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShoppingList>(&sql)
            .bind(group_id)
            .fetch_all(db)
            .await
            .context("list shopping lists")?;
        Ok(rows)
    }

    /// Returns `false` if there was nothing to delete. Items go with the list.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM shopping_lists WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete shopping list")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn with_items(self, db: &PgPool) -> anyhow::Result<ShoppingListWithItems> {
        let items = ShoppingListItem::list_by_list(db, self.id).await?;
        Ok(ShoppingListWithItems { list: self, items })
    }
}

/// Fields of an item that an edit may change; `None` leaves a field as is.
#[derive(Debug, Default, Clone)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub is_purchased: Option<bool>,
}

impl ShoppingListItem {
    pub async fn list_by_list(
        db: &PgPool,
        shopping_list_id: Uuid,
    ) -> anyhow::Result<Vec<ShoppingListItem>> {
        let sql = format!(
            "SELECT {} FROM shopping_list_items \
             WHERE shopping_list_id = $1 ORDER BY name, unit, id",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShoppingListItem>(&sql)
            .bind(shopping_list_id)
            .fetch_all(db)
            .await
            .context("list shopping list items")?;
        Ok(rows)
    }

    /// Adds a hand-written item to an existing list.
    pub async fn create(
        db: &PgPool,
        shopping_list_id: Uuid,
        item: &NewShoppingListItem,
    ) -> anyhow::Result<ShoppingListItem> {
        let sql = format!(
            "INSERT INTO shopping_list_items \
             (shopping_list_id, name, quantity, unit, is_purchased) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, ShoppingListItem>(&sql)
            .bind(shopping_list_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.is_purchased)
            .fetch_one(db)
            .await
            .context("insert shopping list item")?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &ItemChanges,
    ) -> anyhow::Result<Option<ShoppingListItem>> {
        let sql = format!(
            r#"
            UPDATE shopping_list_items
               SET name = COALESCE($2, name),
                   quantity = COALESCE($3, quantity),
                   unit = COALESCE($4, unit),
                   is_purchased = COALESCE($5, is_purchased)
             WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, ShoppingListItem>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.quantity)
            .bind(changes.unit.as_deref())
            .bind(changes.is_purchased)
            .fetch_optional(db)
            .await
            .context("update shopping list item")?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM shopping_list_items WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete shopping list item")?;
        Ok(res.rows_affected() > 0)
    }
}

/// These tests need a PostgreSQL server; `sqlx::test` reads `DATABASE_URL`
/// and gives each test a fresh migrated database.
/// Run them with `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::repo_types::PlanningGroup;
    use time::macros::date;

    async fn group(db: &PgPool) -> Uuid {
        PlanningGroup::create(db, "Home", &serde_json::json!({}))
            .await
            .unwrap()
            .id
    }

    fn item(name: &str, quantity: f64, unit: &str) -> NewShoppingListItem {
        NewShoppingListItem {
            name: name.into(),
            quantity,
            unit: unit.into(),
            is_purchased: false,
        }
    }

    async fn count(db: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn generated_list_is_stored_with_its_items(pool: PgPool) {
        let group_id = group(&pool).await;
        let store = PgShoppingListStore::new(pool.clone());

        let saved = store
            .insert_generated(
                NewShoppingList {
                    group_id,
                    start_date: date!(2024 - 01 - 01),
                    end_date: date!(2024 - 01 - 07),
                },
                vec![item("Rice", 800.0, "g"), item("Eggs", 12.0, "unit")],
            )
            .await
            .unwrap();

        assert_eq!(saved.list.group_id, group_id);
        assert_eq!(saved.items.len(), 2);
        assert!(saved.items.iter().all(|i| i.shopping_list_id == saved.list.id));

        let reloaded = ShoppingList::find(&pool, saved.list.id)
            .await
            .unwrap()
            .unwrap()
            .with_items(&pool)
            .await
            .unwrap();
        let names: Vec<&str> = reloaded.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Rice"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn failed_item_insert_leaves_no_list_behind(pool: PgPool) {
        let group_id = group(&pool).await;
        let store = PgShoppingListStore::new(pool.clone());

        // Item names are limited to 100 characters by the schema.
        let res = store
            .insert_generated(
                NewShoppingList {
                    group_id,
                    start_date: date!(2024 - 01 - 01),
                    end_date: date!(2024 - 01 - 07),
                },
                vec![
                    item("Rice", 800.0, "g"),
                    item(&"x".repeat(101), 1.0, "unit"),
                ],
            )
            .await;

        assert!(res.is_err());
        assert_eq!(count(&pool, "shopping_lists").await, 0);
        assert_eq!(count(&pool, "shopping_list_items").await, 0);
    }
}

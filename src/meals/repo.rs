use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::repo_types::{Ingredient, Meal, NewMeal, NewRecipeLine, RecipeLineRow};
use crate::shopping::sources::{Recipe, RecipeCatalog, ResolvedLine};

const MEAL_COLUMNS: &str =
    "id, name, base_servings, instructions, owner_id, group_id, source_meal_id, created_at";

// ---- Ingredients ----

impl Ingredient {
    pub async fn create(
        db: &PgPool,
        name: &str,
        owner_id: Option<Uuid>,
    ) -> anyhow::Result<Ingredient> {
        let row = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(db)
        .await
        .context("insert ingredient")?;
        Ok(row)
    }

    /// Global ingredients plus the private ones of `owner_id`.
    pub async fn list_visible(
        db: &PgPool,
        owner_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, owner_id
              FROM ingredients
             WHERE owner_id IS NULL OR owner_id = $1
             ORDER BY name, owner_id NULLS FIRST
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await
        .context("list ingredients")?;
        Ok(rows)
    }

    /// Ids among `ids` that have no ingredient row.
    pub async fn missing_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db)
            .await
            .context("check ingredients")?;
        let mut missing: Vec<Uuid> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
        missing.sort_unstable();
        missing.dedup();
        Ok(missing)
    }
}

/// Id of `owner_id`'s private ingredient called `name`, inserted if missing.
pub async fn private_ingredient_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    name: &str,
) -> anyhow::Result<Uuid> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM ingredients WHERE owner_id = $1 AND name = $2")
            .bind(owner_id)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await
            .context("find private ingredient")?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO ingredients (name, owner_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(owner_id)
    .fetch_one(&mut **tx)
    .await
    .context("insert private ingredient")?;
    Ok(id)
}

// ---- Meals ----

impl Meal {
    /// Newest first. `owner_id = None` lists every meal.
    pub async fn list(
        db: &PgPool,
        owner_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let sql = format!(
            r#"
            SELECT {}
              FROM meals
             WHERE $1::uuid IS NULL OR owner_id = $1
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3
            "#,
            MEAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, Meal>(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await
            .context("list meals")?;
        Ok(rows)
    }

    pub async fn find<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> anyhow::Result<Option<Meal>> {
        let sql = format!("SELECT {} FROM meals WHERE id = $1", MEAL_COLUMNS);
        let row = sqlx::query_as::<_, Meal>(&sql)
            .bind(id)
            .fetch_optional(exec)
            .await
            .context("find meal")?;
        Ok(row)
    }

    /// Lines and plans that use the meal go with it.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete meal")?;
        Ok(res.rows_affected() > 0)
    }
}

/// Insert a meal header within a transaction.
pub async fn insert_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal: &NewMeal,
) -> anyhow::Result<Meal> {
    let sql = format!(
        r#"
        INSERT INTO meals (name, base_servings, instructions, owner_id, group_id, source_meal_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        MEAL_COLUMNS
    );
    let row = sqlx::query_as::<_, Meal>(&sql)
        .bind(&meal.name)
        .bind(meal.base_servings)
        .bind(meal.instructions.as_deref())
        .bind(meal.owner_id)
        .bind(meal.group_id)
        .bind(meal.source_meal_id)
        .fetch_one(&mut **tx)
        .await
        .context("insert meal")?;
    Ok(row)
}

/// Overwrites the editable header fields. `source_meal_id` is kept.
pub async fn update_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    meal: &NewMeal,
) -> anyhow::Result<Option<Meal>> {
    let sql = format!(
        r#"
        UPDATE meals
           SET name = $2,
               base_servings = $3,
               instructions = $4,
               owner_id = $5,
               group_id = $6
         WHERE id = $1
        RETURNING {}
        "#,
        MEAL_COLUMNS
    );
    let row = sqlx::query_as::<_, Meal>(&sql)
        .bind(id)
        .bind(&meal.name)
        .bind(meal.base_servings)
        .bind(meal.instructions.as_deref())
        .bind(meal.owner_id)
        .bind(meal.group_id)
        .fetch_optional(&mut **tx)
        .await
        .context("update meal")?;
    Ok(row)
}

pub async fn insert_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    lines: &[NewRecipeLine],
) -> anyhow::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_lines (meal_id, ingredient_id, quantity, unit) ");
    qb.push_values(lines, |mut row, line| {
        row.push_bind(meal_id)
            .push_bind(line.ingredient_id)
            .push_bind(line.quantity)
            .push_bind(line.unit);
    });
    qb.build()
        .execute(&mut **tx)
        .await
        .context("insert recipe lines")?;
    Ok(())
}

pub async fn delete_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_lines WHERE meal_id = $1")
        .bind(meal_id)
        .execute(&mut **tx)
        .await
        .context("delete recipe lines")?;
    Ok(())
}

impl RecipeLineRow {
    pub async fn list_by_meal<'e, E: PgExecutor<'e>>(
        exec: E,
        meal_id: Uuid,
    ) -> anyhow::Result<Vec<RecipeLineRow>> {
        let rows = sqlx::query_as::<_, RecipeLineRow>(
            r#"
            SELECT rl.id, rl.meal_id, rl.ingredient_id,
                   i.name AS ingredient_name, i.owner_id AS ingredient_owner_id,
                   rl.quantity, rl.unit
              FROM recipe_lines rl
              JOIN ingredients i ON i.id = rl.ingredient_id
             WHERE rl.meal_id = $1
             ORDER BY i.name, rl.unit, rl.id
            "#,
        )
        .bind(meal_id)
        .fetch_all(exec)
        .await
        .context("list recipe lines")?;
        Ok(rows)
    }
}

// ---- Catalog view used by shopping list generation ----

#[derive(Clone)]
pub struct PgRecipeCatalog {
    db: PgPool,
}

impl PgRecipeCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeCatalog for PgRecipeCatalog {
    async fn get_recipe(&self, meal_id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let Some(meal) = Meal::find(&self.db, meal_id).await? else {
            return Ok(None);
        };
        let lines = RecipeLineRow::list_by_meal(&self.db, meal_id)
            .await?
            .into_iter()
            .map(|l| ResolvedLine {
                ingredient_name: l.ingredient_name,
                quantity: l.quantity,
                unit: l.unit,
            })
            .collect();
        Ok(Some(Recipe {
            meal_id: meal.id,
            name: meal.name,
            base_servings: meal.base_servings,
            lines,
        }))
    }
}

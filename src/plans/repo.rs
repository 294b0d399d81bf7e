use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{DailyPlan, NewPlan};
use crate::shopping::sources::{DateRange, PlanCalendar, PlannedEntry};

const PLAN_COLUMNS: &str =
    "id, group_id, date, meal_slot, target_servings, meal_id, is_eating_out, custom_name";

// Slots sort in day order, not alphabetically.
const SLOT_ORDER: &str = "CASE meal_slot WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 \
                          WHEN 'dinner' THEN 2 ELSE 3 END";

impl DailyPlan {
    pub async fn create(db: &PgPool, plan: &NewPlan) -> anyhow::Result<DailyPlan> {
        let sql = format!(
            r#"
            INSERT INTO daily_plans
                (group_id, date, meal_slot, target_servings, meal_id, is_eating_out, custom_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyPlan>(&sql)
            .bind(plan.group_id)
            .bind(plan.date)
            .bind(plan.meal_slot)
            .bind(plan.target_servings)
            .bind(plan.meal_id)
            .bind(plan.is_eating_out)
            .bind(plan.custom_name.as_deref())
            .fetch_one(db)
            .await
            .context("insert daily plan")?;
        Ok(row)
    }

    /// Plans of a group, optionally limited to an inclusive date range.
    pub async fn list(
        db: &PgPool,
        group_id: Uuid,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DailyPlan>> {
        let sql = format!(
            r#"
            SELECT {}
              FROM daily_plans
             WHERE group_id = $1
               AND ($2::date IS NULL OR date >= $2)
               AND ($3::date IS NULL OR date <= $3)
             ORDER BY date, {}, id
            "#,
            PLAN_COLUMNS, SLOT_ORDER
        );
        let rows = sqlx::query_as::<_, DailyPlan>(&sql)
            .bind(group_id)
            .bind(range.map(|r| r.start))
            .bind(range.map(|r| r.end))
            .fetch_all(db)
            .await
            .context("list daily plans")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<DailyPlan>> {
        let sql = format!("SELECT {} FROM daily_plans WHERE id = $1", PLAN_COLUMNS);
        let row = sqlx::query_as::<_, DailyPlan>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find daily plan")?;
        Ok(row)
    }

    /// Writes every field of an already merged plan. The group never changes.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        plan: &NewPlan,
    ) -> anyhow::Result<Option<DailyPlan>> {
        let sql = format!(
            r#"
            UPDATE daily_plans
               SET date = $2,
                   meal_slot = $3,
                   target_servings = $4,
                   meal_id = $5,
                   is_eating_out = $6,
                   custom_name = $7
             WHERE id = $1
            RETURNING {}
            "#,
            PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyPlan>(&sql)
            .bind(id)
            .bind(plan.date)
            .bind(plan.meal_slot)
            .bind(plan.target_servings)
            .bind(plan.meal_id)
            .bind(plan.is_eating_out)
            .bind(plan.custom_name.as_deref())
            .fetch_optional(db)
            .await
            .context("update daily plan")?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM daily_plans WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete daily plan")?;
        Ok(res.rows_affected() > 0)
    }
}

// ---- Calendar view used by shopping list generation ----

#[derive(Clone)]
pub struct PgPlanCalendar {
    db: PgPool,
}

impl PgPlanCalendar {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanCalendar for PgPlanCalendar {
    async fn list_planned_entries(
        &self,
        group_id: Uuid,
        range: &DateRange,
        exclude_eating_out: bool,
    ) -> anyhow::Result<Vec<PlannedEntry>> {
        let sql = format!(
            r#"
            SELECT {}
              FROM daily_plans
             WHERE group_id = $1
               AND date BETWEEN $2 AND $3
               AND ($4 = FALSE OR NOT is_eating_out)
             ORDER BY date, id
            "#,
            PLAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, DailyPlan>(&sql)
            .bind(group_id)
            .bind(range.start)
            .bind(range.end)
            .bind(exclude_eating_out)
            .fetch_all(&self.db)
            .await
            .context("list planned entries")?;
        Ok(rows.into_iter().map(PlannedEntry::from).collect())
    }
}

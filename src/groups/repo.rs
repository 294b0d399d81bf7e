use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::PlanningGroup;

impl PlanningGroup {
    pub async fn create(
        db: &PgPool,
        name: &str,
        planning_config: &serde_json::Value,
    ) -> anyhow::Result<PlanningGroup> {
        let group = sqlx::query_as::<_, PlanningGroup>(
            r#"
            INSERT INTO planning_groups (name, planning_config)
            VALUES ($1, $2)
            RETURNING id, name, planning_config, created_at
            "#,
        )
        .bind(name)
        .bind(planning_config)
        .fetch_one(db)
        .await
        .context("insert planning group")?;
        Ok(group)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PlanningGroup>> {
        let group = sqlx::query_as::<_, PlanningGroup>(
            r#"
            SELECT id, name, planning_config, created_at
            FROM planning_groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find planning group")?;
        Ok(group)
    }

    pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let found: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM planning_groups WHERE id = $1)"#)
                .bind(id)
                .fetch_one(db)
                .await
                .context("check planning group")?;
        Ok(found)
    }
}

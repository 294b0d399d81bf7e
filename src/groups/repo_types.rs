use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A household or set of people sharing one meal calendar.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanningGroup {
    pub id: Uuid,
    pub name: String,
    pub planning_config: serde_json::Value, // e.g. {"mon": true, "tue": false}
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

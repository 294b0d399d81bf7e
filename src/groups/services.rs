use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::PlanningGroup;
use crate::error::{ServiceError, ServiceResult};

/// Fails with a validation error when `group_id` does not name a group.
pub async fn require_group(db: &PgPool, group_id: Uuid) -> ServiceResult<()> {
    if PlanningGroup::exists(db, group_id).await? {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("Unknown group {}", group_id)))
    }
}

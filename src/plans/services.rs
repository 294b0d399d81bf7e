use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreatePlanRequest, PatchPlanRequest},
    repo_types::{DailyPlan, NewPlan},
};
use crate::{
    error::{is_foreign_key_violation, ServiceError, ServiceResult},
    groups::services::require_group,
    meals::repo_types::Meal,
};

/// Normalises a merged plan and enforces: a meal xor eating out, and a
/// place name whenever eating out.
pub fn validate_plan(mut plan: NewPlan) -> ServiceResult<NewPlan> {
    if plan.target_servings < 1 {
        return Err(ServiceError::validation("target_servings must be at least 1"));
    }

    plan.custom_name = plan
        .custom_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if plan.is_eating_out {
        if plan.meal_id.is_some() {
            return Err(ServiceError::validation(
                "An eating-out entry cannot reference a meal",
            ));
        }
        if plan.custom_name.is_none() {
            return Err(ServiceError::validation(
                "custom_name is required when eating out",
            ));
        }
    } else if plan.meal_id.is_none() {
        return Err(ServiceError::validation(
            "Select a meal or mark the entry as eating out",
        ));
    }
    Ok(plan)
}

pub fn plan_from_request(req: CreatePlanRequest) -> ServiceResult<NewPlan> {
    validate_plan(NewPlan {
        group_id: req.group_id,
        date: req.date,
        meal_slot: req.meal_slot,
        target_servings: req.target_servings,
        meal_id: req.meal_id,
        is_eating_out: req.is_eating_out,
        custom_name: req.custom_name,
    })
}

/// Applies `patch` over the stored row. Switching to eating out drops the
/// meal; assigning a meal ends eating out.
pub fn merge_patch(stored: &DailyPlan, patch: PatchPlanRequest) -> ServiceResult<NewPlan> {
    let is_eating_out = match (patch.is_eating_out, patch.meal_id) {
        (Some(flag), _) => flag,
        (None, Some(_)) => false,
        (None, None) => stored.is_eating_out,
    };
    let meal_id = if is_eating_out {
        patch.meal_id
    } else {
        patch.meal_id.or(stored.meal_id)
    };
    let custom_name = patch.custom_name.or_else(|| stored.custom_name.clone());

    validate_plan(NewPlan {
        group_id: stored.group_id,
        date: patch.date.unwrap_or(stored.date),
        meal_slot: patch.meal_slot.unwrap_or(stored.meal_slot),
        target_servings: patch.target_servings.unwrap_or(stored.target_servings),
        meal_id,
        is_eating_out,
        custom_name,
    })
}

async fn require_meal(db: &PgPool, meal_id: Option<Uuid>) -> ServiceResult<()> {
    if let Some(id) = meal_id {
        if Meal::find(db, id).await?.is_none() {
            return Err(ServiceError::Validation(format!("Unknown meal {}", id)));
        }
    }
    Ok(())
}

fn reference_error(e: anyhow::Error) -> ServiceError {
    if is_foreign_key_violation(&e) {
        ServiceError::validation("Plan references an unknown group or meal")
    } else {
        ServiceError::Internal(e)
    }
}

pub async fn create_plan(db: &PgPool, req: CreatePlanRequest) -> ServiceResult<DailyPlan> {
    let plan = plan_from_request(req)?;
    require_group(db, plan.group_id).await?;
    require_meal(db, plan.meal_id).await?;

    let row = DailyPlan::create(db, &plan).await.map_err(reference_error)?;
    info!(plan_id = %row.id, group_id = %row.group_id, date = %row.date, "plan created");
    Ok(row)
}

pub async fn update_plan(
    db: &PgPool,
    id: Uuid,
    patch: PatchPlanRequest,
) -> ServiceResult<DailyPlan> {
    let stored = DailyPlan::find(db, id)
        .await?
        .ok_or(ServiceError::NotFound("Plan"))?;
    let plan = merge_patch(&stored, patch)?;
    if plan.meal_id != stored.meal_id {
        require_meal(db, plan.meal_id).await?;
    }

    DailyPlan::update(db, id, &plan)
        .await
        .map_err(reference_error)?
        .ok_or(ServiceError::NotFound("Plan"))
}

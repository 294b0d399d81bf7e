use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::repo_types::MealSlot;
use crate::{
    error::{ServiceError, ServiceResult},
    shopping::sources::DateRange,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub group_id: Uuid,
    pub date: Date,
    #[serde(default)]
    pub meal_slot: MealSlot,
    #[serde(default = "default_target_servings")]
    pub target_servings: i32,
    pub meal_id: Option<Uuid>,
    #[serde(default)]
    pub is_eating_out: bool,
    pub custom_name: Option<String>,
}

fn default_target_servings() -> i32 {
    4
}

/// Partial edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchPlanRequest {
    pub date: Option<Date>,
    pub meal_slot: Option<MealSlot>,
    pub target_servings: Option<i32>,
    pub meal_id: Option<Uuid>,
    pub is_eating_out: Option<bool>,
    pub custom_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub group_id: Uuid,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl PlanQuery {
    /// The range filter applies only when both bounds are given.
    pub fn range(&self) -> ServiceResult<Option<DateRange>> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => DateRange::checked(start, end)
                .map(Some)
                .ok_or_else(|| ServiceError::validation("start_date must not be after end_date")),
            _ => Ok(None),
        }
    }
}

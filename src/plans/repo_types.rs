use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::shopping::sources::PlannedEntry;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    #[default]
    Lunch,
    Dinner,
    Snack,
}

/// One calendar assignment: a meal, or an "eating out" placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyPlan {
    pub id: Uuid,
    pub group_id: Uuid,
    pub date: Date,
    pub meal_slot: MealSlot,
    pub target_servings: i32, // servings cooked on this occasion
    pub meal_id: Option<Uuid>,
    pub is_eating_out: bool,
    pub custom_name: Option<String>, // restaurant or place when eating out
}

/// A fully merged plan ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub group_id: Uuid,
    pub date: Date,
    pub meal_slot: MealSlot,
    pub target_servings: i32,
    pub meal_id: Option<Uuid>,
    pub is_eating_out: bool,
    pub custom_name: Option<String>,
}

impl From<DailyPlan> for PlannedEntry {
    fn from(p: DailyPlan) -> Self {
        PlannedEntry {
            id: p.id,
            date: p.date,
            meal_id: p.meal_id,
            target_servings: p.target_servings,
            is_eating_out: p.is_eating_out,
        }
    }
}

//! Read-only views the generator consumes from the Plan Calendar and the
//! Recipe Catalog. Postgres implementations live next to the tables they read
//! (`plans::repo`, `meals::repo`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::meals::repo_types::Unit;

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    /// Returns `None` when `start` is after `end`. The range is never reordered.
    pub fn checked(start: Date, end: Date) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).whole_days() + 1
    }
}

/// One calendar assignment as the generator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntry {
    pub id: Uuid,
    pub date: Date,
    pub meal_id: Option<Uuid>,
    pub target_servings: i32,
    pub is_eating_out: bool,
}

/// Recipe line with its ingredient already resolved to a name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
    pub ingredient_name: String,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub meal_id: Uuid,
    pub name: String,
    pub base_servings: i32,
    pub lines: Vec<ResolvedLine>,
}

#[async_trait]
pub trait PlanCalendar: Send + Sync {
    /// Entries of `group_id` dated inside `range`. With `exclude_eating_out`
    /// set, eating-out placeholders are left out.
    async fn list_planned_entries(
        &self,
        group_id: Uuid,
        range: &DateRange,
        exclude_eating_out: bool,
    ) -> anyhow::Result<Vec<PlannedEntry>>;
}

#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// The meal's baseline and its lines; `None` if the meal does not exist.
    async fn get_recipe(&self, meal_id: Uuid) -> anyhow::Result<Option<Recipe>>;
}

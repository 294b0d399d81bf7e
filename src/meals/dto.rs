use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Meal, RecipeLineRow};

#[derive(Debug, Deserialize)]
pub struct IngredientRequest {
    pub name: String,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLineRequest {
    pub ingredient_id: Uuid,
    pub quantity: f64,
    pub unit: String, // aliases such as "gr" or "tbsp" are accepted
}

/// Body of `POST /meals` and `PUT /meals/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct MealRequest {
    pub name: String,
    #[serde(default = "default_base_servings")]
    pub base_servings: i32,
    pub instructions: Option<String>,
    pub owner_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub lines: Vec<RecipeLineRequest>,
}

fn default_base_servings() -> i32 {
    2
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MealQuery {
    pub owner_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl MealQuery {
    /// `(limit, offset)` clamped to sane values.
    pub fn window(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[derive(Debug, Serialize)]
pub struct MealListItem {
    pub id: Uuid,
    pub name: String,
    pub base_servings: i32,
    pub owner_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Meal> for MealListItem {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            name: m.name,
            base_servings: m.base_servings,
            owner_id: m.owner_id,
            group_id: m.group_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    #[serde(flatten)]
    pub meal: Meal,
    pub lines: Vec<RecipeLineRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_request_defaults() {
        let body = serde_json::json!({ "name": "Paella" });
        let req: MealRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.base_servings, 2);
        assert!(req.lines.is_empty());
        assert!(req.owner_id.is_none());
    }

    #[test]
    fn pagination_is_clamped() {
        let body = serde_json::json!({ "limit": 1000, "offset": -5 });
        let q: MealQuery = serde_json::from_value(body).unwrap();
        assert_eq!(q.window(), (100, 0));

        let q: MealQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(q.window(), (20, 0));
    }
}

use std::collections::HashMap;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{MealDetails, MealRequest},
    repo::{
        delete_lines_tx, insert_lines_tx, insert_meal_tx, private_ingredient_tx, update_meal_tx,
    },
    repo_types::{Ingredient, Meal, NewMeal, NewRecipeLine, RecipeLineRow, Unit},
};
use crate::{
    error::{is_foreign_key_violation, ServiceError, ServiceResult},
    groups::services::require_group,
};

const MAX_MEAL_NAME: usize = 200;
pub const MAX_INGREDIENT_NAME: usize = 100;

/// Checks a create/replace body and turns it into rows to write.
pub fn validate_meal(req: MealRequest) -> ServiceResult<(NewMeal, Vec<NewRecipeLine>)> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("Meal name is required"));
    }
    if name.chars().count() > MAX_MEAL_NAME {
        return Err(ServiceError::Validation(format!(
            "Meal name must be at most {} characters",
            MAX_MEAL_NAME
        )));
    }
    if req.base_servings < 1 {
        return Err(ServiceError::validation("base_servings must be at least 1"));
    }

    let lines = req
        .lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if !line.quantity.is_finite() || line.quantity < 0.0 {
                return Err(ServiceError::Validation(format!(
                    "lines[{}]: quantity must be a non-negative number",
                    i
                )));
            }
            let unit: Unit = line
                .unit
                .parse()
                .map_err(|e| ServiceError::Validation(format!("lines[{}]: {}", i, e)))?;
            Ok(NewRecipeLine {
                ingredient_id: line.ingredient_id,
                quantity: line.quantity,
                unit,
            })
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    let instructions = req
        .instructions
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok((
        NewMeal {
            name,
            base_servings: req.base_servings,
            instructions,
            owner_id: req.owner_id,
            group_id: req.group_id,
            source_meal_id: None,
        },
        lines,
    ))
}

pub fn validate_ingredient_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Ingredient name is required"));
    }
    if name.chars().count() > MAX_INGREDIENT_NAME {
        return Err(ServiceError::Validation(format!(
            "Ingredient name must be at most {} characters",
            MAX_INGREDIENT_NAME
        )));
    }
    Ok(name.to_string())
}

/// Whether an imported line must switch to a private ingredient of `target`.
/// Global ingredients and the target's own are reused as they are.
pub fn needs_private_copy(ingredient_owner: Option<Uuid>, target: Uuid) -> bool {
    matches!(ingredient_owner, Some(owner) if owner != target)
}

/// Names of the private ingredients `target` must own before `lines` can be
/// copied, each listed once in first-seen order.
pub fn private_names(lines: &[RecipeLineRow], target: Uuid) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in lines {
        if needs_private_copy(line.ingredient_owner_id, target)
            && !names.contains(&line.ingredient_name)
        {
            names.push(line.ingredient_name.clone());
        }
    }
    names
}

/// Rewrites `lines` for `target`, pointing foreign private ingredients at the
/// ids in `private_ids` (keyed by name).
pub fn remap_lines(
    lines: &[RecipeLineRow],
    target: Uuid,
    private_ids: &HashMap<String, Uuid>,
) -> anyhow::Result<Vec<NewRecipeLine>> {
    lines
        .iter()
        .map(|line| {
            let ingredient_id = if needs_private_copy(line.ingredient_owner_id, target) {
                *private_ids.get(&line.ingredient_name).with_context(|| {
                    format!("no private ingredient '{}' resolved", line.ingredient_name)
                })?
            } else {
                line.ingredient_id
            };
            Ok(NewRecipeLine {
                ingredient_id,
                quantity: line.quantity,
                unit: line.unit,
            })
        })
        .collect()
}

async fn check_references(
    db: &PgPool,
    meal: &NewMeal,
    lines: &[NewRecipeLine],
) -> ServiceResult<()> {
    if let Some(group_id) = meal.group_id {
        require_group(db, group_id).await?;
    }
    let ids: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
    let missing = Ingredient::missing_ids(db, &ids).await?;
    if let Some(id) = missing.first() {
        return Err(ServiceError::Validation(format!("Unknown ingredient {}", id)));
    }
    Ok(())
}

/// Foreign keys can still fail if a referenced row disappears between the
/// check and the write.
fn reference_error(e: anyhow::Error) -> ServiceError {
    if is_foreign_key_violation(&e) {
        ServiceError::validation("Meal references an unknown ingredient or group")
    } else {
        ServiceError::Internal(e)
    }
}

pub async fn load_details(db: &PgPool, meal: Meal) -> ServiceResult<MealDetails> {
    let lines = RecipeLineRow::list_by_meal(db, meal.id).await?;
    Ok(MealDetails { meal, lines })
}

pub async fn create_meal(db: &PgPool, req: MealRequest) -> ServiceResult<MealDetails> {
    let (new_meal, lines) = validate_meal(req)?;
    check_references(db, &new_meal, &lines).await?;

    let mut tx = db.begin().await.context("begin tx")?;
    let meal = insert_meal_tx(&mut tx, &new_meal)
        .await
        .map_err(reference_error)?;
    insert_lines_tx(&mut tx, meal.id, &lines)
        .await
        .map_err(reference_error)?;
    tx.commit().await.context("commit tx")?;

    info!(meal_id = %meal.id, lines = lines.len(), "meal created");
    load_details(db, meal).await
}

/// Replaces the header and every line of an existing meal.
pub async fn replace_meal(
    db: &PgPool,
    id: Uuid,
    req: MealRequest,
) -> ServiceResult<MealDetails> {
    let (new_meal, lines) = validate_meal(req)?;
    check_references(db, &new_meal, &lines).await?;

    let mut tx = db.begin().await.context("begin tx")?;
    let meal = update_meal_tx(&mut tx, id, &new_meal)
        .await
        .map_err(reference_error)?
        .ok_or(ServiceError::NotFound("Meal"))?;
    delete_lines_tx(&mut tx, id).await?;
    insert_lines_tx(&mut tx, id, &lines)
        .await
        .map_err(reference_error)?;
    tx.commit().await.context("commit tx")?;

    info!(meal_id = %id, lines = lines.len(), "meal replaced");
    load_details(db, meal).await
}

/// Copies `source_id` and its lines into `target_owner`'s library.
pub async fn import_meal(
    db: &PgPool,
    source_id: Uuid,
    target_owner: Uuid,
) -> ServiceResult<MealDetails> {
    let mut tx = db.begin().await.context("begin tx")?;

    let source = Meal::find(&mut *tx, source_id)
        .await?
        .ok_or(ServiceError::NotFound("Meal"))?;
    let source_lines = RecipeLineRow::list_by_meal(&mut *tx, source_id).await?;

    let copy = insert_meal_tx(
        &mut tx,
        &NewMeal {
            name: source.name.clone(),
            base_servings: source.base_servings,
            instructions: source.instructions.clone(),
            owner_id: Some(target_owner),
            group_id: None,
            source_meal_id: Some(source.id),
        },
    )
    .await?;

    let mut private_ids: HashMap<String, Uuid> = HashMap::new();
    for name in private_names(&source_lines, target_owner) {
        let id = private_ingredient_tx(&mut tx, target_owner, &name).await?;
        debug!(ingredient = %name, %id, "private ingredient resolved");
        private_ids.insert(name, id);
    }
    let lines = remap_lines(&source_lines, target_owner, &private_ids)?;
    insert_lines_tx(&mut tx, copy.id, &lines).await?;
    tx.commit().await.context("commit tx")?;

    info!(
        source_meal_id = %source_id,
        meal_id = %copy.id,
        owner_id = %target_owner,
        private_ingredients = private_ids.len(),
        "meal imported"
    );
    load_details(db, copy).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::dto::RecipeLineRequest;

    fn request(lines: Vec<RecipeLineRequest>) -> MealRequest {
        MealRequest {
            name: "  Paella ".into(),
            base_servings: 4,
            instructions: Some("   ".into()),
            owner_id: None,
            group_id: None,
            lines,
        }
    }

    fn line(quantity: f64, unit: &str) -> RecipeLineRequest {
        RecipeLineRequest {
            ingredient_id: Uuid::new_v4(),
            quantity,
            unit: unit.into(),
        }
    }

    #[test]
    fn valid_meal_is_normalised() {
        let req = request(vec![line(400.0, "gr"), line(2.0, "cda")]);
        let (meal, lines) = validate_meal(req).unwrap();
        assert_eq!(meal.name, "Paella");
        assert_eq!(meal.base_servings, 4);
        assert!(meal.instructions.is_none());
        assert!(meal.source_meal_id.is_none());
        assert_eq!(lines[0].unit, Unit::G);
        assert_eq!(lines[1].unit, Unit::Tablespoon);
    }

    #[test]
    fn zero_base_servings_is_rejected_on_input() {
        let mut req = request(vec![]);
        req.base_servings = 0;
        let err = validate_meal(req).unwrap_err();
        assert!(err.to_string().contains("base_servings"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut req = request(vec![]);
        req.name = " ".into();
        assert!(validate_meal(req).is_err());
    }

    #[test]
    fn bad_line_reports_its_index() {
        let req = request(vec![line(1.0, "g"), line(-2.0, "g")]);
        let err = validate_meal(req).unwrap_err();
        assert!(err.to_string().starts_with("lines[1]"));

        let req = request(vec![line(1.0, "pizca")]);
        let err = validate_meal(req).unwrap_err();
        assert!(err.to_string().starts_with("lines[0]: unknown unit 'pizca'"));
    }

    #[test]
    fn ingredient_name_limits() {
        assert_eq!(validate_ingredient_name("  Saffron ").unwrap(), "Saffron");
        assert!(validate_ingredient_name("").is_err());
        assert!(validate_ingredient_name(&"a".repeat(MAX_INGREDIENT_NAME + 1)).is_err());
    }

    #[test]
    fn only_foreign_private_ingredients_are_copied() {
        let target = Uuid::new_v4();
        assert!(!needs_private_copy(None, target));
        assert!(!needs_private_copy(Some(target), target));
        assert!(needs_private_copy(Some(Uuid::new_v4()), target));
    }

    fn row(name: &str, owner: Option<Uuid>, quantity: f64, unit: Unit) -> RecipeLineRow {
        RecipeLineRow {
            id: Uuid::new_v4(),
            meal_id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: name.into(),
            ingredient_owner_id: owner,
            quantity,
            unit,
        }
    }

    #[test]
    fn import_resolves_each_foreign_name_once() {
        let source_owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let lines = vec![
            row("Saffron", Some(source_owner), 1.0, Unit::G),
            row("Rice", None, 400.0, Unit::G),
            row("Saffron", Some(source_owner), 0.5, Unit::Teaspoon),
            row("Stock", Some(target), 1.0, Unit::L),
            row("Chorizo", Some(source_owner), 200.0, Unit::G),
        ];
        assert_eq!(private_names(&lines, target), vec!["Saffron", "Chorizo"]);
    }

    #[test]
    fn remapped_lines_share_one_private_ingredient() {
        let source_owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        let lines = vec![
            row("Saffron", Some(source_owner), 1.0, Unit::G),
            row("Rice", None, 400.0, Unit::G),
            row("Saffron", Some(source_owner), 0.5, Unit::Teaspoon),
            row("Stock", Some(target), 1.0, Unit::L),
        ];
        let saffron = Uuid::new_v4();
        let private_ids = HashMap::from([("Saffron".to_string(), saffron)]);

        let remapped = remap_lines(&lines, target, &private_ids).unwrap();
        assert_eq!(remapped.len(), 4);
        assert_eq!(remapped[0].ingredient_id, saffron);
        assert_eq!(remapped[2].ingredient_id, saffron);
        // Global and target-owned ingredients keep their ids.
        assert_eq!(remapped[1].ingredient_id, lines[1].ingredient_id);
        assert_eq!(remapped[3].ingredient_id, lines[3].ingredient_id);
        assert_eq!(remapped[2].quantity, 0.5);
        assert_eq!(remapped[2].unit, Unit::Teaspoon);
    }

    #[test]
    fn remap_fails_on_unresolved_private_name() {
        let lines = vec![row("Saffron", Some(Uuid::new_v4()), 1.0, Unit::G)];
        let resolved = HashMap::new();
        let err = remap_lines(&lines, Uuid::new_v4(), &resolved).unwrap_err();
        assert!(err.to_string().contains("Saffron"));
    }

    fn owned_request(owner: Uuid, name: &str, lines: Vec<(Uuid, f64)>) -> MealRequest {
        MealRequest {
            name: name.into(),
            base_servings: 2,
            instructions: None,
            owner_id: Some(owner),
            group_id: None,
            lines: lines
                .into_iter()
                .map(|(ingredient_id, quantity)| RecipeLineRequest {
                    ingredient_id,
                    quantity,
                    unit: "g".into(),
                })
                .collect(),
        }
    }

    // Needs a PostgreSQL server at DATABASE_URL; run with `cargo test -- --ignored`.
    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn importing_twice_reuses_the_private_copy(pool: PgPool) {
        let author = Uuid::new_v4();
        let reader = Uuid::new_v4();
        let saffron = Ingredient::create(&pool, "Saffron", Some(author))
            .await
            .unwrap();
        let salt = Ingredient::create(&pool, "Salt", None).await.unwrap();

        let req = owned_request(author, "Paella", vec![(saffron.id, 1.0), (salt.id, 5.0)]);
        let paella = create_meal(&pool, req).await.unwrap();
        let req = owned_request(author, "Risotto", vec![(saffron.id, 0.5)]);
        let risotto = create_meal(&pool, req).await.unwrap();

        let first = import_meal(&pool, paella.meal.id, reader).await.unwrap();
        let second = import_meal(&pool, risotto.meal.id, reader).await.unwrap();

        assert_eq!(first.meal.owner_id, Some(reader));
        assert_eq!(first.meal.source_meal_id, Some(paella.meal.id));

        let copied = |d: &MealDetails, name: &str| {
            d.lines
                .iter()
                .find(|l| l.ingredient_name == name)
                .map(|l| (l.ingredient_id, l.ingredient_owner_id))
                .unwrap()
        };
        let (first_saffron, owner) = copied(&first, "Saffron");
        assert_ne!(first_saffron, saffron.id);
        assert_eq!(owner, Some(reader));
        assert_eq!(copied(&second, "Saffron").0, first_saffron);
        assert_eq!(copied(&first, "Salt").0, salt.id);

        let private: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE owner_id = $1")
                .bind(reader)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(private, 1);
    }
}

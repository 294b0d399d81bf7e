use std::collections::{hash_map::Entry, HashMap};

use anyhow::{anyhow, Context};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    aggregate::Aggregator,
    repo_types::ShoppingListWithItems,
    sources::{DateRange, PlanCalendar, Recipe, RecipeCatalog},
    store::{NewShoppingList, ShoppingListStore},
};

/// Builds shopping lists out of a group's meal calendar.
///
/// Reads are not locked against concurrent edits of plans or recipes; only
/// the final write is transactional. Two calls for overlapping ranges produce
/// two independent lists.
pub struct Generator<'a> {
    plans: &'a dyn PlanCalendar,
    catalog: &'a dyn RecipeCatalog,
    store: &'a dyn ShoppingListStore,
}

impl<'a> Generator<'a> {
    pub fn new(
        plans: &'a dyn PlanCalendar,
        catalog: &'a dyn RecipeCatalog,
        store: &'a dyn ShoppingListStore,
    ) -> Self {
        Self {
            plans,
            catalog,
            store,
        }
    }

    /// Aggregates every non-eating-out entry of `group_id` inside `range` and
    /// persists the result as a new list. An empty calendar yields a list
    /// with no items.
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    pub async fn generate(
        &self,
        group_id: Uuid,
        range: DateRange,
    ) -> anyhow::Result<ShoppingListWithItems> {
        let entries = self
            .plans
            .list_planned_entries(group_id, &range, true)
            .await
            .context("load planned entries")?;

        let mut recipes: HashMap<Uuid, Recipe> = HashMap::new();
        let mut aggregator = Aggregator::new();

        let qualifying = entries
            .iter()
            .filter(|e| !e.is_eating_out && range.contains(e.date));
        for entry in qualifying {
            let meal_id = entry
                .meal_id
                .ok_or_else(|| anyhow!("planned entry {} has no meal", entry.id))?;

            let recipe = match recipes.entry(meal_id) {
                Entry::Occupied(cached) => cached.into_mut(),
                Entry::Vacant(slot) => {
                    let recipe = self
                        .catalog
                        .get_recipe(meal_id)
                        .await
                        .with_context(|| format!("load recipe {}", meal_id))?
                        .ok_or_else(|| {
                            anyhow!(
                                "planned entry {} references missing meal {}",
                                entry.id,
                                meal_id
                            )
                        })?;
                    debug!(
                        %meal_id,
                        meal = %recipe.name,
                        lines = recipe.lines.len(),
                        "recipe loaded"
                    );
                    slot.insert(recipe)
                }
            };

            aggregator.add_recipe(recipe, entry.target_servings);
        }

        if aggregator.is_empty() {
            debug!(entries = entries.len(), "no ingredients to buy in range");
        }
        let occasions = aggregator.contributions();
        let items = aggregator.into_items();
        let item_count = items.len();

        let list = self
            .store
            .insert_generated(
                NewShoppingList {
                    group_id,
                    start_date: range.start,
                    end_date: range.end,
                },
                items,
            )
            .await
            .context("persist shopping list")?;

        info!(
            %group_id,
            shopping_list_id = %list.list.id,
            occasions,
            distinct_meals = recipes.len(),
            items = item_count,
            "shopping list generated"
        );
        Ok(list)
    }
}

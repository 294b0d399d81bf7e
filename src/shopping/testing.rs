//! In-memory implementations of the generator's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{
    repo_types::{ShoppingList, ShoppingListItem, ShoppingListWithItems},
    sources::{DateRange, PlanCalendar, PlannedEntry, Recipe, RecipeCatalog, ResolvedLine},
    store::{NewShoppingList, NewShoppingListItem, ShoppingListStore},
};
use crate::meals::repo_types::Unit;

#[derive(Default)]
pub struct MemoryCalendar {
    entries: Vec<(Uuid, PlannedEntry)>,
    /// Return eating-out rows even when asked to exclude them.
    pub ignore_exclusion_flag: bool,
}

impl MemoryCalendar {
    pub fn plan(&mut self, group_id: Uuid, date: Date, meal_id: Uuid, target_servings: i32) {
        self.entries.push((
            group_id,
            PlannedEntry {
                id: Uuid::new_v4(),
                date,
                meal_id: Some(meal_id),
                target_servings,
                is_eating_out: false,
            },
        ));
    }

    pub fn eat_out(&mut self, group_id: Uuid, date: Date, meal_id: Option<Uuid>) {
        self.entries.push((
            group_id,
            PlannedEntry {
                id: Uuid::new_v4(),
                date,
                meal_id,
                target_servings: 4,
                is_eating_out: true,
            },
        ));
    }
}

#[async_trait]
impl PlanCalendar for MemoryCalendar {
    async fn list_planned_entries(
        &self,
        group_id: Uuid,
        range: &DateRange,
        exclude_eating_out: bool,
    ) -> anyhow::Result<Vec<PlannedEntry>> {
        let skip_eating_out = exclude_eating_out && !self.ignore_exclusion_flag;
        Ok(self
            .entries
            .iter()
            .filter(|(g, e)| *g == group_id && range.contains(e.date))
            .filter(|(_, e)| !(skip_eating_out && e.is_eating_out))
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    recipes: HashMap<Uuid, Recipe>,
    lookups: AtomicUsize,
}

impl MemoryCatalog {
    pub fn add(&mut self, name: &str, base_servings: i32, lines: &[(&str, Unit, f64)]) -> Uuid {
        let meal_id = Uuid::new_v4();
        let lines = lines
            .iter()
            .map(|(n, u, q)| ResolvedLine {
                ingredient_name: n.to_string(),
                quantity: *q,
                unit: *u,
            })
            .collect();
        self.recipes.insert(
            meal_id,
            Recipe {
                meal_id,
                name: name.to_string(),
                base_servings,
                lines,
            },
        );
        meal_id
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeCatalog for MemoryCatalog {
    async fn get_recipe(&self, meal_id: Uuid) -> anyhow::Result<Option<Recipe>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.recipes.get(&meal_id).cloned())
    }
}

#[derive(Default)]
struct Committed {
    lists: Vec<ShoppingList>,
    items: Vec<ShoppingListItem>,
}

/// Store that stages a whole insert before publishing it, mirroring a
/// database transaction. `failing_after(n)` aborts once `n` items are staged.
#[derive(Default)]
pub struct MemoryStore {
    committed: Mutex<Committed>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn failing_after(items: usize) -> Self {
        Self {
            committed: Mutex::default(),
            fail_after: Some(items),
        }
    }

    pub fn list_count(&self) -> usize {
        self.committed.lock().unwrap().lists.len()
    }

    pub fn item_count(&self) -> usize {
        self.committed.lock().unwrap().items.len()
    }
}

#[async_trait]
impl ShoppingListStore for MemoryStore {
    async fn insert_generated(
        &self,
        list: NewShoppingList,
        items: Vec<NewShoppingListItem>,
    ) -> anyhow::Result<ShoppingListWithItems> {
        let header = ShoppingList {
            id: Uuid::new_v4(),
            group_id: list.group_id,
            start_date: list.start_date,
            end_date: list.end_date,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut staged = Vec::with_capacity(items.len());
        for item in items {
            if self.fail_after == Some(staged.len()) {
                return Err(anyhow!("simulated failure after {} items", staged.len()));
            }
            staged.push(ShoppingListItem {
                id: Uuid::new_v4(),
                shopping_list_id: header.id,
                name: item.name,
                quantity: item.quantity,
                unit: item.unit,
                is_purchased: item.is_purchased,
            });
        }

        let mut committed = self.committed.lock().unwrap();
        committed.lists.push(header.clone());
        committed.items.extend(staged.iter().cloned());
        Ok(ShoppingListWithItems {
            list: header,
            items: staged,
        })
    }
}

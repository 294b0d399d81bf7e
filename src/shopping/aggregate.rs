//! Scaling and merging of recipe quantities into shopping-list lines.
//!
//! Every planned meal contributes `line.quantity * target / base` for each of
//! its lines. Contributions are summed per `(ingredient name, unit)`; the same
//! ingredient in two different units stays two separate lines because no unit
//! conversion is attempted. Sums are rounded once, at the end, to two
//! decimals, half away from zero.

use std::collections::BTreeMap;

use super::{sources::Recipe, store::NewShoppingListItem};
use crate::meals::repo_types::Unit;

/// Baseline used for scaling. A stored value of zero or less counts as 1 so a
/// malformed recipe can never cause a division by zero.
pub fn effective_base_servings(base_servings: i32) -> i32 {
    if base_servings > 0 {
        base_servings
    } else {
        1
    }
}

pub fn serving_ratio(target_servings: i32, base_servings: i32) -> f64 {
    f64::from(target_servings) / f64::from(effective_base_servings(base_servings))
}

pub fn round_quantity(quantity: f64) -> f64 {
    (quantity * 100.0).round() / 100.0
}

type Key = (String, Unit);

#[derive(Debug, Default)]
pub struct Aggregator {
    totals: BTreeMap<Key, f64>,
    contributions: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one planned occasion of `recipe` cooked for `target_servings`.
    pub fn add_recipe(&mut self, recipe: &Recipe, target_servings: i32) {
        let ratio = serving_ratio(target_servings, recipe.base_servings);
        for line in &recipe.lines {
            self.add(&line.ingredient_name, line.unit, line.quantity * ratio);
        }
        self.contributions += 1;
    }

    fn add(&mut self, name: &str, unit: Unit, quantity: f64) {
        *self.totals.entry((name.to_string(), unit)).or_insert(0.0) += quantity;
    }

    /// Number of recipes folded in so far.
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// One unpurchased item per key, ordered by name then unit.
    pub fn into_items(self) -> Vec<NewShoppingListItem> {
        self.totals
            .into_iter()
            .map(|((name, unit), total)| NewShoppingListItem {
                name,
                quantity: round_quantity(total),
                unit: unit.as_str().to_string(),
                is_purchased: false,
            })
            .collect()
    }
}

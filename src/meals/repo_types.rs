use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Units a recipe line can be measured in. Quantities in different units are
/// never converted into one another.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Ml,
    L,
    Unit,
    Tablespoon,
    Teaspoon,
}

impl Unit {
    pub const ALL: [Unit; 7] = [
        Unit::G,
        Unit::Kg,
        Unit::Ml,
        Unit::L,
        Unit::Unit,
        Unit::Tablespoon,
        Unit::Teaspoon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Ml => "ml",
            Unit::L => "l",
            Unit::Unit => "unit",
            Unit::Tablespoon => "tablespoon",
            Unit::Teaspoon => "teaspoon",
        }
    }

    /// Canonical names, comma separated.
    pub fn accepted() -> String {
        Unit::ALL.map(Unit::as_str).join(", ")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit '{0}' (expected one of {})", Unit::accepted())]
pub struct UnknownUnit(pub String);

impl FromStr for Unit {
    type Err = UnknownUnit;

    /// Accepts the canonical names plus the spellings people type in recipe
    /// forms (`gr`, `tbsp`, `cda`, `unidades`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_lowercase().as_str() {
            "g" | "gr" | "gram" | "grams" | "gramo" | "gramos" => Unit::G,
            "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" | "kilogramo" | "kilogramos" => {
                Unit::Kg
            }
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" | "mililitro"
            | "mililitros" => Unit::Ml,
            "l" | "liter" | "liters" | "litre" | "litres" | "litro" | "litros" => Unit::L,
            "unit" | "units" | "u" | "ud" | "uds" | "unds" | "unidad" | "unidades" => Unit::Unit,
            "tablespoon" | "tablespoons" | "tbsp" | "cda" | "cda." | "cucharada" | "cucharadas" => {
                Unit::Tablespoon
            }
            "teaspoon" | "teaspoons" | "tsp" | "cdta" | "cdta." | "cucharadita"
            | "cucharaditas" => Unit::Teaspoon,
            _ => return Err(UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

/// Ingredient definition. `owner_id = None` marks a global ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
}

/// Recipe header row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub base_servings: i32, // servings the stored quantities are written for
    pub instructions: Option<String>,
    pub owner_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub source_meal_id: Option<Uuid>, // set on imported copies
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Recipe line joined with its ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeLineRow {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub ingredient_owner_id: Option<Uuid>,
    pub quantity: f64,
    pub unit: Unit,
}

/// Header fields written by create, replace and import.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub name: String,
    pub base_servings: i32,
    pub instructions: Option<String>,
    pub owner_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub source_meal_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipeLine {
    pub ingredient_id: Uuid,
    pub quantity: f64,
    pub unit: Unit,
}

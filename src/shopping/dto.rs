use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::{repo::ItemChanges, sources::DateRange, store::NewShoppingListItem};
use crate::error::{ServiceError, ServiceResult};

const MAX_ITEM_NAME: usize = 100;
const MAX_ITEM_UNIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub group_id: Uuid,
    pub start_date: Date,
    pub end_date: Date,
}

impl GenerateRequest {
    /// Rejects reversed ranges and ranges longer than `max_days`.
    pub fn date_range(&self, max_days: i64) -> ServiceResult<DateRange> {
        let range = DateRange::checked(self.start_date, self.end_date).ok_or_else(|| {
            ServiceError::validation("start_date must not be after end_date")
        })?;
        if range.days() > max_days {
            return Err(ServiceError::Validation(format!(
                "date range covers {} days, at most {} allowed",
                range.days(),
                max_days
            )));
        }
        Ok(range)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub group_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl AddItemRequest {
    pub fn into_new_item(self) -> ServiceResult<NewShoppingListItem> {
        Ok(NewShoppingListItem {
            name: clean_text("name", &self.name, MAX_ITEM_NAME)?,
            quantity: check_quantity(self.quantity.unwrap_or(1.0))?,
            unit: match self.unit {
                Some(unit) => clean_text("unit", &unit, MAX_ITEM_UNIT)?,
                None => "unit".to_string(),
            },
            is_purchased: false,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchItemRequest {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub is_purchased: Option<bool>,
}

impl PatchItemRequest {
    pub fn into_changes(self) -> ServiceResult<ItemChanges> {
        let changes = ItemChanges {
            name: self
                .name
                .map(|n| clean_text("name", &n, MAX_ITEM_NAME))
                .transpose()?,
            quantity: self.quantity.map(check_quantity).transpose()?,
            unit: self
                .unit
                .map(|u| clean_text("unit", &u, MAX_ITEM_UNIT))
                .transpose()?,
            is_purchased: self.is_purchased,
        };
        if changes.name.is_none()
            && changes.quantity.is_none()
            && changes.unit.is_none()
            && changes.is_purchased.is_none()
        {
            return Err(ServiceError::validation("nothing to update"));
        }
        Ok(changes)
    }
}

fn clean_text(field: &str, value: &str, max_len: usize) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max_len {
        return Err(ServiceError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(value.to_string())
}

fn check_quantity(quantity: f64) -> ServiceResult<f64> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ServiceError::validation(
            "quantity must be a non-negative number",
        ));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn generate(start: Date, end: Date) -> GenerateRequest {
        GenerateRequest {
            group_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = generate(date!(2024 - 01 - 07), date!(2024 - 01 - 01))
            .date_range(366)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn range_longer_than_limit_is_rejected() {
        let req = generate(date!(2024 - 01 - 01), date!(2024 - 01 - 08));
        assert!(req.date_range(7).is_err());
        assert_eq!(req.date_range(8).unwrap().days(), 8);
    }

    #[test]
    fn generate_request_parses_iso_dates() {
        let body = serde_json::json!({
            "group_id": "8d2f1c4e-0a51-4b0c-9b7e-2f4a6d1e3c77",
            "start_date": "2024-01-01",
            "end_date": "2024-01-07"
        });
        let req: GenerateRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.start_date, date!(2024 - 01 - 01));
        assert_eq!(req.end_date, date!(2024 - 01 - 07));
    }

    #[test]
    fn manual_item_gets_defaults() {
        let item = AddItemRequest {
            name: "  toilet paper ".into(),
            quantity: None,
            unit: None,
        }
        .into_new_item()
        .unwrap();
        assert_eq!(item.name, "toilet paper");
        assert_eq!(item.quantity, 1.0);
        assert_eq!(item.unit, "unit");
        assert!(!item.is_purchased);
    }

    #[test]
    fn manual_item_rejects_bad_quantity() {
        for quantity in [-1.0, f64::NAN, f64::INFINITY] {
            let res = AddItemRequest {
                name: "milk".into(),
                quantity: Some(quantity),
                unit: Some("l".into()),
            }
            .into_new_item();
            assert!(res.is_err(), "quantity {} accepted", quantity);
        }
    }

    #[test]
    fn overly_long_name_is_rejected() {
        let res = AddItemRequest {
            name: "x".repeat(MAX_ITEM_NAME + 1),
            quantity: None,
            unit: None,
        }
        .into_new_item();
        assert!(res.is_err());
    }

    #[test]
    fn patch_toggles_purchased_only() {
        let changes = PatchItemRequest {
            is_purchased: Some(true),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.is_purchased, Some(true));
        assert!(changes.name.is_none());
        assert!(changes.quantity.is_none());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(PatchItemRequest::default().into_changes().is_err());
    }

    #[test]
    fn patch_rejects_blank_unit() {
        let res = PatchItemRequest {
            unit: Some("   ".into()),
            ..Default::default()
        }
        .into_changes();
        assert!(res.is_err());
    }
}

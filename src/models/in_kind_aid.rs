use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::text;
use crate::services::validation;

/// Item categories. The tokens are identical on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Food,
    Clothing,
    Furniture,
    Medical,
    Fuel,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemUnit {
    #[default]
    Piece,
    Kg,
    Package,
    Liter,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InKindAidRow {
    pub id: String,
    pub beneficiary_id: String,
    pub item_name: String,
    pub category: Option<ItemCategory>,
    pub quantity: Option<i32>,
    pub unit: Option<ItemUnit>,
    pub delivered_by: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InKindAid {
    pub id: String,
    pub beneficiary_id: String,
    pub item_name: String,
    pub category: ItemCategory,
    /// Null or non-positive quantities count as one item.
    pub quantity: u32,
    pub unit: ItemUnit,
    pub delivered_by: String,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl From<InKindAidRow> for InKindAid {
    fn from(row: InKindAidRow) -> Self {
        Self {
            id: row.id,
            beneficiary_id: row.beneficiary_id,
            item_name: row.item_name,
            category: row.category.unwrap_or_default(),
            quantity: row
                .quantity
                .and_then(|q| u32::try_from(q).ok())
                .filter(|q| *q > 0)
                .unwrap_or(1),
            unit: row.unit.unwrap_or_default(),
            delivered_by: text(row.delivered_by),
            delivered_at: row.delivered_at,
            notes: text(row.notes),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InKindAidForm {
    #[garde(required, length(min = 1), custom(validation::optional_not_blank))]
    pub beneficiary_id: Option<String>,

    #[garde(required, length(min = 2, max = 200))]
    pub item_name: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub category: ItemCategory,

    #[garde(required, range(min = 1, max = 10000))]
    pub quantity: Option<u32>,

    #[garde(skip)]
    #[serde(default)]
    pub unit: ItemUnit,

    #[garde(length(max = 2000))]
    pub notes: Option<String>,
}

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::text;
use crate::services::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiggyBankStatusCode {
    Active,
    Collected,
    Lost,
    Damaged,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PiggyBankStatus {
    Placed,
    Collected,
    Lost,
    Damaged,
    Retired,
}

impl From<PiggyBankStatusCode> for PiggyBankStatus {
    fn from(code: PiggyBankStatusCode) -> Self {
        match code {
            PiggyBankStatusCode::Active => PiggyBankStatus::Placed,
            PiggyBankStatusCode::Collected => PiggyBankStatus::Collected,
            PiggyBankStatusCode::Lost => PiggyBankStatus::Lost,
            PiggyBankStatusCode::Damaged => PiggyBankStatus::Damaged,
            PiggyBankStatusCode::Inactive => PiggyBankStatus::Retired,
        }
    }
}

/// Row of the `piggy_banks` table. `code` is the label printed on the box
/// and the value the scanner reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiggyBankRow {
    pub id: String,
    pub code: String,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<PiggyBankStatusCode>,
    pub total_collected: Option<f64>,
    pub placed_at: Option<DateTime<Utc>>,
    pub last_collected_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiggyBank {
    pub id: String,
    pub code: String,
    pub location_name: String,
    pub address: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub status: PiggyBankStatus,
    pub total_collected: f64,
    pub placed_at: Option<DateTime<Utc>>,
    pub last_collected_at: Option<DateTime<Utc>>,
}

impl From<PiggyBankRow> for PiggyBank {
    fn from(row: PiggyBankRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            location_name: text(row.location_name),
            address: text(row.address),
            contact_name: text(row.contact_name),
            contact_phone: text(row.contact_phone),
            status: row
                .status
                .map(Into::into)
                .unwrap_or(PiggyBankStatus::Placed),
            total_collected: row.total_collected.unwrap_or(0.0),
            placed_at: row.placed_at,
            last_collected_at: row.last_collected_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PiggyBankForm {
    #[garde(required, length(min = 3, max = 32), custom(validation::optional_not_blank))]
    pub code: Option<String>,

    #[garde(required, length(min = 2, max = 200))]
    pub location_name: Option<String>,

    #[garde(length(max = 500))]
    pub address: Option<String>,

    #[garde(length(max = 100))]
    pub contact_name: Option<String>,

    #[garde(custom(validation::optional_phone))]
    pub contact_phone: Option<String>,
}

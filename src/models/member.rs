use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::{full_name, text};
use crate::services::validation;

/// Dues state as the `members` table tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuesStatusCode {
    Paid,
    Unpaid,
    PartiallyPaid,
}

/// Dues state shown on the member card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuesStatus {
    Current,
    Overdue,
    Partial,
}

impl From<DuesStatusCode> for DuesStatus {
    fn from(code: DuesStatusCode) -> Self {
        match code {
            DuesStatusCode::Paid => DuesStatus::Current,
            DuesStatusCode::Unpaid => DuesStatus::Overdue,
            DuesStatusCode::PartiallyPaid => DuesStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTypeCode {
    Standard,
    Honorary,
    Student,
    Corporate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MembershipType {
    Standard,
    Honorary,
    Student,
    Corporate,
}

impl From<MembershipTypeCode> for MembershipType {
    fn from(code: MembershipTypeCode) -> Self {
        match code {
            MembershipTypeCode::Standard => MembershipType::Standard,
            MembershipTypeCode::Honorary => MembershipType::Honorary,
            MembershipTypeCode::Student => MembershipType::Student,
            MembershipTypeCode::Corporate => MembershipType::Corporate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRow {
    pub id: String,
    pub member_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub membership_type: Option<MembershipTypeCode>,
    pub dues_status: Option<DuesStatusCode>,
    pub monthly_dues: Option<f64>,
    pub joined_at: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub member_number: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub membership_type: MembershipType,
    /// No recorded dues state is treated as unpaid.
    pub dues_status: DuesStatus,
    pub monthly_dues: f64,
    pub joined_at: Option<NaiveDate>,
    /// Members are active unless the row says otherwise.
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            full_name: full_name(&row.first_name, &row.last_name),
            id: row.id,
            member_number: text(row.member_number),
            first_name: row.first_name,
            last_name: row.last_name,
            national_id: text(row.national_id),
            phone: text(row.phone),
            email: text(row.email),
            address: text(row.address),
            membership_type: row
                .membership_type
                .map(Into::into)
                .unwrap_or(MembershipType::Standard),
            dues_status: row
                .dues_status
                .map(Into::into)
                .unwrap_or(DuesStatus::Overdue),
            monthly_dues: row.monthly_dues.unwrap_or(0.0),
            joined_at: row.joined_at,
            is_active: row.is_active.unwrap_or(true),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberForm {
    #[garde(required, length(min = 2, max = 50), custom(validation::optional_not_blank))]
    pub first_name: Option<String>,

    #[garde(required, length(min = 2, max = 50), custom(validation::optional_not_blank))]
    pub last_name: Option<String>,

    #[garde(required, custom(validation::optional_national_id))]
    pub national_id: Option<String>,

    #[garde(required, custom(validation::optional_phone))]
    pub phone: Option<String>,

    #[garde(email)]
    pub email: Option<String>,

    #[garde(length(max = 500))]
    pub address: Option<String>,

    #[garde(required)]
    pub membership_type: Option<MembershipType>,

    #[garde(custom(validation::optional_positive_amount))]
    pub monthly_dues: Option<f64>,
}

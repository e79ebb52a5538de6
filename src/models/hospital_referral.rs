use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::text;
use crate::services::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatusCode {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferralStatus {
    Scheduled,
    Attended,
    Cancelled,
    Missed,
}

impl From<ReferralStatusCode> for ReferralStatus {
    fn from(code: ReferralStatusCode) -> Self {
        match code {
            ReferralStatusCode::Scheduled => ReferralStatus::Scheduled,
            ReferralStatusCode::Completed => ReferralStatus::Attended,
            ReferralStatusCode::Cancelled => ReferralStatus::Cancelled,
            ReferralStatusCode::NoShow => ReferralStatus::Missed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalReferralRow {
    pub id: String,
    pub beneficiary_id: String,
    pub hospital_name: String,
    pub department: Option<String>,
    pub doctor_name: Option<String>,
    pub referral_date: Option<NaiveDate>,
    pub appointment_at: Option<DateTime<Utc>>,
    pub status: Option<ReferralStatusCode>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalReferral {
    pub id: String,
    pub beneficiary_id: String,
    pub hospital_name: String,
    pub department: String,
    pub doctor_name: String,
    pub referral_date: Option<NaiveDate>,
    pub appointment_at: Option<DateTime<Utc>>,
    pub status: ReferralStatus,
    pub diagnosis: String,
    pub notes: String,
}

impl From<HospitalReferralRow> for HospitalReferral {
    fn from(row: HospitalReferralRow) -> Self {
        Self {
            id: row.id,
            beneficiary_id: row.beneficiary_id,
            hospital_name: row.hospital_name,
            department: text(row.department),
            doctor_name: text(row.doctor_name),
            referral_date: row.referral_date,
            appointment_at: row.appointment_at,
            status: row
                .status
                .map(Into::into)
                .unwrap_or(ReferralStatus::Scheduled),
            diagnosis: text(row.diagnosis),
            notes: text(row.notes),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HospitalReferralForm {
    #[garde(required, length(min = 1), custom(validation::optional_not_blank))]
    pub beneficiary_id: Option<String>,

    #[garde(required, length(min = 2, max = 200))]
    pub hospital_name: Option<String>,

    #[garde(length(max = 100))]
    pub department: Option<String>,

    #[garde(length(max = 100))]
    pub doctor_name: Option<String>,

    #[garde(required)]
    pub referral_date: Option<NaiveDate>,

    #[garde(skip)]
    pub appointment_at: Option<DateTime<Utc>>,

    #[garde(length(max = 2000))]
    pub notes: Option<String>,
}

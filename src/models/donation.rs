use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::payment::{PaymentMethod, PaymentMethodCode};
use super::{currency, default_currency, text};
use crate::services::validation::{self, required, validate_form, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationTypeCode {
    General,
    Zakat,
    Sadaqah,
    Fitra,
    Sacrifice,
    InKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DonationType {
    General,
    Zakat,
    Sadaqah,
    Fitra,
    Sacrifice,
    InKind,
}

impl From<DonationTypeCode> for DonationType {
    fn from(code: DonationTypeCode) -> Self {
        match code {
            DonationTypeCode::General => DonationType::General,
            DonationTypeCode::Zakat => DonationType::Zakat,
            DonationTypeCode::Sadaqah => DonationType::Sadaqah,
            DonationTypeCode::Fitra => DonationType::Fitra,
            DonationTypeCode::Sacrifice => DonationType::Sacrifice,
            DonationTypeCode::InKind => DonationType::InKind,
        }
    }
}

impl From<DonationType> for DonationTypeCode {
    fn from(kind: DonationType) -> Self {
        match kind {
            DonationType::General => DonationTypeCode::General,
            DonationType::Zakat => DonationTypeCode::Zakat,
            DonationType::Sadaqah => DonationTypeCode::Sadaqah,
            DonationType::Fitra => DonationTypeCode::Fitra,
            DonationType::Sacrifice => DonationTypeCode::Sacrifice,
            DonationType::InKind => DonationTypeCode::InKind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatusCode {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DonationStatus {
    Pending,
    Received,
    Cancelled,
    Refunded,
}

impl From<DonationStatusCode> for DonationStatus {
    fn from(code: DonationStatusCode) -> Self {
        match code {
            DonationStatusCode::Pending => DonationStatus::Pending,
            DonationStatusCode::Completed => DonationStatus::Received,
            DonationStatusCode::Cancelled => DonationStatus::Cancelled,
            DonationStatusCode::Refunded => DonationStatus::Refunded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRow {
    pub id: String,
    pub donor_name: Option<String>,
    pub donor_phone: Option<String>,
    pub donor_email: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub donation_type: Option<DonationTypeCode>,
    pub payment_method: Option<PaymentMethodCode>,
    pub status: Option<DonationStatusCode>,
    pub receipt_number: Option<String>,
    pub piggy_bank_id: Option<String>,
    pub notes: Option<String>,
    pub donated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    /// Empty when the donor stayed anonymous.
    pub donor_name: String,
    pub is_anonymous: bool,
    pub donor_phone: String,
    pub donor_email: String,
    pub amount: f64,
    pub currency: String,
    pub donation_type: DonationType,
    pub payment_method: PaymentMethod,
    pub status: DonationStatus,
    pub receipt_number: String,
    pub piggy_bank_id: Option<String>,
    pub notes: String,
    /// Falls back to `created_at` when the donation date was not recorded.
    pub donated_at: Option<DateTime<Utc>>,
}

impl From<DonationRow> for Donation {
    fn from(row: DonationRow) -> Self {
        let donor_name = text(row.donor_name).trim().to_string();
        Self {
            id: row.id,
            is_anonymous: donor_name.is_empty(),
            donor_name,
            donor_phone: text(row.donor_phone),
            donor_email: text(row.donor_email),
            amount: row.amount,
            currency: currency(row.currency),
            donation_type: row
                .donation_type
                .map(Into::into)
                .unwrap_or(DonationType::General),
            payment_method: row
                .payment_method
                .map(Into::into)
                .unwrap_or(PaymentMethod::Cash),
            status: row
                .status
                .map(Into::into)
                .unwrap_or(DonationStatus::Pending),
            receipt_number: text(row.receipt_number),
            piggy_bank_id: row.piggy_bank_id,
            notes: text(row.notes),
            donated_at: row.donated_at.or(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DonationForm {
    #[garde(length(max = 100))]
    pub donor_name: Option<String>,

    #[garde(custom(validation::optional_phone))]
    pub donor_phone: Option<String>,

    #[garde(email)]
    pub donor_email: Option<String>,

    #[garde(required, custom(validation::optional_positive_amount))]
    pub amount: Option<f64>,

    #[garde(length(min = 3, max = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,

    #[garde(required)]
    pub donation_type: Option<DonationType>,

    #[garde(required)]
    pub payment_method: Option<PaymentMethod>,

    #[garde(skip)]
    pub piggy_bank_id: Option<String>,

    #[garde(length(max = 2000))]
    pub notes: Option<String>,
}

/// Insert payload for the `donations` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDonationRow {
    pub donor_name: Option<String>,
    pub donor_phone: Option<String>,
    pub donor_email: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub donation_type: DonationTypeCode,
    pub payment_method: PaymentMethodCode,
    pub status: DonationStatusCode,
    pub piggy_bank_id: Option<String>,
    pub notes: Option<String>,
}

impl DonationForm {
    /// Validate the form and build the row to insert.
    pub fn into_insert(self) -> Result<NewDonationRow, FieldErrors> {
        validate_form(&self)?;
        Ok(NewDonationRow {
            donor_name: self
                .donor_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            donor_phone: self
                .donor_phone
                .as_deref()
                .and_then(validation::normalize_phone),
            donor_email: self.donor_email.filter(|e| !e.is_empty()),
            amount: required(self.amount, "amount")?,
            currency: currency(Some(self.currency)),
            donation_type: required(self.donation_type, "donationType")?.into(),
            payment_method: required(self.payment_method, "paymentMethod")?.into(),
            status: DonationStatusCode::Pending,
            piggy_bank_id: self.piggy_bank_id,
            notes: self.notes,
        })
    }
}

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::{currency, default_currency, text};
use crate::services::validation::{self, required, validate_form, FieldErrors};

/// Payment method tokens as the database stores them (underscored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodCode {
    Cash,
    BankTransfer,
    CreditCard,
    Online,
}

/// Payment method as the UI spells it (hyphenated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    Online,
}

impl From<PaymentMethodCode> for PaymentMethod {
    fn from(code: PaymentMethodCode) -> Self {
        match code {
            PaymentMethodCode::Cash => PaymentMethod::Cash,
            PaymentMethodCode::BankTransfer => PaymentMethod::BankTransfer,
            PaymentMethodCode::CreditCard => PaymentMethod::CreditCard,
            PaymentMethodCode::Online => PaymentMethod::Online,
        }
    }
}

impl From<PaymentMethod> for PaymentMethodCode {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => PaymentMethodCode::Cash,
            PaymentMethod::BankTransfer => PaymentMethodCode::BankTransfer,
            PaymentMethod::CreditCard => PaymentMethodCode::CreditCard,
            PaymentMethod::Online => PaymentMethodCode::Online,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatusCode {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl From<PaymentStatusCode> for PaymentStatus {
    fn from(code: PaymentStatusCode) -> Self {
        match code {
            PaymentStatusCode::Pending => PaymentStatus::Pending,
            PaymentStatusCode::Paid => PaymentStatus::Completed,
            PaymentStatusCode::Failed => PaymentStatus::Failed,
            PaymentStatusCode::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

/// Row of the `payments` table (aid paid out to a beneficiary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: String,
    pub beneficiary_id: String,
    pub application_id: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub payment_method: Option<PaymentMethodCode>,
    pub status: Option<PaymentStatusCode>,
    pub reference_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub beneficiary_id: String,
    pub application_id: Option<String>,
    pub amount: f64,
    /// Defaults to TRY.
    pub currency: String,
    /// Defaults to cash.
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_number: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            beneficiary_id: row.beneficiary_id,
            application_id: row.application_id,
            amount: row.amount,
            currency: currency(row.currency),
            payment_method: row
                .payment_method
                .map(Into::into)
                .unwrap_or(PaymentMethod::Cash),
            status: row.status.map(Into::into).unwrap_or(PaymentStatus::Pending),
            reference_number: text(row.reference_number),
            paid_at: row.paid_at,
            notes: text(row.notes),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    #[garde(required, length(min = 1), custom(validation::optional_not_blank))]
    pub beneficiary_id: Option<String>,

    #[garde(skip)]
    pub application_id: Option<String>,

    #[garde(required, custom(validation::optional_positive_amount))]
    pub amount: Option<f64>,

    #[garde(length(min = 3, max = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,

    #[garde(required)]
    pub payment_method: Option<PaymentMethod>,

    #[garde(length(max = 64))]
    pub reference_number: Option<String>,

    #[garde(length(max = 2000))]
    pub notes: Option<String>,
}

/// Insert payload for the `payments` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPaymentRow {
    pub beneficiary_id: String,
    pub application_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: PaymentMethodCode,
    pub status: PaymentStatusCode,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl PaymentForm {
    /// Validate the form and build the row to insert.
    pub fn into_insert(self) -> Result<NewPaymentRow, FieldErrors> {
        validate_form(&self)?;
        Ok(NewPaymentRow {
            beneficiary_id: required(self.beneficiary_id, "beneficiaryId")?.trim().to_string(),
            application_id: self.application_id,
            amount: required(self.amount, "amount")?,
            currency: currency(Some(self.currency)),
            payment_method: required(self.payment_method, "paymentMethod")?.into(),
            status: PaymentStatusCode::Pending,
            reference_number: self.reference_number,
            notes: self.notes,
        })
    }
}

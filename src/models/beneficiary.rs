use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::{full_name, text};
use crate::services::validation;

/// Beneficiary status tokens as stored in the `beneficiaries` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeneficiaryStatusCode {
    Active,
    Inactive,
    PendingReview,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BeneficiaryStatus {
    Active,
    Passive,
    UnderReview,
    Archived,
}

impl From<BeneficiaryStatusCode> for BeneficiaryStatus {
    fn from(code: BeneficiaryStatusCode) -> Self {
        match code {
            BeneficiaryStatusCode::Active => BeneficiaryStatus::Active,
            BeneficiaryStatusCode::Inactive => BeneficiaryStatus::Passive,
            BeneficiaryStatusCode::PendingReview => BeneficiaryStatus::UnderReview,
            BeneficiaryStatusCode::Archived => BeneficiaryStatus::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeneficiaryCategoryCode {
    Elderly,
    Disabled,
    Orphan,
    Widow,
    Refugee,
    LowIncome,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BeneficiaryCategory {
    Elderly,
    Disabled,
    Orphan,
    Widow,
    Refugee,
    LowIncome,
    Other,
}

impl From<BeneficiaryCategoryCode> for BeneficiaryCategory {
    fn from(code: BeneficiaryCategoryCode) -> Self {
        match code {
            BeneficiaryCategoryCode::Elderly => BeneficiaryCategory::Elderly,
            BeneficiaryCategoryCode::Disabled => BeneficiaryCategory::Disabled,
            BeneficiaryCategoryCode::Orphan => BeneficiaryCategory::Orphan,
            BeneficiaryCategoryCode::Widow => BeneficiaryCategory::Widow,
            BeneficiaryCategoryCode::Refugee => BeneficiaryCategory::Refugee,
            BeneficiaryCategoryCode::LowIncome => BeneficiaryCategory::LowIncome,
            BeneficiaryCategoryCode::Other => BeneficiaryCategory::Other,
        }
    }
}

/// Row of the `beneficiaries` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub household_size: Option<i32>,
    pub monthly_income: Option<f64>,
    pub status: Option<BeneficiaryStatusCode>,
    pub category: Option<BeneficiaryCategoryCode>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Beneficiary as listed and edited in the desk UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub district: String,
    /// Null or non-positive sizes count as a single-person household.
    pub household_size: u32,
    /// Null income is reported as 0.
    pub monthly_income: f64,
    /// Null status means the record still awaits review.
    pub status: BeneficiaryStatus,
    /// Null category maps to `other`.
    pub category: BeneficiaryCategory,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<BeneficiaryRow> for Beneficiary {
    fn from(row: BeneficiaryRow) -> Self {
        Self {
            full_name: full_name(&row.first_name, &row.last_name),
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            national_id: text(row.national_id),
            phone: text(row.phone),
            email: text(row.email),
            address: text(row.address),
            city: text(row.city),
            district: text(row.district),
            household_size: row
                .household_size
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(1),
            monthly_income: row.monthly_income.unwrap_or(0.0),
            status: row
                .status
                .map(Into::into)
                .unwrap_or(BeneficiaryStatus::UnderReview),
            category: row
                .category
                .map(Into::into)
                .unwrap_or(BeneficiaryCategory::Other),
            notes: text(row.notes),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// New/edit beneficiary form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryForm {
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

    #[garde(length(max = 100))]
    pub city: Option<String>,

    #[garde(length(max = 100))]
    pub district: Option<String>,

    #[garde(required, range(min = 1, max = 50))]
    pub household_size: Option<u32>,

    #[garde(range(min = 0.0))]
    pub monthly_income: Option<f64>,

    #[garde(required)]
    pub category: Option<BeneficiaryCategory>,

    #[garde(length(max = 2000))]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::validate_form;

    fn sparse_row() -> BeneficiaryRow {
        serde_json::from_value(serde_json::json!({
            "id": "b-1",
            "first_name": "Fatma",
            "last_name": "Demir",
        }))
        .unwrap()
    }

    #[test]
    fn test_null_fields_map_to_documented_defaults() {
        let view = Beneficiary::from(sparse_row());
        assert_eq!(view.full_name, "Fatma Demir");
        assert_eq!(view.national_id, "");
        assert_eq!(view.email, "");
        assert_eq!(view.household_size, 1);
        assert_eq!(view.monthly_income, 0.0);
        assert_eq!(view.status, BeneficiaryStatus::UnderReview);
        assert_eq!(view.category, BeneficiaryCategory::Other);
        assert!(view.created_at.is_none());
    }

    #[test]
    fn test_status_and_category_are_translated() {
        let row: BeneficiaryRow = serde_json::from_value(serde_json::json!({
            "id": "b-2",
            "first_name": "Ali",
            "last_name": "Kaya",
            "status": "inactive",
            "category": "low_income",
            "household_size": -3,
        }))
        .unwrap();
        let view = Beneficiary::from(row);
        assert_eq!(view.status, BeneficiaryStatus::Passive);
        assert_eq!(view.category, BeneficiaryCategory::LowIncome);
        assert_eq!(view.household_size, 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["category"], "lowIncome");
        assert_eq!(json["fullName"], "Ali Kaya");
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let row = sparse_row();
        assert_eq!(Beneficiary::from(row.clone()), Beneficiary::from(row));
    }

    #[test]
    fn test_form_reports_every_bad_field() {
        let form: BeneficiaryForm = serde_json::from_value(serde_json::json!({
            "firstName": "A",
            "lastName": "Kaya",
            "nationalId": "1234",
            "phone": "12345",
            "email": "not-an-email",
            "householdSize": 0,
            "category": "widow",
        }))
        .unwrap();
        let errors = validate_form(&form).unwrap_err();
        for field in ["firstName", "nationalId", "phone", "email", "householdSize"] {
            assert!(errors.contains_key(field), "missing error for {field}: {errors:?}");
        }
        assert!(!errors.contains_key("lastName"));
    }

    #[test]
    fn test_valid_form_passes() {
        let form: BeneficiaryForm = serde_json::from_value(serde_json::json!({
            "firstName": "Ali",
            "lastName": "Kaya",
            "nationalId": "12345678901",
            "phone": "0532 123 45 67",
            "householdSize": 4,
            "monthlyIncome": 8500.0,
            "category": "elderly",
        }))
        .unwrap();
        assert!(validate_form(&form).is_ok());
    }
}

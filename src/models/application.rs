use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::text;
use crate::services::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AidTypeCode {
    Food,
    Cash,
    Education,
    Health,
    Housing,
    Clothing,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AidType {
    Food,
    Cash,
    Education,
    Health,
    Housing,
    Clothing,
    Other,
}

impl From<AidTypeCode> for AidType {
    fn from(code: AidTypeCode) -> Self {
        match code {
            AidTypeCode::Food => AidType::Food,
            AidTypeCode::Cash => AidType::Cash,
            AidTypeCode::Education => AidType::Education,
            AidTypeCode::Health => AidType::Health,
            AidTypeCode::Housing => AidType::Housing,
            AidTypeCode::Clothing => AidType::Clothing,
            AidTypeCode::Other => AidType::Other,
        }
    }
}

impl From<AidType> for AidTypeCode {
    fn from(kind: AidType) -> Self {
        match kind {
            AidType::Food => AidTypeCode::Food,
            AidType::Cash => AidTypeCode::Cash,
            AidType::Education => AidTypeCode::Education,
            AidType::Health => AidTypeCode::Health,
            AidType::Housing => AidTypeCode::Housing,
            AidType::Clothing => AidTypeCode::Clothing,
            AidType::Other => AidTypeCode::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatusCode {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationStatus {
    Submitted,
    InReview,
    Approved,
    Rejected,
    Completed,
}

impl From<ApplicationStatusCode> for ApplicationStatus {
    fn from(code: ApplicationStatusCode) -> Self {
        match code {
            ApplicationStatusCode::Pending => ApplicationStatus::Submitted,
            ApplicationStatusCode::UnderReview => ApplicationStatus::InReview,
            ApplicationStatusCode::Approved => ApplicationStatus::Approved,
            ApplicationStatusCode::Rejected => ApplicationStatus::Rejected,
            ApplicationStatusCode::Completed => ApplicationStatus::Completed,
        }
    }
}

/// Same tokens on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Row of the `aid_applications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: String,
    pub beneficiary_id: String,
    pub application_type: Option<AidTypeCode>,
    pub status: Option<ApplicationStatusCode>,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    pub requested_amount: Option<f64>,
    pub approved_amount: Option<f64>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub beneficiary_id: String,
    pub application_type: AidType,
    pub status: ApplicationStatus,
    pub priority: Priority,
    pub description: String,
    pub requested_amount: f64,
    /// Stays empty until a reviewer approves an amount.
    pub approved_amount: Option<f64>,
    pub reviewed_by: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            beneficiary_id: row.beneficiary_id,
            application_type: row
                .application_type
                .map(Into::into)
                .unwrap_or(AidType::Other),
            status: row
                .status
                .map(Into::into)
                .unwrap_or(ApplicationStatus::Submitted),
            priority: row.priority.unwrap_or_default(),
            description: text(row.description),
            requested_amount: row.requested_amount.unwrap_or(0.0),
            approved_amount: row.approved_amount,
            reviewed_by: text(row.reviewed_by),
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    #[garde(required, length(min = 1), custom(validation::optional_not_blank))]
    pub beneficiary_id: Option<String>,

    #[garde(required)]
    pub application_type: Option<AidType>,

    #[garde(skip)]
    #[serde(default)]
    pub priority: Priority,

    #[garde(required, length(min = 10, max = 2000))]
    pub description: Option<String>,

    #[garde(custom(validation::optional_positive_amount))]
    pub requested_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::validate_form;

    #[test]
    fn test_null_fields_and_status_translation() {
        let row: ApplicationRow = serde_json::from_value(serde_json::json!({
            "id": "a-1",
            "beneficiary_id": "b-1",
            "status": "under_review",
            "priority": null,
        }))
        .unwrap();
        let app = Application::from(row);
        assert_eq!(app.status, ApplicationStatus::InReview);
        assert_eq!(app.priority, Priority::Normal);
        assert_eq!(app.application_type, AidType::Other);
        assert_eq!(app.requested_amount, 0.0);
        assert_eq!(app.approved_amount, None);

        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["status"], "inReview");
        assert!(json["approvedAmount"].is_null());
    }

    #[test]
    fn test_form_description_length() {
        let short: ApplicationForm = serde_json::from_value(serde_json::json!({
            "beneficiaryId": "b-1",
            "applicationType": "food",
            "description": "too short",
        }))
        .unwrap();
        let errors = validate_form(&short).unwrap_err();
        assert!(errors.contains_key("description"));

        let ok: ApplicationForm = serde_json::from_value(serde_json::json!({
            "beneficiaryId": "b-1",
            "applicationType": "education",
            "priority": "urgent",
            "description": "School supplies for three children",
            "requestedAmount": 1200,
        }))
        .unwrap();
        assert!(validate_form(&ok).is_ok());
        assert_eq!(AidTypeCode::from(ok.application_type.unwrap()), AidTypeCode::Education);
    }
}

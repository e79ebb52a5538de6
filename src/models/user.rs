use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::text;
use crate::services::validation;

/// Roles for desk accounts. Stored and displayed with the same tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Operator,
    #[default]
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Falls back to the email address when no name was entered.
    pub display_name: String,
    /// Least privilege when unset.
    pub role: UserRole,
    pub phone: String,
    pub is_active: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let name = text(row.full_name).trim().to_string();
        Self {
            display_name: if name.is_empty() { row.email.clone() } else { name },
            id: row.id,
            email: row.email,
            role: row.role.unwrap_or_default(),
            phone: text(row.phone),
            is_active: row.is_active.unwrap_or(true),
            last_sign_in_at: row.last_sign_in_at,
            created_at: row.created_at,
        }
    }
}

/// Account creation form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[garde(required, email)]
    pub email: Option<String>,

    #[garde(required, length(min = 2, max = 100))]
    pub full_name: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub role: UserRole,

    #[garde(custom(validation::optional_phone))]
    pub phone: Option<String>,

    #[garde(required, length(min = 8, max = 128))]
    pub password: Option<String>,

    #[garde(required, matches(password))]
    pub password_confirmation: Option<String>,
}

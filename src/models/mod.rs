//! Row shapes, view-models and form schemas.
//!
//! Every entity module follows the same layout:
//! - `XxxRow`: a row as the hosted database returns it (snake_case, nullable
//!   columns as `Option`).
//! - `Xxx`: the camelCase view-model the UI consumes, built with
//!   `From<XxxRow>`. The mapping is pure and total: null text becomes `""`,
//!   other nulls get the default documented on the field.
//! - `XxxForm`: the garde schema for user input.
//!
//! Backend enum tokens (`*Code`) are translated to domain enums through
//! exhaustive `From` impls rather than string rewriting.

pub mod application;
pub mod beneficiary;
pub mod donation;
pub mod hospital_referral;
pub mod in_kind_aid;
pub mod member;
pub mod payment;
pub mod piggy_bank;
pub mod scan;
pub mod user;

/// Null text columns map to an empty string.
pub(crate) fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// "First Last", tolerating blank parts.
pub(crate) fn full_name(first: &str, last: &str) -> String {
    match (first.trim(), last.trim()) {
        ("", "") => String::new(),
        (f, "") => f.to_string(),
        ("", l) => l.to_string(),
        (f, l) => format!("{f} {l}"),
    }
}

/// Default currency for amounts stored without one.
pub const DEFAULT_CURRENCY: &str = "TRY";

pub(crate) fn currency(value: Option<String>) -> String {
    match value {
        Some(c) if !c.trim().is_empty() => c.trim().to_uppercase(),
        _ => DEFAULT_CURRENCY.to_string(),
    }
}

pub(crate) fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

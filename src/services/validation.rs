//! Form validation helpers shared by every entity schema.
//!
//! Schemas are declared with garde derives on the `*Form` types in `models`.
//! This module holds the custom rules garde does not ship (national id,
//! national phone format, positive amounts) and turns a garde report into
//! the field-keyed error map the UI renders next to each input.

use std::collections::BTreeMap;

use garde::Validate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Field name (camelCase, as the UI knows it) to human-readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Number of digits in a national identity number.
pub const NATIONAL_ID_LEN: usize = 11;

/// Validate a form and collect every failure per field.
///
/// Expected user-input problems come back as data, never as a panic.
pub fn validate_form<T>(form: &T) -> Result<(), FieldErrors>
where
    T: Validate,
    T::Context: Default,
{
    form.validate().map_err(|report| field_errors(&report))
}

/// Build a form from a JSON object and validate it.
///
/// A value of the wrong type is reported under its own key by
/// deserializing each field on its own; the remaining fields are still
/// validated so absent required inputs are reported in the same pass.
/// Every form field must therefore be an `Option` or carry a serde default.
pub fn parse_form<T>(fields: Map<String, Value>) -> Result<T, FieldErrors>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
{
    let mut errors = FieldErrors::new();
    let form: T = match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(form) => form,
        Err(whole) => {
            let mut usable = Map::new();
            for (key, value) in fields {
                let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
                match serde_json::from_value::<T>(single) {
                    Ok(_) => {
                        usable.insert(key, value);
                    }
                    Err(e) => errors
                        .entry(key)
                        .or_default()
                        .push(format!("has the wrong type ({e})")),
                }
            }
            match serde_json::from_value(Value::Object(usable)) {
                Ok(form) => form,
                Err(_) if !errors.is_empty() => return Err(errors),
                Err(_) => {
                    return Err(FieldErrors::from([(
                        "form".to_string(),
                        vec![whole.to_string()],
                    )]))
                }
            }
        }
    };

    if let Err(invalid) = validate_form(&form) {
        for (key, messages) in invalid {
            errors.entry(key).or_insert(messages);
        }
    }
    if errors.is_empty() {
        Ok(form)
    } else {
        Err(errors)
    }
}

/// Take a field the schema marks `required` out of a validated form.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, FieldErrors> {
    value.ok_or_else(|| FieldErrors::from([(field.to_string(), vec!["not set".to_string()])]))
}

/// Flatten a garde report into [`FieldErrors`].
pub fn field_errors(report: &garde::Report) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (path, error) in report.iter() {
        errors
            .entry(field_key(&path.to_string()))
            .or_default()
            .push(error.to_string());
    }
    errors
}

/// `password_confirmation` -> `passwordConfirmation`; nested paths keep dots.
fn field_key(path: &str) -> String {
    if path.is_empty() {
        return "form".to_string();
    }
    let mut key = String::with_capacity(path.len());
    let mut upper_next = false;
    for c in path.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.push(c);
        }
    }
    key
}

// ── Custom rules ────────────────────────────────────────────────────

/// National identity numbers are exactly 11 ASCII digits.
pub fn national_id(value: &str, _ctx: &()) -> garde::Result {
    if value.len() == NATIONAL_ID_LEN && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(garde::Error::new("must be exactly 11 digits"))
    }
}

pub fn optional_national_id(value: &Option<String>, ctx: &()) -> garde::Result {
    match value.as_deref() {
        None | Some("") => Ok(()),
        Some(v) => national_id(v, ctx),
    }
}

/// National phone format: ten digits starting with 2-5, optionally prefixed
/// by `0`, `90` or `+90`. Spaces, dashes and parentheses are ignored.
pub fn phone(value: &str, _ctx: &()) -> garde::Result {
    if normalize_phone(value).is_some() {
        Ok(())
    } else {
        Err(garde::Error::new("must be a valid phone number, e.g. 0532 123 45 67"))
    }
}

pub fn optional_phone(value: &Option<String>, ctx: &()) -> garde::Result {
    match value.as_deref() {
        None | Some("") => Ok(()),
        Some(v) => phone(v, ctx),
    }
}

/// Canonical ten-digit form of a phone number, or `None` if it is not one.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if let Some(rest) = digits.strip_prefix('+') {
        if !rest.starts_with("90") {
            return None;
        }
        digits = rest.to_string();
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("90") => &digits[2..],
        _ => return None,
    };

    match national.as_bytes().first() {
        Some(b'2'..=b'5') => Some(national.to_string()),
        _ => None,
    }
}

/// Monetary amounts must be finite and strictly positive.
pub fn positive_amount(value: &f64, _ctx: &()) -> garde::Result {
    if value.is_finite() && *value > 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new("must be greater than zero"))
    }
}

pub fn optional_positive_amount(value: &Option<f64>, ctx: &()) -> garde::Result {
    match value {
        None => Ok(()),
        Some(v) => positive_amount(v, ctx),
    }
}

/// Reject strings that are only whitespace.
pub fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

pub fn optional_not_blank(value: &Option<String>, ctx: &()) -> garde::Result {
    match value.as_deref() {
        None => Ok(()),
        Some(v) => not_blank(v, ctx),
    }
}

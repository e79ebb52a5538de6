use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use strum::{AsRefStr, EnumString};

use super::ApiError;
use crate::models::{
    application::ApplicationForm, beneficiary::BeneficiaryForm, donation::DonationForm,
    hospital_referral::HospitalReferralForm, in_kind_aid::InKindAidForm, member::MemberForm,
    payment::PaymentForm, piggy_bank::PiggyBankForm, user::UserForm,
};
use crate::services::validation::parse_form;

/// Entities whose forms can be checked server-side, by URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum FormKind {
    Beneficiary,
    Member,
    Donation,
    PiggyBank,
    Application,
    Payment,
    InKindAid,
    HospitalReferral,
    User,
}

/// POST /api/v1/forms/{entity}/validate
pub async fn validate_entity_form(
    Path(entity): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let kind = FormKind::from_str(&entity)
        .map_err(|_| ApiError::new(StatusCode::NOT_FOUND, format!("unknown form {entity}")))?;

    match kind {
        FormKind::Beneficiary => check::<BeneficiaryForm>(&body),
        FormKind::Member => check::<MemberForm>(&body),
        FormKind::Donation => check::<DonationForm>(&body),
        FormKind::PiggyBank => check::<PiggyBankForm>(&body),
        FormKind::Application => check::<ApplicationForm>(&body),
        FormKind::Payment => check::<PaymentForm>(&body),
        FormKind::InKindAid => check::<InKindAidForm>(&body),
        FormKind::HospitalReferral => check::<HospitalReferralForm>(&body),
        FormKind::User => check::<UserForm>(&body),
    }
}

/// Only a body that is not a JSON object is a 400; anything wrong inside
/// the object is reported per field.
fn check<T>(body: &[u8]) -> Result<Json<Value>, ApiError>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
{
    let fields: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("malformed form: {e}"))
    })?;

    parse_form::<T>(fields)?;
    Ok(Json(json!({ "valid": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::FieldErrors;

    #[test]
    fn test_form_kind_parses_kebab_case_segments() {
        assert_eq!(FormKind::from_str("piggy-bank").unwrap(), FormKind::PiggyBank);
        assert_eq!(FormKind::from_str("in-kind-aid").unwrap(), FormKind::InKindAid);
        assert_eq!(
            FormKind::from_str("hospital-referral").unwrap(),
            FormKind::HospitalReferral
        );
        assert!(FormKind::from_str("vehicle").is_err());
        assert_eq!(FormKind::User.as_ref(), "user");
    }

    fn errors_of(result: Result<Json<Value>, ApiError>) -> (StatusCode, FieldErrors) {
        let error = result.unwrap_err();
        (error.status, error.fields.unwrap_or_default())
    }

    #[test]
    fn test_check_maps_outcomes_to_status() {
        let error = check::<UserForm>(b"{nope").unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let error = check::<UserForm>(b"[1, 2]").unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let (status, errors) = errors_of(check::<UserForm>(
            br#"{"email":"a@b.org","fullName":"Al","password":"12345678","passwordConfirmation":"12345679"}"#,
        ));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(errors.contains_key("passwordConfirmation"));

        let Json(body) = check::<UserForm>(
            br#"{"email":"a@b.org","fullName":"Al","password":"12345678","passwordConfirmation":"12345678"}"#,
        )
        .unwrap();
        assert_eq!(body["valid"], true);
    }

    #[test]
    fn test_missing_member_national_id_is_keyed() {
        let (status, errors) = errors_of(check::<MemberForm>(
            br#"{"firstName":"Zeynep","lastName":"Arslan","phone":"0532 123 45 67","membershipType":"standard"}"#,
        ));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["nationalId"]);
    }

    #[test]
    fn test_wrongly_typed_member_dues_is_keyed() {
        let (status, errors) = errors_of(check::<MemberForm>(
            br#"{"firstName":"Zeynep","lastName":"Arslan","nationalId":"12345678901","phone":"0532 123 45 67","membershipType":"standard","monthlyDues":"abc"}"#,
        ));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["monthlyDues"]);
        assert!(errors["monthlyDues"][0].starts_with("has the wrong type"));
    }

    #[test]
    fn test_unknown_enum_token_is_keyed() {
        let (_, errors) = errors_of(check::<PaymentForm>(
            br#"{"beneficiaryId":"b-1","amount":10,"paymentMethod":"cheque"}"#,
        ));
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["paymentMethod"]);
    }
}

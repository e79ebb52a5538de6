//! Sample data shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

pub const WEBHOOK_SECRET: &str = "integration-secret";

/// Start of every test timeline.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

/// Piggy-bank labels as printed on the boxes.
pub const BOX_CODES: &[&str] = &["KMB-0001", "KMB-0002", "KMB-0003", "KMB-0004"];

/// One valid body per form endpoint segment.
pub fn valid_forms() -> Vec<(&'static str, Value)> {
    vec![
        (
            "beneficiary",
            json!({
                "firstName": "Ali",
                "lastName": "Kaya",
                "nationalId": "12345678901",
                "phone": "0532 123 45 67",
                "householdSize": 3,
                "category": "lowIncome"
            }),
        ),
        (
            "member",
            json!({
                "firstName": "Elif",
                "lastName": "Şahin",
                "nationalId": "10987654321",
                "phone": "+90 532 111 22 33",
                "membershipType": "standard",
                "monthlyDues": 100
            }),
        ),
        (
            "donation",
            json!({
                "amount": 250,
                "donationType": "sadaqah",
                "paymentMethod": "cash"
            }),
        ),
        (
            "piggy-bank",
            json!({ "code": "KMB-0042", "locationName": "Merkez Fırın" }),
        ),
        (
            "application",
            json!({
                "beneficiaryId": "b-1",
                "applicationType": "food",
                "description": "Monthly food package for a family of five"
            }),
        ),
        (
            "payment",
            json!({ "beneficiaryId": "b-1", "amount": 500, "paymentMethod": "bank-transfer" }),
        ),
        (
            "in-kind-aid",
            json!({
                "beneficiaryId": "b-1",
                "itemName": "Battaniye",
                "category": "clothing",
                "quantity": 2,
                "unit": "piece"
            }),
        ),
        (
            "hospital-referral",
            json!({
                "beneficiaryId": "b-1",
                "hospitalName": "Şehir Hastanesi",
                "referralDate": "2024-05-02"
            }),
        ),
        (
            "user",
            json!({
                "email": "operator@example.org",
                "fullName": "Deniz Operatör",
                "password": "long enough",
                "passwordConfirmation": "long enough"
            }),
        ),
    ]
}

pub fn pull_request_event(action: &str, number: u64, merged: bool) -> Value {
    json!({
        "action": action,
        "number": number,
        "pull_request": { "merged": merged, "title": "Add piggy-bank report" }
    })
}

//! Request and response bodies.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::types::BigDecimal;
use validator::Validate;

use crate::error::{Error, Result};

/// Amounts must stay strictly below this to fit NUMERIC(10, 2)
const AMOUNT_LIMIT: i64 = 100_000_000;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters"))]
    pub password: String,
}

/// OAuth2 password-grant style login form
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientCreate {
    pub name: String,
    #[validate(email(message = "value is not a valid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceCreate {
    pub client_id: i32,
    pub title: String,
    pub amount: f64,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Convert a JSON amount to a two-place decimal
pub fn parse_amount(amount: f64) -> Result<BigDecimal> {
    if !amount.is_finite() {
        return Err(Error::validation("Amount out of range"));
    }

    // Display gives the shortest representation that round-trips, so 19.99 stays 19.99
    let decimal = BigDecimal::from_str(&amount.to_string())
        .map_err(|_| Error::validation("Amount is not a valid number"))?
        .round(2);

    // Range applies to the rounded value
    if decimal.abs() >= BigDecimal::from(AMOUNT_LIMIT) {
        return Err(Error::validation("Amount out of range"));
    }

    Ok(decimal)
}

/// Accepts RFC 3339, a naive date-time (read as UTC) or a bare date (midnight UTC)
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_due_date(value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid due_date: {value}"))),
    }
}

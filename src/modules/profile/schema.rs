//! Boundary parsing for profile updates.
//!
//! Clients send either JSON or url-encoded forms, and older clients send the
//! additional phone list as a list, a comma separated string, or a JSON string
//! holding a list. Everything is parsed once here into a [`ProfileUpdate`].

use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use validator::ValidateEmail;

use super::model::{BloodGroup, ProfileUpdate};
use crate::error::ApiError;
use crate::services::phone::{collect_phones, normalize_phone};

/// Largest value a `DECIMAL(5,2)` column holds.
const MAX_MEASURE: Decimal = Decimal::from_parts(99999, 0, 0, false, 2);

/// Raw update body, from JSON or `application/x-www-form-urlencoded`.
#[derive(Debug, Default)]
pub struct ProfilePayload(pub Map<String, Value>);

impl<S: Send + Sync> FromRequest<S> for ProfilePayload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if !is_form {
            let Json(map) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            return Ok(Self(map));
        }

        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        // Repeated keys become a list.
        let mut map = Map::new();
        for (key, value) in pairs {
            match map.remove(&key) {
                None => {
                    map.insert(key, Value::String(value));
                }
                Some(Value::Array(mut items)) => {
                    items.push(Value::String(value));
                    map.insert(key, Value::Array(items));
                }
                Some(first) => {
                    map.insert(key, Value::Array(vec![first, Value::String(value)]));
                }
            }
        }
        Ok(Self(map))
    }
}

fn text(field: &str, value: &Value) -> Result<Option<String>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
        _ => Err(ApiError::validation(format!("{} must be a string", field))),
    }
}

fn phone_list(value: &Value, country_code: &str) -> Result<Vec<String>, ApiError> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(ApiError::validation(
                    "relatives_mobile_numbers entries must be strings",
                )),
            })
            .collect::<Result<_, _>>()?,
        Value::String(s) if s.trim_start().starts_with('[') => {
            let parsed: Value = serde_json::from_str(s).map_err(|_| {
                ApiError::validation("relatives_mobile_numbers is not a valid JSON list")
            })?;
            return phone_list(&parsed, country_code);
        }
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => {
            return Err(ApiError::validation(
                "relatives_mobile_numbers must be a list or a comma separated string",
            ))
        }
    };

    let phones = collect_phones(raw.iter().map(String::as_str), country_code);
    if !phones.invalid.is_empty() {
        return Err(ApiError::validation(format!(
            "Invalid phone number(s): {}",
            phones.invalid.join(", ")
        )));
    }
    Ok(phones.valid)
}

fn measure(field: &str, value: &Value) -> Result<Option<Decimal>, ApiError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(ApiError::validation(format!("{} must be a number", field))),
    };

    let parsed = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| ApiError::validation(format!("{} must be a number", field)))?
        .round_dp(2);

    if parsed <= Decimal::ZERO || parsed > MAX_MEASURE {
        return Err(ApiError::validation(format!("{} is out of range", field)));
    }
    Ok(Some(parsed))
}

impl ProfilePayload {
    /// Validates and normalizes every recognised field. Unknown keys are ignored.
    pub fn into_update(self, country_code: &str) -> Result<ProfileUpdate, ApiError> {
        let mut update = ProfileUpdate::default();
        let fields = self.0;

        if let Some(value) = fields.get("first_name") {
            update.first_name = Some(text("first_name", value)?.unwrap_or_default());
        }
        if let Some(value) = fields.get("last_name") {
            update.last_name = Some(text("last_name", value)?.unwrap_or_default());
        }
        if let Some(value) = fields.get("image") {
            update.image = Some(text("image", value)?);
        }
        if let Some(value) = fields.get("relative_mobile_no") {
            update.relative_mobile_no = Some(match text("relative_mobile_no", value)? {
                None => String::new(),
                Some(raw) => normalize_phone(&raw, country_code).ok_or_else(|| {
                    ApiError::validation(format!("Invalid phone number: {}", raw))
                })?,
            });
        }
        if let Some(value) = fields.get("relatives_mobile_numbers") {
            update.relatives_mobile_numbers = Some(phone_list(value, country_code)?);
        }
        if let Some(value) = fields.get("emergency_email") {
            let email = text("emergency_email", value)?.map(|e| e.to_lowercase());
            if let Some(email) = &email {
                if !email.validate_email() {
                    return Err(ApiError::validation("emergency_email is not a valid email"));
                }
            }
            update.emergency_email = Some(email);
        }
        if let Some(value) = fields.get("blood_group") {
            update.blood_group = Some(match text("blood_group", value)? {
                None => None,
                Some(raw) => Some(raw.parse::<BloodGroup>().map_err(ApiError::Validation)?),
            });
        }
        if let Some(value) = fields.get("height_cm") {
            update.height_cm = Some(measure("height_cm", value)?);
        }
        if let Some(value) = fields.get("weight_kg") {
            update.weight_kg = Some(measure("weight_kg", value)?);
        }

        Ok(update)
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        Self::APositive,
        Self::ANegative,
        Self::BPositive,
        Self::BNegative,
        Self::AbPositive,
        Self::AbNegative,
        Self::OPositive,
        Self::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == wanted)
            .ok_or_else(|| format!("Invalid blood group '{}'", s.trim()))
    }
}

/// Emergency and medical details, one per user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub image: Option<String>,
    /// E.164 or empty.
    pub relative_mobile_no: String,
    pub relatives_mobile_numbers: Vec<String>,
    pub emergency_email: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn empty(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            image: None,
            relative_mobile_no: String::new(),
            relatives_mobile_numbers: Vec::new(),
            emergency_email: None,
            blood_group: None,
            height_cm: None,
            weight_kg: None,
            updated_at: now,
        }
    }

    /// Applies a validated partial update in place.
    pub fn apply(&mut self, update: &ProfileUpdate, now: DateTime<Utc>) {
        if let Some(image) = &update.image {
            self.image = image.clone();
        }
        if let Some(phone) = &update.relative_mobile_no {
            self.relative_mobile_no = phone.clone();
        }
        if let Some(phones) = &update.relatives_mobile_numbers {
            self.relatives_mobile_numbers = phones.clone();
        }
        if let Some(email) = &update.emergency_email {
            self.emergency_email = email.clone();
        }
        if let Some(group) = update.blood_group {
            self.blood_group = group;
        }
        if let Some(height) = update.height_cm {
            self.height_cm = height;
        }
        if let Some(weight) = update.weight_kg {
            self.weight_kg = weight;
        }
        self.updated_at = now;
    }
}

/// Partial profile update, already parsed and normalized.
///
/// Outer `None` leaves a field untouched; inner `None` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image: Option<Option<String>>,
    pub relative_mobile_no: Option<String>,
    pub relatives_mobile_numbers: Option<Vec<String>>,
    pub emergency_email: Option<Option<String>>,
    pub blood_group: Option<Option<BloodGroup>>,
    pub height_cm: Option<Option<Decimal>>,
    pub weight_kg: Option<Option<Decimal>>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat status set; any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    InProgress,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            other => Err(other.to_string()),
        }
    }
}

/// A triggered alert. Everything except `status`/`updated_at` is a snapshot taken
/// at trigger time and never follows later profile edits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyAlert {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: String,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub address: String,
    pub message: String,
    pub status: AlertStatus,
    pub emergency_contact_phone: String,
    pub emergency_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub user_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: String,
    pub height_cm: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub address: String,
    pub message: String,
    pub emergency_contact_phone: String,
    pub emergency_email: String,
    pub created_at: DateTime<Utc>,
}

impl NewAlert {
    pub fn into_alert(self, id: i64) -> EmergencyAlert {
        EmergencyAlert {
            id,
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            blood_group: self.blood_group,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address,
            message: self.message,
            status: AlertStatus::Pending,
            emergency_contact_phone: self.emergency_contact_phone,
            emergency_email: self.emergency_email,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, Pool};

use crate::error::StoreError;
use crate::modules::auth::interface::Result;
use crate::modules::emergency::interface::AlertRepository;
use crate::modules::emergency::model::{AlertStatus, EmergencyAlert, NewAlert};

const ALERT_COLUMNS: &str = "id, user_id, name, email, phone, blood_group, height_cm, weight_kg, \
                             latitude, longitude, address, message, status, emergency_contact_phone, \
                             emergency_email, created_at, updated_at";

#[derive(Debug, FromRow)]
struct AlertRow {
    id: i64,
    user_id: Option<i64>,
    name: String,
    email: String,
    phone: String,
    blood_group: String,
    height_cm: Option<Decimal>,
    weight_kg: Option<Decimal>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    address: String,
    message: String,
    status: String,
    emergency_contact_phone: String,
    emergency_email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for EmergencyAlert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> std::result::Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AlertStatus>()
            .map_err(|s| StoreError::Corrupt(format!("alert {} has status '{}'", row.id, s)))?;

        Ok(EmergencyAlert {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            blood_group: row.blood_group,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            message: row.message,
            status,
            emergency_contact_phone: row.emergency_contact_phone,
            emergency_email: row.emergency_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct AlertCrud {
    pool: Pool<MySql>,
}

impl AlertCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for AlertCrud {
    async fn create(&self, alert: &NewAlert) -> Result<EmergencyAlert> {
        let result = sqlx::query(
            r#"
            INSERT INTO emergency_alerts (
                user_id, name, email, phone, blood_group, height_cm, weight_kg,
                latitude, longitude, address, message, status,
                emergency_contact_phone, emergency_email, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.user_id)
        .bind(&alert.name)
        .bind(&alert.email)
        .bind(&alert.phone)
        .bind(&alert.blood_group)
        .bind(alert.height_cm)
        .bind(alert.weight_kg)
        .bind(alert.latitude)
        .bind(alert.longitude)
        .bind(&alert.address)
        .bind(&alert.message)
        .bind(AlertStatus::Pending.as_str())
        .bind(&alert.emergency_contact_phone)
        .bind(&alert.emergency_email)
        .bind(alert.created_at)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await?;

        Ok(alert.clone().into_alert(result.last_insert_id() as i64))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<EmergencyAlert>> {
        let sql = format!("SELECT {} FROM emergency_alerts WHERE id = ?", ALERT_COLUMNS);
        sqlx::query_as::<_, AlertRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(EmergencyAlert::try_from)
            .transpose()
    }

    async fn list(&self, status: Option<AlertStatus>) -> Result<Vec<EmergencyAlert>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM emergency_alerts WHERE status = ? ORDER BY created_at DESC, id DESC",
                    ALERT_COLUMNS
                );
                sqlx::query_as::<_, AlertRow>(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM emergency_alerts ORDER BY created_at DESC, id DESC",
                    ALERT_COLUMNS
                );
                sqlx::query_as::<_, AlertRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(EmergencyAlert::try_from).collect()
    }

    async fn set_status(
        &self,
        id: i64,
        status: AlertStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<EmergencyAlert>> {
        sqlx::query("UPDATE emergency_alerts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        // rows_affected is unreliable for a missing id vs. unchanged values; read back instead.
        self.find_by_id(id).await
    }
}

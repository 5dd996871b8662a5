use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{AlertStatus, EmergencyAlert, NewAlert};
use crate::modules::auth::interface::Result;

#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persists a new alert with status `PENDING`.
    async fn create(&self, alert: &NewAlert) -> Result<EmergencyAlert>;
    async fn find_by_id(&self, id: i64) -> Result<Option<EmergencyAlert>>;
    /// Newest first.
    async fn list(&self, status: Option<AlertStatus>) -> Result<Vec<EmergencyAlert>>;
    async fn set_status(
        &self,
        id: i64,
        status: AlertStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<EmergencyAlert>>;
}

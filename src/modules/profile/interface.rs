use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ProfileUpdate, UserProfile};
use crate::modules::auth::interface::Result;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Applies the update (including name fields on the user row) in one transaction.
    /// `Ok(None)` when the user has no profile.
    async fn update(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<UserProfile>>;
}

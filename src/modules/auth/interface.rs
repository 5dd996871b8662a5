use async_trait::async_trait;

use super::model::{NewOtpRecord, NewUser, OtpRecord, RegistrationConflicts, User};
use crate::error::StoreError;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, StoreError>;

/// Credential store. Emails are stored and looked up lowercased.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and its default-empty profile in one transaction.
    async fn create_with_profile(&self, user: &NewUser) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn registration_conflicts(
        &self,
        username: &str,
        email: &str,
        contact_no: &str,
    ) -> Result<RegistrationConflicts>;
}

/// Append-only OTP issuance log, newest first by `created_at` then `id`.
#[async_trait]
pub trait OtpLedger: Send + Sync {
    async fn latest(&self, email: &str) -> Result<Option<OtpRecord>>;

    /// Expires every live record for the email and appends `record`, as one unit,
    /// provided the latest record id is still `expected_latest`. `Ok(None)` means a
    /// concurrent issuance got there first and nothing was written.
    async fn supersede(
        &self,
        expected_latest: Option<i64>,
        record: &NewOtpRecord,
    ) -> Result<Option<OtpRecord>>;

    async fn latest_matching(&self, email: &str, code: &str) -> Result<Option<OtpRecord>>;

    /// Flips `is_expired` to true. Returns true only for the call that performed the flip.
    async fn expire(&self, id: i64) -> Result<bool>;

    async fn history(&self, email: &str) -> Result<Vec<OtpRecord>>;
}

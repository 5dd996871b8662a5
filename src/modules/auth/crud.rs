use async_trait::async_trait;
use sqlx::{types::Json, MySql, Pool};

use crate::error::StoreError;
use crate::modules::auth::interface::{OtpLedger, Result, UserRepository};
use crate::modules::auth::model::{NewOtpRecord, NewUser, OtpRecord, RegistrationConflicts, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, contact_no, \
                            is_staff, is_admin, created_at, updated_at";

const OTP_COLUMNS: &str = "id, email, code, attempt_counter, is_expired, created_at";

// =============================================================================
// USERS
// =============================================================================

pub struct UserCrud {
    pool: Pool<MySql>,
}

impl UserCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl UserRepository for UserCrud {
    async fn create_with_profile(&self, user: &NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, contact_no, is_staff, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, FALSE, FALSE, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.contact_no)
        .bind(user.created_at)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_insert)?;

        let id = result.last_insert_id() as i64;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, relative_mobile_no, relatives_mobile_numbers, blood_group, updated_at)
            VALUES (?, '', ?, '', ?)
            "#,
        )
        .bind(id)
        .bind(Json(Vec::<String>::new()))
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            contact_no: Some(user.contact_no.clone()),
            is_staff: false,
            is_admin: false,
            created_at: user.created_at,
            updated_at: user.created_at,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn registration_conflicts(
        &self,
        username: &str,
        email: &str,
        contact_no: &str,
    ) -> Result<RegistrationConflicts> {
        let (username_taken, contact_taken, email_taken): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE username = ?),
                (SELECT COUNT(*) FROM users WHERE contact_no = ?),
                (SELECT COUNT(*) FROM users WHERE email = ?)
            "#,
        )
        .bind(username)
        .bind(contact_no)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(RegistrationConflicts {
            username: username_taken > 0,
            contact_no: contact_taken > 0,
            email: email_taken > 0,
        })
    }
}

// =============================================================================
// OTP LEDGER
// =============================================================================

pub struct OtpCrud {
    pool: Pool<MySql>,
}

impl OtpCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpLedger for OtpCrud {
    async fn latest(&self, email: &str) -> Result<Option<OtpRecord>> {
        let sql = format!(
            "SELECT {} FROM otp_records WHERE email = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            OTP_COLUMNS
        );
        Ok(sqlx::query_as::<_, OtpRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn supersede(
        &self,
        expected_latest: Option<i64>,
        record: &NewOtpRecord,
    ) -> Result<Option<OtpRecord>> {
        let mut tx = self.pool.begin().await?;

        // The user row is the per-email lock: concurrent issuances queue here.
        sqlx::query("SELECT id FROM users WHERE email = ? FOR UPDATE")
            .bind(&record.email)
            .fetch_optional(&mut *tx)
            .await?;

        let current: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM otp_records WHERE email = ? ORDER BY created_at DESC, id DESC LIMIT 1 FOR UPDATE",
        )
        .bind(&record.email)
        .fetch_optional(&mut *tx)
        .await?;

        if current.map(|(id,)| id) != expected_latest {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE otp_records SET is_expired = TRUE WHERE email = ? AND is_expired = FALSE")
            .bind(&record.email)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO otp_records (email, code, attempt_counter, is_expired, created_at)
            VALUES (?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(&record.email)
        .bind(&record.code)
        .bind(record.attempt_counter)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(OtpRecord {
            id: result.last_insert_id() as i64,
            email: record.email.clone(),
            code: record.code.clone(),
            attempt_counter: record.attempt_counter,
            is_expired: false,
            created_at: record.created_at,
        }))
    }

    async fn latest_matching(&self, email: &str, code: &str) -> Result<Option<OtpRecord>> {
        let sql = format!(
            "SELECT {} FROM otp_records WHERE email = ? AND CAST(code AS BINARY) = CAST(? AS BINARY) \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            OTP_COLUMNS
        );
        Ok(sqlx::query_as::<_, OtpRecord>(&sql)
            .bind(email)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn expire(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE otp_records SET is_expired = TRUE WHERE id = ? AND is_expired = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn history(&self, email: &str) -> Result<Vec<OtpRecord>> {
        let sql = format!(
            "SELECT {} FROM otp_records WHERE email = ? ORDER BY created_at DESC, id DESC",
            OTP_COLUMNS
        );
        Ok(sqlx::query_as::<_, OtpRecord>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?)
    }
}

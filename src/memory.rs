//! In-process implementations of every repository trait.
//!
//! Backs `STORAGE=memory` for local runs and the integration tests. Each
//! operation holds the single table lock for its whole duration, which gives the
//! same atomicity the MySQL implementations get from transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::modules::auth::interface::{OtpLedger, Result, UserRepository};
use crate::modules::auth::model::{NewOtpRecord, NewUser, OtpRecord, RegistrationConflicts, User};
use crate::modules::emergency::interface::AlertRepository;
use crate::modules::emergency::model::{AlertStatus, EmergencyAlert, NewAlert};
use crate::modules::profile::interface::ProfileRepository;
use crate::modules::profile::model::{ProfileUpdate, UserProfile};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    profiles: HashMap<i64, UserProfile>,
    otp_records: Vec<OtpRecord>,
    alerts: Vec<EmergencyAlert>,
    next_user_id: i64,
    next_otp_id: i64,
    next_alert_id: i64,
}

impl Tables {
    fn latest_otp(&self, email: &str) -> Option<&OtpRecord> {
        self.otp_records
            .iter()
            .filter(|r| r.email == email)
            .max_by_key(|r| (r.created_at, r.id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_with_profile(&self, user: &NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;

        let duplicate = tables.users.iter().any(|u| {
            u.username == user.username
                || u.email == user.email
                || u.contact_no.as_deref() == Some(user.contact_no.as_str())
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!("user '{}'", user.username)));
        }

        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
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
        };

        tables
            .profiles
            .insert(created.id, UserProfile::empty(created.id, user.created_at));
        tables.users.push(created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn registration_conflicts(
        &self,
        username: &str,
        email: &str,
        contact_no: &str,
    ) -> Result<RegistrationConflicts> {
        let tables = self.tables.lock().await;
        Ok(RegistrationConflicts {
            username: tables.users.iter().any(|u| u.username == username),
            contact_no: tables
                .users
                .iter()
                .any(|u| u.contact_no.as_deref() == Some(contact_no)),
            email: tables.users.iter().any(|u| u.email == email),
        })
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let tables = self.tables.lock().await;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn update(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<UserProfile>> {
        let mut tables = self.tables.lock().await;

        let Some(profile) = tables.profiles.get_mut(&user_id) else {
            return Ok(None);
        };
        profile.apply(update, now);
        let profile = profile.clone();

        if update.first_name.is_some() || update.last_name.is_some() {
            if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
                if let Some(first) = &update.first_name {
                    user.first_name = first.clone();
                }
                if let Some(last) = &update.last_name {
                    user.last_name = last.clone();
                }
                user.updated_at = now;
            }
        }

        Ok(Some(profile))
    }
}

#[async_trait]
impl OtpLedger for MemoryStore {
    async fn latest(&self, email: &str) -> Result<Option<OtpRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.latest_otp(email).cloned())
    }

    async fn supersede(
        &self,
        expected_latest: Option<i64>,
        record: &NewOtpRecord,
    ) -> Result<Option<OtpRecord>> {
        let mut tables = self.tables.lock().await;

        if tables.latest_otp(&record.email).map(|r| r.id) != expected_latest {
            return Ok(None);
        }

        for existing in tables
            .otp_records
            .iter_mut()
            .filter(|r| r.email == record.email && !r.is_expired)
        {
            existing.is_expired = true;
        }

        tables.next_otp_id += 1;
        let created = OtpRecord {
            id: tables.next_otp_id,
            email: record.email.clone(),
            code: record.code.clone(),
            attempt_counter: record.attempt_counter,
            is_expired: false,
            created_at: record.created_at,
        };
        tables.otp_records.push(created.clone());

        Ok(Some(created))
    }

    async fn latest_matching(&self, email: &str, code: &str) -> Result<Option<OtpRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .otp_records
            .iter()
            .filter(|r| r.email == email && r.code == code)
            .max_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn expire(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.otp_records.iter_mut().find(|r| r.id == id) {
            Some(record) if !record.is_expired => {
                record.is_expired = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn history(&self, email: &str) -> Result<Vec<OtpRecord>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<OtpRecord> = tables
            .otp_records
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(records)
    }
}

#[async_trait]
impl AlertRepository for MemoryStore {
    async fn create(&self, alert: &NewAlert) -> Result<EmergencyAlert> {
        let mut tables = self.tables.lock().await;
        tables.next_alert_id += 1;
        let created = alert.clone().into_alert(tables.next_alert_id);
        tables.alerts.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<EmergencyAlert>> {
        let tables = self.tables.lock().await;
        Ok(tables.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, status: Option<AlertStatus>) -> Result<Vec<EmergencyAlert>> {
        let tables = self.tables.lock().await;
        let mut alerts: Vec<EmergencyAlert> = tables
            .alerts
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(alerts)
    }

    async fn set_status(
        &self,
        id: i64,
        status: AlertStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<EmergencyAlert>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.alerts.iter_mut().find(|a| a.id == id).map(|alert| {
            alert.status = status;
            alert.updated_at = now;
            alert.clone()
        }))
    }
}

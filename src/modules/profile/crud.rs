use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, MySql, Pool};

use crate::error::StoreError;
use crate::modules::auth::interface::Result;
use crate::modules::profile::interface::ProfileRepository;
use crate::modules::profile::model::{ProfileUpdate, UserProfile};

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: i64,
    image: Option<String>,
    relative_mobile_no: String,
    relatives_mobile_numbers: Json<Vec<String>>,
    emergency_email: Option<String>,
    blood_group: String,
    height_cm: Option<Decimal>,
    weight_kg: Option<Decimal>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> std::result::Result<Self, Self::Error> {
        let blood_group = if row.blood_group.is_empty() {
            None
        } else {
            Some(row.blood_group.parse().map_err(StoreError::Corrupt)?)
        };

        Ok(UserProfile {
            user_id: row.user_id,
            image: row.image,
            relative_mobile_no: row.relative_mobile_no,
            relatives_mobile_numbers: row.relatives_mobile_numbers.0,
            emergency_email: row.emergency_email,
            blood_group,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            updated_at: row.updated_at,
        })
    }
}

const PROFILE_SELECT: &str = "SELECT user_id, image, relative_mobile_no, relatives_mobile_numbers, \
                              emergency_email, blood_group, height_cm, weight_kg, updated_at \
                              FROM user_profiles WHERE user_id = ?";

pub struct ProfileCrud {
    pool: Pool<MySql>,
}

impl ProfileCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfileCrud {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        sqlx::query_as::<_, ProfileRow>(PROFILE_SELECT)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn update(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<UserProfile>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{} FOR UPDATE", PROFILE_SELECT);
        let Some(row) = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut profile = UserProfile::try_from(row)?;
        profile.apply(update, now);

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET image = ?, relative_mobile_no = ?, relatives_mobile_numbers = ?, emergency_email = ?,
                blood_group = ?, height_cm = ?, weight_kg = ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(&profile.image)
        .bind(&profile.relative_mobile_no)
        .bind(Json(profile.relatives_mobile_numbers.clone()))
        .bind(&profile.emergency_email)
        .bind(profile.blood_group.map(|g| g.as_str()).unwrap_or(""))
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.updated_at)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if update.first_name.is_some() || update.last_name.is_some() {
            sqlx::query(
                r#"
                UPDATE users
                SET first_name = COALESCE(?, first_name), last_name = COALESCE(?, last_name), updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(profile))
    }
}

//! User rows referenced by experiences and approvals.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::Role;
use crate::store::StoreError;

/// Identifier wrapper for portal users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields required to provision a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub batch_year: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub batch_year: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("email is required")]
    MissingEmail,
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, role, department, batch_year, is_active, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: NewUser) -> Result<UserRecord, UserError> {
        let email = user.email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(UserError::MissingEmail);
        }

        let inserted = sqlx::query(
            "INSERT INTO users (email, first_name, last_name, role, department, batch_year, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&email)
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(user.role)
        .bind(user.department)
        .bind(user.batch_year)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        let id = match inserted {
            Ok(result) => UserId(result.last_insert_rowid()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(UserError::EmailTaken(email))
            }
            Err(err) => return Err(StoreError::from(err).into()),
        };

        self.find(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("user {id} vanished after insert")).into())
    }

    pub async fn find(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

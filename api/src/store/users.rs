//! Credential store: user records and password checks.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::password;
use crate::error::AppError;
use crate::models::user::{User, UserRecord};
use crate::models::now_micros;
use crate::validation::{
    normalize_email, validate_email, validate_name, validate_password, FieldErrors,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// Besides the random primary key, the email index is the only unique key a
/// user write can trip. A lost race on it looks exactly like a duplicate.
fn email_conflict(err: sqlx::Error) -> AppError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => AppError::EmailInUse,
        _ => err.into(),
    }
}

/// Partial profile edit. `None` leaves the field as it is.
#[derive(Debug, Default, Clone)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Creates an account. Email uniqueness is decided by the unique index,
    /// so of two racing registrations exactly one wins.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        let name = name.trim();
        let email = normalize_email(email);

        let mut errors = FieldErrors::new();
        errors.record(validate_name(name));
        errors.record(validate_email(&email));
        errors.record(validate_password(password));
        errors.into_result()?;

        let password_hash = password::hash(password).await?;
        let now = now_micros();

        let record: UserRecord = sqlx::query_as(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(email_conflict)?;

        tracing::info!(user_id = %record.id, "user registered");
        Ok(record.into())
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    #[tracing::instrument(skip_all)]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let record = self.find_record_by_email(&email).await?;

        let stored = record.as_ref().map(|r| r.password_hash.clone());
        if !password::verify(password, stored).await? {
            tracing::info!("login rejected");
            return Err(AppError::InvalidCredentials);
        }

        record.map(User::from).ok_or(AppError::InvalidCredentials)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn find_record_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<User, AppError> {
        let name = patch.name.as_deref().map(str::trim).map(ToOwned::to_owned);
        let email = patch.email.as_deref().map(normalize_email);

        let mut errors = FieldErrors::new();
        if let Some(name) = &name {
            errors.record(validate_name(name));
        }
        if let Some(email) = &email {
            errors.record(validate_email(email));
        }
        errors.into_result()?;

        if name.is_none() && email.is_none() {
            return self.find_by_id(user_id).await?.ok_or(AppError::NotFound);
        }

        let row: Option<UserRecord> = sqlx::query_as(&format!(
            "UPDATE users SET name = COALESCE(?, name), email = COALESCE(?, email), \
             updated_at = MAX(?, updated_at + 1) WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(now_micros())
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(email_conflict)?;

        let user: User = row.map(Into::into).ok_or(AppError::NotFound)?;
        tracing::info!("profile updated");
        Ok(user)
    }

    /// Removes the user and every post they own in one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, user_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let posts = sqlx::query("DELETE FROM posts WHERE author_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if users.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(posts_deleted = posts.rows_affected(), "account deleted");
        Ok(())
    }
}

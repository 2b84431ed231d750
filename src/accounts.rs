use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::User;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Credential failures, classified the way the login page reports them.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredential,
    #[error("Email already in use.")]
    EmailInUse,
    #[error("Password should be at least 6 characters.")]
    WeakPassword,
    #[error("Authentication failed. Please try again.")]
    Other(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Other(e.to_string())
    }
}

fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(email)
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Other(format!("hash: {e}")))
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(db)
        .await
}

pub async fn sign_up(db: &SqlitePool, email: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidCredential)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(AuthError::EmailInUse);
    }

    let now = Utc::now().to_rfc3339();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: hash_password(password)?,
        created_at: now.clone(),
        updated_at: now,
    };

    let inserted = sqlx::query(
        "INSERT INTO users (id, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(db)
    .await;

    match inserted {
        Ok(_) => {
            tracing::info!(user_id = %user.id, "account created");
            Ok(user)
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthError::EmailInUse),
        Err(e) => Err(e.into()),
    }
}

pub async fn sign_in(db: &SqlitePool, email: &str, password: &str) -> Result<User, AuthError> {
    let Some(user) = find_by_email(db, email).await? else {
        return Err(AuthError::InvalidCredential);
    };

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|e| AuthError::Other(format!("stored hash: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredential)?;

    Ok(user)
}

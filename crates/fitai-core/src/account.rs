//! Account management: signup, login, and removal.
//!
//! Passwords are stored as `hex(HMAC-SHA256(key = salt, password))` with a
//! random 16-byte salt per user.

use anyhow::Result;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use fitai_db::models::User;
use fitai_db::queries::users;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;

/// Signup and login failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("user {0:?} not found")]
    UserNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("stored credentials for {0:?} are corrupt")]
    CorruptCredentials(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Random salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    hex::encode(salt)
}

fn password_mac(salt: &[u8], password: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC can take key of any size");
    mac.update(password.as_bytes());
    mac
}

/// Hash `password` with a hex-encoded salt.
pub fn hash_password(password: &str, salt_hex: &str) -> Result<String, hex::FromHexError> {
    let salt = hex::decode(salt_hex)?;
    Ok(hex::encode(password_mac(&salt, password).finalize().into_bytes()))
}

/// Constant-time check of `password` against a stored salt and hash.
pub fn verify_password(
    password: &str,
    salt_hex: &str,
    hash_hex: &str,
) -> Result<bool, hex::FromHexError> {
    let salt = hex::decode(salt_hex)?;
    let expected = hex::decode(hash_hex)?;
    Ok(password_mac(&salt, password).verify_slice(&expected).is_ok())
}

/// Create an account. Usernames are trimmed; both fields must be non-empty.
pub async fn signup(pool: &PgPool, username: &str, password: &str) -> Result<User, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let salt = generate_salt();
    let hash = hash_password(password, &salt)
        .map_err(|_| AuthError::CorruptCredentials(username.to_owned()))?;

    let user = users::insert_user(pool, username, &hash, &salt)
        .await?
        .ok_or_else(|| AuthError::UsernameTaken(username.to_owned()))?;

    info!(user_id = %user.id, username = %user.username, "account created");
    Ok(user)
}

/// Check credentials and return the matching user.
pub async fn login(pool: &PgPool, username: &str, password: &str) -> Result<User, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let user = users::get_user_by_username(pool, username)
        .await?
        .ok_or_else(|| AuthError::UserNotFound(username.to_owned()))?;

    let ok = verify_password(password, &user.password_salt, &user.password_hash)
        .map_err(|_| AuthError::CorruptCredentials(username.to_owned()))?;
    if !ok {
        return Err(AuthError::InvalidPassword);
    }

    Ok(user)
}

/// Delete an account and everything stored for it.
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let deleted = users::delete_user(pool, user_id).await?;
    if deleted {
        info!(user_id = %user_id, "account deleted");
    }
    Ok(deleted)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    users::list_users(pool).await
}

//! Session tokens for the HTTP API.
//!
//! Format: `fitai_st_<user_id>_<issued_unix>_<hmac_hex>` where the
//! HMAC-SHA256 is computed over `<user_id>:<issued_unix>`.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "fitai_st_";

/// Environment variable holding the hex-encoded signing secret.
pub const SECRET_ENV: &str = "FITAI_TOKEN_SECRET";

/// Tokens older than this are rejected unless configured otherwise.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Allowed clock skew for tokens stamped slightly in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("invalid issue time in token: {0}")]
    InvalidTimestamp(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("token expired")]
    Expired,

    #[error("missing token secret")]
    MissingSecret,
}

/// Signing secret and token lifetime.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: Vec<u8>,
    pub max_age: Duration,
}

impl TokenConfig {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Build from a hex-encoded secret as written by `fitai init`.
    pub fn from_hex(secret_hex: &str) -> Result<Self, TokenError> {
        if secret_hex.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let secret = hex::decode(secret_hex)
            .map_err(|e| TokenError::InvalidFormat(format!("token secret is not valid hex: {e}")))?;
        Ok(Self::new(secret))
    }
}

/// Claims carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

/// Issue a token for `user_id` stamped with the current time.
pub fn issue_token(config: &TokenConfig, user_id: Uuid) -> String {
    issue_token_at(config, user_id, Utc::now())
}

/// Issue a token stamped with `issued_at`.
pub fn issue_token_at(config: &TokenConfig, user_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let issued = issued_at.timestamp();
    let message = format!("{user_id}:{issued}");
    let mac = compute_hmac(&config.secret, message.as_bytes());
    format!("{TOKEN_PREFIX}{user_id}_{issued}_{}", hex::encode(mac))
}

/// Validate a token against the current time.
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<TokenClaims, TokenError> {
    validate_token_at(config, token, Utc::now())
}

/// Validate a token's signature and age relative to `now`.
pub fn validate_token_at(
    config: &TokenConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<TokenClaims, TokenError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        TokenError::InvalidFormat(format!("token must start with '{TOKEN_PREFIX}'"))
    })?;

    // A hyphenated UUID is 36 characters.
    if rest.len() < 36 || !rest.is_char_boundary(36) {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    let (user_id_str, after_user_id) = rest.split_at(36);
    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let after_underscore = after_user_id.strip_prefix('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore after user ID".to_string())
    })?;
    let (issued_str, hmac_hex) = after_underscore.split_once('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore between issue time and hmac".to_string())
    })?;

    let issued: i64 = issued_str
        .parse()
        .map_err(|e: std::num::ParseIntError| TokenError::InvalidTimestamp(e.to_string()))?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let message = format!("{user_id}:{issued}");
    verify_hmac_constant_time(&config.secret, message.as_bytes(), &provided_mac)?;

    let issued_at = DateTime::from_timestamp(issued, 0)
        .ok_or_else(|| TokenError::InvalidTimestamp(issued.to_string()))?;
    if issued_at > now + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
        return Err(TokenError::InvalidTimestamp(
            "token issued in the future".to_string(),
        ));
    }
    if now - issued_at > config.max_age {
        return Err(TokenError::Expired);
    }

    Ok(TokenClaims { user_id, issued_at })
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn verify_hmac_constant_time(
    key: &[u8],
    message: &[u8],
    expected_mac: &[u8],
) -> Result<(), TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| TokenError::HmacMismatch)
}

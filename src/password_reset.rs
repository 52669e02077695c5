//! Password-reset token lifecycle
//!
//! A reset request issues a single-use random token with a short expiry and
//! mails a link carrying it. Requesting again invalidates every earlier
//! unused token for the account. Unknown emails and accounts without a
//! password are ignored silently so the request cannot reveal
//! which emails are registered.

use crate::profile::UserAccount;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 60;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// A stored reset token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
}

impl ResetToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Storage for credentials and reset tokens
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserAccount>>;

    /// Mark every unused token of `token.user_id` used, then store `token`
    async fn replace_reset_tokens(&self, token: ResetToken) -> anyhow::Result<()>;

    async fn get_reset_token(&self, token: &str) -> anyhow::Result<Option<ResetToken>>;

    /// Set the owner's password hash and mark the token used in one step.
    ///
    /// Returns `false` without changing anything when the token is unknown
    /// or already used.
    async fn complete_reset(&self, token: &str, password_hash: String) -> anyhow::Result<bool>;

    /// Display name used to greet the user in the reset mail
    async fn display_name(&self, user_id: &str) -> anyhow::Result<Option<String>>;
}

/// Delivery of reset links; the provider integration lives outside this crate
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset_link(&self, to: &str, name: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Mailer that only logs; the link itself is logged at debug level
pub struct LoggingMailer;

#[async_trait]
impl ResetMailer for LoggingMailer {
    async fn send_reset_link(&self, to: &str, _name: &str, reset_url: &str) -> anyhow::Result<()> {
        info!("Password reset link issued for {}", to);
        debug!("Reset link for {}: {}", to, reset_url);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PasswordResetConfig {
    /// Base URL of the web frontend; links point at `{frontend_url}/reset-password`
    pub frontend_url: String,
    pub token_ttl: Duration,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            token_ttl: Duration::minutes(DEFAULT_RESET_TOKEN_TTL_MINUTES),
        }
    }
}

impl PasswordResetConfig {
    pub fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }
}

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Token and password are required")]
    MissingFields,
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("Invalid or expired reset token")]
    InvalidToken,
    #[error("This reset link has already been used")]
    TokenUsed,
    #[error("This reset link has expired")]
    TokenExpired,
    #[error("Failed to hash password: {0}")]
    Hash(String),
    #[error("Password store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Hash a password with Argon2 and a fresh random salt (PHC string format)
pub fn hash_password(password: &str) -> Result<String, PasswordResetError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordResetError::Hash(e.to_string()))
}

/// Check a password against a stored PHC hash; malformed hashes never match
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// 32 random bytes, hex encoded
pub fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn PasswordResetStore>,
    mailer: Arc<dyn ResetMailer>,
    config: PasswordResetConfig,
}

impl fmt::Debug for PasswordResetService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetService")
            .field("store", &"PasswordResetStore")
            .field("mailer", &"ResetMailer")
            .field("config", &self.config)
            .finish()
    }
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn PasswordResetStore>,
        mailer: Arc<dyn ResetMailer>,
        config: PasswordResetConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    pub async fn request_reset(&self, email: &str) -> Result<(), PasswordResetError> {
        self.request_reset_at(email, Utc::now()).await
    }

    /// Issue a token for `email` as of `now`.
    ///
    /// Succeeds without doing anything for unknown emails and for accounts
    /// that have no password. Mail failures are logged, not returned.
    pub async fn request_reset_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PasswordResetError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(PasswordResetError::EmailRequired);
        }

        let Some(user) = self.store.find_user_by_email(email).await? else {
            debug!("Ignoring reset request for unknown email");
            return Ok(());
        };
        if user.password_hash.is_none() {
            debug!("Ignoring reset request for user {} without a password", user.id);
            return Ok(());
        }

        let token = ResetToken {
            token: generate_reset_token(),
            user_id: user.id.clone(),
            expires_at: now + self.config.token_ttl,
            used: false,
        };
        let reset_url = self.config.reset_url(&token.token);
        self.store.replace_reset_tokens(token).await?;
        info!("Issued password reset token for user {}", user.id);

        let name = self.store.display_name(&user.id).await?.unwrap_or_default();
        if let Err(e) = self
            .mailer
            .send_reset_link(&user.email, &name, &reset_url)
            .await
        {
            warn!("Failed to send reset link to user {}: {:#}", user.id, e);
        }

        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        self.reset_password_at(token, new_password, Utc::now()).await
    }

    /// Consume `token` as of `now` and store a hash of `new_password`
    pub async fn reset_password_at(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PasswordResetError> {
        if token.is_empty() || new_password.is_empty() {
            return Err(PasswordResetError::MissingFields);
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PasswordResetError::PasswordTooShort);
        }

        let stored = self
            .store
            .get_reset_token(token)
            .await?
            .ok_or(PasswordResetError::InvalidToken)?;
        if stored.used {
            return Err(PasswordResetError::TokenUsed);
        }
        if stored.is_expired_at(now) {
            return Err(PasswordResetError::TokenExpired);
        }

        let password_hash = hash_password(new_password)?;

        // A concurrent reset may have consumed the token since the read above
        if !self.store.complete_reset(token, password_hash).await? {
            return Err(PasswordResetError::TokenUsed);
        }

        info!("Password reset completed for user {}", stored.user_id);
        Ok(())
    }
}

//! Process configuration, read once from the environment at startup

use crate::leetcode_verifier::LeetCodeConfig;
use crate::password_reset::{PasswordResetConfig, DEFAULT_RESET_TOKEN_TTL_MINUTES};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_STORE_PATH: &str = "./data/profiles.json";
const DEFAULT_NOTIFY_QUEUE_SIZE: usize = 256;
const DEFAULT_LEETCODE_TIMEOUT_SECS: u64 = 10;

/// Configuration shared by the portal's profile components
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// JSON snapshot backing the in-memory profile store
    pub store_path: PathBuf,
    /// Capacity of the profile notification queue
    pub notify_queue_size: usize,
    pub leetcode: LeetCodeConfig,
    pub password_reset: PasswordResetConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            notify_queue_size: DEFAULT_NOTIFY_QUEUE_SIZE,
            leetcode: LeetCodeConfig::default(),
            password_reset: PasswordResetConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Build from environment variables (call `dotenv::dotenv()` first to honour `.env`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparseable values use defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let store_path = lookup("PROFILE_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let notify_queue_size =
            parse_or(&lookup, "NOTIFY_QUEUE_SIZE", DEFAULT_NOTIFY_QUEUE_SIZE);

        let graphql_url =
            lookup("LEETCODE_GRAPHQL_URL").unwrap_or(defaults.leetcode.graphql_url);

        let timeout_secs = parse_or(
            &lookup,
            "LEETCODE_TIMEOUT_SECS",
            DEFAULT_LEETCODE_TIMEOUT_SECS,
        );

        let frontend_url = lookup("FRONTEND_URL").unwrap_or(defaults.password_reset.frontend_url);

        let reset_ttl_minutes: u32 = parse_or(
            &lookup,
            "RESET_TOKEN_TTL_MINUTES",
            DEFAULT_RESET_TOKEN_TTL_MINUTES as u32,
        );

        Self {
            store_path,
            notify_queue_size,
            leetcode: LeetCodeConfig {
                graphql_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            password_reset: PasswordResetConfig {
                frontend_url,
                token_ttl: chrono::Duration::minutes(i64::from(reset_ttl_minutes)),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

//! Profile storage seam and the in-memory store used by the portal

use crate::password_reset::{PasswordResetStore, ResetToken};
use crate::profile::{ClaimedProfile, Profile, UserAccount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Read/write access to profiles and their owners
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All profiles except the one owned by `exclude_user_id`, joined with owner emails
    async fn profiles_except(&self, exclude_user_id: Option<&str>) -> Result<Vec<ClaimedProfile>>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Insert or replace the profile keyed by its user id
    async fn save_profile(&self, profile: Profile) -> Result<Profile>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>>;
}

/// On-disk form of the in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<UserAccount>,
    pub profiles: Vec<Profile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reset_tokens: Vec<ResetToken>,
}

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<String, UserAccount>,
    profiles: BTreeMap<String, Profile>,
    reset_tokens: BTreeMap<String, ResetToken>,
}

/// Profile store backed by process memory, optionally persisted as a JSON snapshot
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    state: RwLock<StoreState>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let state = StoreState {
            users: snapshot
                .users
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect(),
            profiles: snapshot
                .profiles
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect(),
            reset_tokens: snapshot
                .reset_tokens
                .into_iter()
                .map(|t| (t.token.clone(), t))
                .collect(),
        };
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            users: state.users.values().cloned().collect(),
            profiles: state.profiles.values().cloned().collect(),
            reset_tokens: state.reset_tokens.values().cloned().collect(),
        }
    }

    pub fn add_user(&self, user: UserAccount) {
        self.state.write().users.insert(user.id.clone(), user);
    }

    pub fn profile_count(&self) -> usize {
        self.state.read().profiles.len()
    }

    /// Load a snapshot file; a missing file yields an empty store
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            info!("No profile snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read profile snapshot {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)
            .with_context(|| format!("Invalid profile snapshot {}", path.display()))?;

        info!(
            "Loaded {} users and {} profiles from {}",
            snapshot.users.len(),
            snapshot.profiles.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current state as pretty JSON, creating parent directories
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write profile snapshot {}", path.display()))?;
        debug!("Saved profile snapshot to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn profiles_except(&self, exclude_user_id: Option<&str>) -> Result<Vec<ClaimedProfile>> {
        let state = self.state.read();
        Ok(state
            .profiles
            .values()
            .filter(|p| Some(p.user_id.as_str()) != exclude_user_id)
            .map(|p| ClaimedProfile {
                profile: p.clone(),
                owner_email: state.users.get(&p.user_id).map(|u| u.email.clone()),
            })
            .collect())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self.state.read().profiles.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: Profile) -> Result<Profile> {
        self.state
            .write()
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>> {
        Ok(self.state.read().users.get(user_id).cloned())
    }
}

#[async_trait]
impl PasswordResetStore for InMemoryProfileStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn replace_reset_tokens(&self, token: ResetToken) -> Result<()> {
        let mut state = self.state.write();
        for existing in state.reset_tokens.values_mut() {
            if existing.user_id == token.user_id && !existing.used {
                existing.used = true;
            }
        }
        state.reset_tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn get_reset_token(&self, token: &str) -> Result<Option<ResetToken>> {
        Ok(self.state.read().reset_tokens.get(token).cloned())
    }

    async fn complete_reset(&self, token: &str, password_hash: String) -> Result<bool> {
        let mut state = self.state.write();
        let StoreState {
            users,
            reset_tokens,
            ..
        } = &mut *state;

        let Some(reset_token) = reset_tokens.get_mut(token).filter(|t| !t.used) else {
            return Ok(false);
        };
        let Some(user) = users.get_mut(&reset_token.user_id) else {
            anyhow::bail!("Reset token refers to unknown user {}", reset_token.user_id);
        };

        user.password_hash = Some(password_hash);
        reset_token.used = true;
        Ok(true)
    }

    async fn display_name(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .profiles
            .get(user_id)
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty()))
    }
}

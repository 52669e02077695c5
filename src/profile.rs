//! Profile data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::platform::Platform;

/// Handles keyed by platform key; sorted so scans and messages are deterministic
pub type Handles = BTreeMap<String, String>;

/// Rewrite every recognised platform key to its lowercase form.
///
/// Unknown keys are kept verbatim so validation can still report them. When
/// two spellings of one platform are submitted, a non-empty value wins.
pub fn canonicalize_handles(handles: Handles) -> Handles {
    let mut canonical = Handles::new();
    for (key, value) in handles {
        let key = match Platform::from_key(&key) {
            Some(platform) => platform.key().to_string(),
            None => key,
        };
        match canonical.get(&key) {
            Some(current) if !current.is_empty() && value.is_empty() => {}
            _ => {
                canonical.insert(key, value);
            }
        }
    }
    canonical
}

/// Role of a portal account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

/// A registered portal account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Argon2 PHC hash; `None` for accounts that sign in without a password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl UserAccount {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            password_hash: None,
        }
    }

    pub fn with_password_hash(mut self, password_hash: impl Into<String>) -> Self {
        self.password_hash = Some(password_hash.into());
        self
    }
}

/// A user's club profile (at most one per user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub linked_in: Option<String>,
    #[serde(default)]
    pub handles: Handles,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: String::new(),
            branch: String::new(),
            year: None,
            contact: String::new(),
            linked_in: None,
            handles: Handles::new(),
            updated_at: Utc::now(),
        }
    }

    /// Raw stored handle for a platform, if set and non-empty.
    ///
    /// Keys match case-insensitively, so snapshots written with a key such
    /// as `LeetCode` still resolve.
    pub fn handle(&self, platform: Platform) -> Option<&str> {
        self.handles
            .get(platform.key())
            .filter(|h| !h.is_empty())
            .or_else(|| {
                self.handles
                    .iter()
                    .filter(|(key, value)| {
                        !value.is_empty() && Platform::from_key(key) == Some(platform)
                    })
                    .map(|(_, value)| value)
                    .next()
            })
            .map(String::as_str)
    }

    /// Apply the fields present in an update; `handles` replaces the whole map
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(branch) = update.branch {
            self.branch = branch;
        }
        if let Some(year) = update.year {
            self.year = Some(year);
        }
        if let Some(contact) = update.contact {
            self.contact = contact;
        }
        if let Some(linked_in) = update.linked_in {
            self.linked_in = Some(linked_in).filter(|l| !l.is_empty());
        }
        if let Some(handles) = update.handles {
            self.handles = handles;
        }
        self.updated_at = Utc::now();
    }
}

/// Upsert payload; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handles: Option<Handles>,
}

/// A stored profile joined with its owner's display identifier
#[derive(Debug, Clone)]
pub struct ClaimedProfile {
    pub profile: Profile,
    pub owner_email: Option<String>,
}

impl ClaimedProfile {
    /// Placeholder used when the owner has no display identifier
    pub const ANONYMOUS_OWNER: &'static str = "another user";

    pub fn claimed_by(&self) -> String {
        self.owner_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(Self::ANONYMOUS_OWNER)
            .to_string()
    }
}

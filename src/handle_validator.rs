//! Duplicate-claim validation for handles, phone numbers and LinkedIn profiles
//!
//! Every submitted value is reduced to a canonical identifier and compared
//! against the same field of every other user's profile. Conflicts are
//! reported as human-readable messages so a caller can collect all of them
//! in one pass instead of failing on the first bad field.

use crate::contact_normalizer::{is_checkable_phone, normalize_linkedin, normalize_phone};
use crate::platform::Platform;
use crate::profile::{ClaimedProfile, Handles};
use crate::profile_store::ProfileStore;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which identity field a value is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Handle(Platform),
    Contact,
    LinkedIn,
}

impl ClaimKind {
    /// Normalize a raw value the way stored values of this kind are compared
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            ClaimKind::Handle(platform) => platform.normalize(raw),
            ClaimKind::Contact => normalize_phone(raw),
            ClaimKind::LinkedIn => normalize_linkedin(raw),
        }
    }

    /// Stored raw value of this kind on a profile, skipping empty ones
    fn stored_value<'a>(&self, claimed: &'a ClaimedProfile) -> Option<&'a str> {
        let profile = &claimed.profile;
        let value = match self {
            ClaimKind::Handle(platform) => profile.handle(*platform),
            ClaimKind::Contact => Some(profile.contact.as_str()),
            ClaimKind::LinkedIn => profile.linked_in.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Whether a normalized value takes part in duplicate checks at all
    fn is_checkable(&self, normalized: &str) -> bool {
        match self {
            ClaimKind::Contact => is_checkable_phone(normalized),
            _ => !normalized.is_empty(),
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimKind::Handle(platform) => write!(f, "{platform} handle"),
            ClaimKind::Contact => f.write_str("contact"),
            ClaimKind::LinkedIn => f.write_str("linkedIn"),
        }
    }
}

/// Outcome of a single collision check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Claimed { claimed_by: String },
}

impl Availability {
    pub fn is_taken(&self) -> bool {
        matches!(self, Availability::Claimed { .. })
    }

    pub fn claimed_by(&self) -> Option<&str> {
        match self {
            Availability::Available => None,
            Availability::Claimed { claimed_by } => Some(claimed_by),
        }
    }
}

/// Validates that handles and contact fields are not claimed by another user
#[derive(Clone)]
pub struct HandleValidator {
    store: Arc<dyn ProfileStore>,
}

impl fmt::Debug for HandleValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleValidator")
            .field("store", &"ProfileStore")
            .finish()
    }
}

impl HandleValidator {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Check whether an already-normalized value is claimed by anyone but `exclude_user_id`.
    ///
    /// The first matching profile in store order wins.
    pub async fn check_availability(
        &self,
        kind: ClaimKind,
        normalized_value: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Availability> {
        if !kind.is_checkable(normalized_value) {
            return Ok(Availability::Available);
        }

        let profiles = self.store.profiles_except(exclude_user_id).await?;

        for claimed in &profiles {
            let Some(existing) = kind.stored_value(claimed) else {
                continue;
            };

            if kind.normalize(existing) == normalized_value {
                let claimed_by = claimed.claimed_by();
                debug!(
                    "{} \"{}\" already claimed by user {}",
                    kind, normalized_value, claimed.profile.user_id
                );
                return Ok(Availability::Claimed { claimed_by });
            }
        }

        Ok(Availability::Available)
    }

    /// Validate a submitted handles map, returning one message per problem
    pub async fn validate_handles(
        &self,
        handles: &Handles,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        for (key, value) in handles {
            if value.is_empty() {
                continue;
            }

            let Some(platform) = Platform::from_key(key) else {
                errors.push(format!("Invalid platform: {key}"));
                continue;
            };

            let normalized = platform.normalize(value);
            let availability = self
                .check_availability(ClaimKind::Handle(platform), &normalized, exclude_user_id)
                .await?;

            if let Availability::Claimed { claimed_by } = availability {
                errors.push(format!(
                    "{key} handle \"{normalized}\" is already claimed by {claimed_by}"
                ));
            }
        }

        Ok(errors)
    }

    /// Validate the singleton contact and LinkedIn fields
    pub async fn validate_profile_fields(
        &self,
        contact: Option<&str>,
        linked_in: Option<&str>,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        if let Some(contact) = contact.filter(|c| !c.is_empty()) {
            let normalized = normalize_phone(contact);
            let availability = self
                .check_availability(ClaimKind::Contact, &normalized, exclude_user_id)
                .await?;

            if let Availability::Claimed { claimed_by } = availability {
                errors.push(format!(
                    "Contact number is already registered with {claimed_by}"
                ));
            }
        }

        if let Some(linked_in) = linked_in.filter(|l| !l.is_empty()) {
            let normalized = normalize_linkedin(linked_in);
            let availability = self
                .check_availability(ClaimKind::LinkedIn, &normalized, exclude_user_id)
                .await?;

            if let Availability::Claimed { claimed_by } = availability {
                errors.push(format!(
                    "LinkedIn profile \"{normalized}\" is already linked to {claimed_by}"
                ));
            }
        }

        Ok(errors)
    }
}

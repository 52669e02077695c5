//! Profile upsert flow: leetcode lock, duplicate validation, write, notify

use crate::handle_validator::HandleValidator;
use crate::platform::Platform;
use crate::profile::{canonicalize_handles, Handles, Profile, ProfileUpdate, Role};
use crate::profile_notifier::{ProfileEvent, ProfileNotifier};
use crate::profile_store::ProfileStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Separator used when several validation messages are reported together
pub const ERROR_SEPARATOR: &str = "; ";

/// Identity of the caller, threaded explicitly through each operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub role: Role,
}

impl RequestContext {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Member,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    /// One or more user-correctable problems, joined with `"; "`
    #[error("{0}")]
    Validation(String),
    #[error("User profile not found: {0}")]
    NotFound(String),
    #[error("Admin privileges required")]
    Forbidden,
    #[error("Profile store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Profile operations exposed to the portal's request handlers
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    validator: HandleValidator,
    notifier: ProfileNotifier,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, notifier: ProfileNotifier) -> Self {
        Self {
            validator: HandleValidator::new(store.clone()),
            store,
            notifier,
        }
    }

    pub fn validator(&self) -> &HandleValidator {
        &self.validator
    }

    pub async fn get_profile(&self, ctx: &RequestContext) -> Result<Option<Profile>, ProfileError> {
        Ok(self.store.get_profile(&ctx.user_id).await?)
    }

    /// Create or update the caller's profile.
    ///
    /// Nothing is written unless every submitted handle and contact field
    /// passes duplicate validation. Validation and write are not atomic with
    /// respect to concurrent upserts of the same value.
    pub async fn upsert_profile(
        &self,
        ctx: &RequestContext,
        mut update: ProfileUpdate,
    ) -> Result<Profile, ProfileError> {
        let existing = self.store.get_profile(&ctx.user_id).await?;
        update.handles = update.handles.map(canonicalize_handles);

        if !ctx.is_admin() {
            if let (Some(existing), Some(handles)) = (&existing, update.handles.as_mut()) {
                lock_leetcode_handle(existing, handles);
            }
        }

        self.ensure_unclaimed(
            update.handles.as_ref(),
            update.contact.as_deref(),
            update.linked_in.as_deref(),
            &ctx.user_id,
        )
        .await?;

        let (mut profile, event) = match existing {
            Some(profile) => (
                profile,
                ProfileEvent::Updated {
                    user_id: ctx.user_id.clone(),
                },
            ),
            None => (
                Profile::new(ctx.user_id.clone()),
                ProfileEvent::Created {
                    user_id: ctx.user_id.clone(),
                },
            ),
        };
        profile.apply(update);

        let saved = self.store.save_profile(profile).await?;
        info!("Saved profile for user {}", saved.user_id);
        self.notifier.notify(event);

        Ok(saved)
    }

    /// Replace another user's handles; admin only
    pub async fn admin_update_handles(
        &self,
        ctx: &RequestContext,
        target_user_id: &str,
        handles: Handles,
    ) -> Result<Profile, ProfileError> {
        if !ctx.is_admin() {
            return Err(ProfileError::Forbidden);
        }
        let handles = canonicalize_handles(handles);

        let Some(mut profile) = self.store.get_profile(target_user_id).await? else {
            return Err(ProfileError::NotFound(target_user_id.to_string()));
        };

        self.ensure_unclaimed(Some(&handles), None, None, target_user_id)
            .await?;

        profile.apply(ProfileUpdate {
            handles: Some(handles),
            ..Default::default()
        });

        let saved = self.store.save_profile(profile).await?;
        info!(
            "Admin {} overrode handles for user {}",
            ctx.user_id, target_user_id
        );
        self.notifier.notify(ProfileEvent::HandlesOverridden {
            user_id: target_user_id.to_string(),
            admin_id: ctx.user_id.clone(),
        });

        Ok(saved)
    }

    /// Collect every duplicate-claim problem, failing with all of them at once
    async fn ensure_unclaimed(
        &self,
        handles: Option<&Handles>,
        contact: Option<&str>,
        linked_in: Option<&str>,
        owner_id: &str,
    ) -> Result<(), ProfileError> {
        let mut errors = match handles {
            Some(handles) => {
                self.validator
                    .validate_handles(handles, Some(owner_id))
                    .await?
            }
            None => Vec::new(),
        };
        errors.extend(
            self.validator
                .validate_profile_fields(contact, linked_in, Some(owner_id))
                .await?,
        );

        if errors.is_empty() {
            return Ok(());
        }

        debug!(
            "Rejecting profile write for user {}: {} problem(s)",
            owner_id,
            errors.len()
        );
        Err(ProfileError::Validation(errors.join(ERROR_SEPARATOR)))
    }
}

/// Keep a member's stored leetcode handle regardless of what was submitted.
///
/// `handles` must already carry canonical keys.
fn lock_leetcode_handle(existing: &Profile, handles: &mut Handles) {
    let Some(locked) = existing.handle(Platform::LeetCode) else {
        return;
    };

    handles.insert(Platform::LeetCode.key().to_string(), locked.to_string());
}

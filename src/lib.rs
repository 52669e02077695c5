pub mod config;
pub mod contact_normalizer;
pub mod handle_validator;
pub mod leetcode_verifier;
pub mod password_reset;
pub mod platform;
pub mod profile;
pub mod profile_notifier;
pub mod profile_service;
pub mod profile_store;

#[cfg(test)]
mod tests;

pub use config::PortalConfig;
pub use contact_normalizer::{normalize_linkedin, normalize_phone, MIN_PHONE_LEN};
pub use handle_validator::{Availability, ClaimKind, HandleValidator};
pub use leetcode_verifier::{LeetCodeConfig, LeetCodeSubmission, LeetCodeVerifier, Verification};
pub use password_reset::{
    LoggingMailer, PasswordResetConfig, PasswordResetError, PasswordResetService,
    PasswordResetStore, ResetMailer, ResetToken,
};
pub use platform::{normalize_handle, Platform};
pub use profile::{
    canonicalize_handles, ClaimedProfile, Handles, Profile, ProfileUpdate, Role,
    UserAccount,
};
pub use profile_notifier::{LoggingSink, NotificationSink, ProfileEvent, ProfileNotifier};
pub use profile_service::{ProfileError, ProfileService, RequestContext};
pub use profile_store::{InMemoryProfileStore, ProfileStore, StoreSnapshot};

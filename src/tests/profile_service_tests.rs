use crate::profile::{Handles, Profile, ProfileUpdate, Role, UserAccount};
use crate::profile_notifier::ProfileNotifier;
use crate::profile_service::{ProfileError, ProfileService, RequestContext};
use crate::profile_store::{InMemoryProfileStore, ProfileStore};
use std::sync::Arc;

fn handles(pairs: &[(&str, &str)]) -> Handles {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn create_test_service() -> (ProfileService, Arc<InMemoryProfileStore>, ProfileNotifier) {
    let store = InMemoryProfileStore::new();
    store.add_user(UserAccount::new("alice", "alice@club.edu", Role::Member));
    store.add_user(UserAccount::new("bob", "bob@club.edu", Role::Member));
    store.add_user(UserAccount::new("root", "admin@club.edu", Role::Admin));
    let store = Arc::new(store);

    let notifier = ProfileNotifier::new(16);
    let service = ProfileService::new(store.clone(), notifier.clone());
    (service, store, notifier)
}

fn with_handles(pairs: &[(&str, &str)]) -> ProfileUpdate {
    ProfileUpdate {
        handles: Some(handles(pairs)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_upsert_creates_profile() {
    let (service, store, notifier) = create_test_service();
    let ctx = RequestContext::member("alice");

    let saved = service
        .upsert_profile(
            &ctx,
            ProfileUpdate {
                name: Some("Alice".to_string()),
                year: Some(2),
                contact: Some("+91 98765-43210".to_string()),
                handles: Some(handles(&[("leetcode", "alice_lc")])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(saved.name, "Alice");
    assert_eq!(saved.year, Some(2));
    assert_eq!(store.get_profile("alice").await.unwrap(), Some(saved));
    assert_eq!(notifier.metrics().enqueued, 1);
    assert_eq!(service.get_profile(&ctx).await.unwrap().unwrap().name, "Alice");
}

#[tokio::test]
async fn test_member_cannot_change_leetcode_once_set() {
    let (service, _, _) = create_test_service();
    let ctx = RequestContext::member("alice");

    service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "alice_lc")]))
        .await
        .unwrap();
    let saved = service
        .upsert_profile(
            &ctx,
            with_handles(&[("LeetCode", "someone_else"), ("github", "alice-gh")]),
        )
        .await
        .unwrap();

    assert_eq!(
        saved.handles,
        handles(&[("github", "alice-gh"), ("leetcode", "alice_lc")])
    );
}

#[tokio::test]
async fn test_member_may_set_leetcode_when_empty() {
    let (service, _, _) = create_test_service();
    let ctx = RequestContext::member("alice");

    service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "")]))
        .await
        .unwrap();
    let saved = service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "alice_lc")]))
        .await
        .unwrap();

    assert_eq!(saved.handles.get("leetcode").map(String::as_str), Some("alice_lc"));
}

#[tokio::test]
async fn test_admin_upsert_may_change_own_leetcode() {
    let (service, _, _) = create_test_service();
    let ctx = RequestContext::admin("root");

    service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "old")]))
        .await
        .unwrap();
    let saved = service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "new")]))
        .await
        .unwrap();

    assert_eq!(saved.handles.get("leetcode").map(String::as_str), Some("new"));
}

#[tokio::test]
async fn test_duplicate_claims_reject_whole_write() {
    let (service, store, notifier) = create_test_service();

    service
        .upsert_profile(
            &RequestContext::member("alice"),
            ProfileUpdate {
                contact: Some("9876543210".to_string()),
                handles: Some(handles(&[("codeforces", "tourist")])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = service
        .upsert_profile(
            &RequestContext::member("bob"),
            ProfileUpdate {
                name: Some("Bob".to_string()),
                contact: Some("+91 98765 43210".to_string()),
                handles: Some(handles(&[
                    ("codeforces", "https://codeforces.com/profile/Tourist"),
                    ("myspace", "bob"),
                ])),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err {
        ProfileError::Validation(message) => assert_eq!(
            message,
            "codeforces handle \"tourist\" is already claimed by alice@club.edu; \
             Invalid platform: myspace; \
             Contact number is already registered with alice@club.edu"
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.get_profile("bob").await.unwrap(), None);
    assert_eq!(notifier.metrics().enqueued, 1);
}

#[tokio::test]
async fn test_resaving_own_values_is_allowed() {
    let (service, _, _) = create_test_service();
    let ctx = RequestContext::member("alice");
    let update = ProfileUpdate {
        contact: Some("9876543210".to_string()),
        linked_in: Some("https://linkedin.com/in/alice".to_string()),
        handles: Some(handles(&[("codeforces", "tourist")])),
        ..Default::default()
    };

    service.upsert_profile(&ctx, update.clone()).await.unwrap();
    service.upsert_profile(&ctx, update).await.unwrap();
}

#[tokio::test]
async fn test_admin_override_requires_admin() {
    let (service, _, _) = create_test_service();
    service
        .upsert_profile(&RequestContext::member("alice"), with_handles(&[]))
        .await
        .unwrap();

    let err = service
        .admin_update_handles(
            &RequestContext::member("bob"),
            "alice",
            handles(&[("leetcode", "x")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProfileError::Forbidden));
}

#[tokio::test]
async fn test_admin_override_replaces_locked_leetcode() {
    let (service, _, notifier) = create_test_service();
    service
        .upsert_profile(
            &RequestContext::member("alice"),
            with_handles(&[("leetcode", "typo_handle")]),
        )
        .await
        .unwrap();

    let saved = service
        .admin_update_handles(
            &RequestContext::admin("root"),
            "alice",
            handles(&[("leetcode", "alice_lc")]),
        )
        .await
        .unwrap();

    assert_eq!(saved.handles, handles(&[("leetcode", "alice_lc")]));
    assert_eq!(notifier.metrics().enqueued, 2);
}

#[tokio::test]
async fn test_admin_override_missing_profile() {
    let (service, _, _) = create_test_service();

    let err = service
        .admin_update_handles(&RequestContext::admin("root"), "bob", Handles::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProfileError::NotFound(ref id) if id == "bob"));
}

#[tokio::test]
async fn test_admin_override_still_checks_duplicates() {
    let (service, store, _) = create_test_service();
    service
        .upsert_profile(
            &RequestContext::member("alice"),
            with_handles(&[("github", "octocat")]),
        )
        .await
        .unwrap();
    service
        .upsert_profile(&RequestContext::member("bob"), with_handles(&[]))
        .await
        .unwrap();

    let err = service
        .admin_update_handles(
            &RequestContext::admin("root"),
            "bob",
            handles(&[("github", "https://github.com/OctoCat")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProfileError::Validation(_)));
    assert!(store.get_profile("bob").await.unwrap().unwrap().handles.is_empty());
}

#[tokio::test]
async fn test_mixed_case_key_blocks_lowercase_duplicate() {
    let (service, store, _) = create_test_service();
    let saved = service
        .upsert_profile(
            &RequestContext::member("alice"),
            with_handles(&[("LeetCode", "alice")]),
        )
        .await
        .unwrap();
    assert_eq!(saved.handles, handles(&[("leetcode", "alice")]));

    let err = service
        .upsert_profile(
            &RequestContext::member("bob"),
            with_handles(&[("leetcode", "alice")]),
        )
        .await
        .unwrap_err();

    match err {
        ProfileError::Validation(message) => assert_eq!(
            message,
            "leetcode handle \"alice\" is already claimed by alice@club.edu"
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.get_profile("bob").await.unwrap(), None);
}

#[tokio::test]
async fn test_mixed_case_key_is_still_locked() {
    let (service, _, _) = create_test_service();
    let ctx = RequestContext::member("alice");

    service
        .upsert_profile(&ctx, with_handles(&[("LeetCode", "alice")]))
        .await
        .unwrap();
    let saved = service
        .upsert_profile(&ctx, with_handles(&[("leetcode", "mallory")]))
        .await
        .unwrap();

    assert_eq!(saved.handles, handles(&[("leetcode", "alice")]));
}

#[tokio::test]
async fn test_lock_holds_for_legacy_mixed_case_profile() {
    let (service, store, _) = create_test_service();
    let mut legacy = Profile::new("alice");
    legacy.handles = handles(&[("LeetCode", "alice")]);
    store.save_profile(legacy).await.unwrap();

    let saved = service
        .upsert_profile(
            &RequestContext::member("alice"),
            with_handles(&[("LEETCODE", "mallory"), ("github", "alice-gh")]),
        )
        .await
        .unwrap();

    assert_eq!(
        saved.handles,
        handles(&[("github", "alice-gh"), ("leetcode", "alice")])
    );
}

#[tokio::test]
async fn test_admin_override_canonicalizes_keys() {
    let (service, _, _) = create_test_service();
    service
        .upsert_profile(&RequestContext::member("alice"), with_handles(&[]))
        .await
        .unwrap();

    let saved = service
        .admin_update_handles(
            &RequestContext::admin("root"),
            "alice",
            handles(&[("GitHub", "alice-gh")]),
        )
        .await
        .unwrap();

    assert_eq!(saved.handles, handles(&[("github", "alice-gh")]));
}

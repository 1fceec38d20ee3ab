use tokio::time::advance;

use super::*;
use crate::memory::{MemoryIdentityProvider, MemoryProfileStore, MemoryStorage};
use crate::types::{Identity, Profile, Role};

const INTERVAL: Duration = Duration::from_secs(1);

struct Harness {
    checker: AuthChecker,
    provider: MemoryIdentityProvider,
    store: MemoryProfileStore,
    storage: MemoryStorage,
}

fn harness(session: Option<Identity>) -> Harness {
    let provider = MemoryIdentityProvider::new(session);
    let store = MemoryProfileStore::new();
    let storage = MemoryStorage::new();
    let cache = SessionCache::new(Arc::new(storage.clone()), "authCache");
    let checker = AuthChecker::new(Arc::new(provider.clone()), Arc::new(store.clone()), cache, INTERVAL);
    Harness { checker, provider, store, storage }
}

fn alice() -> Identity {
    Identity::new("alice", Some("alice@example.com".into()))
}

// =============================================================================
// fresh checks
// =============================================================================

#[tokio::test(start_paused = true)]
async fn no_session_returns_signed_out_and_clears_cache() {
    let h = harness(None);
    h.storage.put_raw("authCache", "stale");
    let snapshot = h.checker.check_auth().await;
    assert_eq!(snapshot, SessionSnapshot::signed_out());
    assert!(h.storage.raw("authCache").is_none());
    assert_eq!(h.store.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_fetch_is_cached() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::Admin));

    let snapshot = h.checker.check_auth().await;
    assert_eq!(snapshot.role(), Some(Role::Admin));
    assert_eq!(h.checker.cache().read(), Some(snapshot));
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_yields_user_without_profile() {
    let h = harness(Some(alice()));
    h.store.fail_for("alice", true);

    let snapshot = h.checker.check_auth().await;
    assert_eq!(snapshot.user(), Some(&alice()));
    assert!(snapshot.profile().is_none());
    assert!(h.storage.raw("authCache").is_none());
}

#[tokio::test(start_paused = true)]
async fn fetch_failure_keeps_previous_cache_entry() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::User));
    h.checker.check_auth().await;

    advance(INTERVAL).await;
    h.store.fail_for("alice", true);
    let snapshot = h.checker.check_auth().await;

    assert!(snapshot.profile().is_none());
    assert_eq!(h.checker.cache().read().and_then(|s| s.role()), Some(Role::User));
}

#[tokio::test(start_paused = true)]
async fn missing_profile_document_is_not_cached() {
    let h = harness(Some(alice()));
    let snapshot = h.checker.check_auth().await;
    assert!(snapshot.is_signed_in());
    assert!(snapshot.profile().is_none());
    assert!(h.storage.raw("authCache").is_none());
}

// =============================================================================
// throttling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn second_check_within_interval_uses_cache() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::Admin));

    let first = h.checker.check_auth().await;
    advance(Duration::from_millis(500)).await;
    let second = h.checker.check_auth().await;

    assert_eq!(first, second);
    assert_eq!(h.store.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn check_within_interval_without_cache_fetches_again() {
    let h = harness(Some(alice()));
    h.store.fail_for("alice", true);
    h.checker.check_auth().await;

    h.store.fail_for("alice", false);
    h.store.insert("alice", Profile::with_role(Role::User));
    advance(Duration::from_millis(100)).await;
    let snapshot = h.checker.check_auth().await;

    assert_eq!(snapshot.role(), Some(Role::User));
    assert_eq!(h.store.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn check_after_interval_fetches_again() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::User));
    h.checker.check_auth().await;

    advance(INTERVAL).await;
    h.store.insert("alice", Profile::with_role(Role::Admin));
    let snapshot = h.checker.check_auth().await;

    assert_eq!(snapshot.role(), Some(Role::Admin));
    assert_eq!(h.store.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cache_hits_do_not_extend_the_window() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::User));
    h.checker.check_auth().await;

    advance(Duration::from_millis(600)).await;
    h.checker.check_auth().await;
    advance(Duration::from_millis(600)).await;
    h.checker.check_auth().await;

    assert_eq!(h.store.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn sign_out_is_seen_once_cache_is_cleared() {
    let h = harness(Some(alice()));
    h.store.insert("alice", Profile::with_role(Role::User));
    h.checker.check_auth().await;

    h.provider.set_session(None);
    h.checker.cache().clear();
    let snapshot = h.checker.check_auth().await;
    assert!(!snapshot.is_signed_in());
}

// =============================================================================
// sign-out during an in-flight lookup
// =============================================================================

/// Profile store whose lookups wait until the test opens the gate.
struct GatedStore {
    gate: Arc<tokio::sync::Notify>,
    profile: Profile,
}

#[async_trait::async_trait]
impl ProfileStore for GatedStore {
    async fn get_profile(&self, _user_id: &str) -> Result<Option<Profile>, crate::provider::StoreError> {
        self.gate.notified().await;
        Ok(Some(self.profile.clone()))
    }
}

#[tokio::test(start_paused = true)]
async fn sign_out_during_lookup_is_not_overwritten() {
    let provider = MemoryIdentityProvider::new(Some(alice()));
    let storage = MemoryStorage::new();
    let gate = Arc::new(tokio::sync::Notify::new());
    let store = GatedStore { gate: Arc::clone(&gate), profile: Profile::with_role(Role::Admin) };
    let cache = SessionCache::new(Arc::new(storage.clone()), "authCache");
    let checker = Arc::new(AuthChecker::new(Arc::new(provider.clone()), Arc::new(store), cache, INTERVAL));

    let in_flight = tokio::spawn({
        let checker = Arc::clone(&checker);
        async move { checker.check_auth().await }
    });
    crate::test_support::settle().await;

    provider.set_session(None);
    checker.cache().clear();
    gate.notify_one();
    let stale = in_flight.await.unwrap();
    assert!(stale.is_signed_in());

    assert!(storage.raw("authCache").is_none());
    let snapshot = checker.check_auth().await;
    assert!(!snapshot.is_signed_in());
    assert!(snapshot.role().is_none());
}

#[tokio::test(start_paused = true)]
async fn clear_during_lookup_drops_the_write_even_if_session_remains() {
    let provider = MemoryIdentityProvider::new(Some(alice()));
    let storage = MemoryStorage::new();
    let gate = Arc::new(tokio::sync::Notify::new());
    let store = GatedStore { gate: Arc::clone(&gate), profile: Profile::with_role(Role::User) };
    let cache = SessionCache::new(Arc::new(storage.clone()), "authCache");
    let checker = Arc::new(AuthChecker::new(Arc::new(provider), Arc::new(store), cache, INTERVAL));

    let in_flight = tokio::spawn({
        let checker = Arc::clone(&checker);
        async move { checker.check_auth().await }
    });
    crate::test_support::settle().await;

    checker.cache().clear();
    gate.notify_one();
    in_flight.await.unwrap();

    assert!(storage.raw("authCache").is_none());
}

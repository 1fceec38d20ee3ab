//! In-memory implementations of every external capability.
//!
//! Used by the simulator binary and the test-suite. All types are cheap to
//! clone and share state across clones.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::provider::{
    IdentityProvider, Navigator, ProfileStore, ProviderError, SessionEvents, SessionStorage, StorageError,
    StoreError,
};
use crate::types::{Identity, Profile};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

#[derive(Clone)]
pub struct MemoryIdentityProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    session: Mutex<Option<Identity>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
    available: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new(session: Option<Identity>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                session: Mutex::new(session),
                subscribers: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                fail_sign_out: AtomicBool::new(false),
            }),
        }
    }

    /// Replace the session and notify every live subscriber.
    pub fn set_session(&self, session: Option<Identity>) {
        *lock(&self.inner.session) = session.clone();
        self.emit(session);
    }

    /// Re-deliver the current session without changing it.
    pub fn emit_current(&self) {
        let session = lock(&self.inner.session).clone();
        self.emit(session);
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.inner.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Number of subscriptions whose receiver is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.inner.subscribers);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn emit(&self, session: Option<Identity>) {
        let mut subscribers = lock(&self.inner.subscribers);
        subscribers.retain(|tx| tx.send(session.clone()).is_ok());
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn current_session(&self) -> Option<Identity> {
        lock(&self.inner.session).clone()
    }

    fn subscribe(&self) -> Result<SessionEvents, ProviderError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        // Hold the session lock so a concurrent change cannot slip between
        // the initial delivery and registration.
        let session = lock(&self.inner.session);
        let _ = tx.send(session.clone());
        lock(&self.inner.subscribers).push(tx);
        Ok(rx)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if self.inner.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::SignOut("sign-out rejected".into()));
        }
        self.set_session(None);
        Ok(())
    }
}

// =============================================================================
// PROFILE STORE
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    profiles: Mutex<HashMap<String, Profile>>,
    failing: Mutex<HashSet<String>>,
    #[cfg(test)]
    panicking: AtomicBool,
    fetches: AtomicUsize,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: impl Into<String>, profile: Profile) {
        lock(&self.inner.profiles).insert(user_id.into(), profile);
    }

    pub fn remove(&self, user_id: &str) {
        lock(&self.inner.profiles).remove(user_id);
    }

    /// Make lookups for `user_id` fail (or succeed again).
    pub fn fail_for(&self, user_id: impl Into<String>, fail: bool) {
        let user_id = user_id.into();
        let mut failing = lock(&self.inner.failing);
        if fail {
            failing.insert(user_id);
        } else {
            failing.remove(&user_id);
        }
    }

    /// Make every lookup panic, simulating a broken backend binding.
    #[cfg(test)]
    pub(crate) fn panic_on_fetch(&self, panic: bool) {
        self.inner.panicking.store(panic, Ordering::SeqCst);
    }

    /// Number of lookups performed so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        #[cfg(test)]
        assert!(!self.inner.panicking.load(Ordering::SeqCst), "profile backend crashed");
        if lock(&self.inner.failing).contains(user_id) {
            return Err(StoreError::Backend(format!("lookup failed for {user_id}")));
        }
        Ok(lock(&self.inner.profiles).get(user_id).cloned())
    }
}

// =============================================================================
// SESSION STORAGE
// =============================================================================

#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    entries: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StorageInner { entries: Mutex::new(HashMap::new()), available: AtomicBool::new(true) }),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing availability.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.inner.entries).get(key).cloned()
    }

    /// Overwrite a raw value, bypassing availability.
    pub fn put_raw(&self, key: &str, value: &str) {
        lock(&self.inner.entries).insert(key.to_owned(), value.to_owned());
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(lock(&self.inner.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        lock(&self.inner.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        lock(&self.inner.entries).remove(key);
        Ok(())
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

/// Navigator that records navigations instead of unloading anything.
#[derive(Clone)]
pub struct RecordingNavigator {
    inner: Arc<NavigatorInner>,
}

struct NavigatorInner {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(NavigatorInner { current: Mutex::new(current.into()), history: Mutex::new(Vec::new()) }),
        }
    }

    /// Every path navigated to, oldest first.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.inner.history).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        lock(&self.inner.current).clone()
    }

    /// Records the navigation. The current path is left unchanged: a real
    /// navigation unloads the page, so nothing observes the new location.
    fn navigate_to(&self, path: &str) {
        lock(&self.inner.history).push(path.to_owned());
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

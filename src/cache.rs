//! Session cache: single-slot snapshot store in session-scoped storage.
//!
//! DESIGN
//! ======
//! No expiry: staleness is the throttle's concern, and the observer clears
//! the slot on sign-out. Storage and codec failures are logged and reported
//! as a miss; nothing here returns an error to callers.
//!
//! Every `clear` bumps a generation shared by all clones. A writer that
//! sampled the generation before awaiting a lookup uses `store_if_current`,
//! so a sign-out that lands mid-lookup is never overwritten.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::provider::{SessionStorage, StorageError};
use crate::types::SessionSnapshot;

#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("cache entry codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("cache entry has a profile without a user")]
    Inconsistent,
}

#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn SessionStorage>,
    key: String,
    generation: Arc<Mutex<u64>>,
}

impl SessionCache {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self { storage, key: key.into(), generation: Arc::new(Mutex::new(0)) }
    }

    /// Generation token; changes on every `clear`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `snapshot` only if no `clear` happened since `generation` was
    /// sampled. Returns whether it was written. Check and write happen under
    /// the generation lock, so a concurrent `clear` lands before or after.
    pub fn store_if_current(&self, generation: u64, snapshot: &SessionSnapshot) -> bool {
        let current = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != generation {
            debug!(key = %self.key, "session cache cleared during lookup, dropping write");
            return false;
        }
        self.store(snapshot);
        true
    }

    /// Persist `snapshot` for the rest of the browsing session.
    pub fn store(&self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.try_store(snapshot) {
            warn!(error = %e, key = %self.key, "session cache write failed");
        }
    }

    /// Cached snapshot, or `None` on a miss or any failure.
    #[must_use]
    pub fn read(&self) -> Option<SessionSnapshot> {
        match self.try_read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, key = %self.key, "session cache unreadable, treating as miss");
                None
            }
        }
    }

    pub fn clear(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        match self.storage.remove(&self.key) {
            Ok(()) => debug!(key = %self.key, "session cache cleared"),
            Err(e) => warn!(error = %e, key = %self.key, "session cache clear failed"),
        }
    }

    fn try_store(&self, snapshot: &SessionSnapshot) -> Result<(), CacheError> {
        let raw = serde_json::to_string(snapshot)?;
        self.storage.set(&self.key, &raw)?;
        Ok(())
    }

    fn try_read(&self) -> Result<Option<SessionSnapshot>, CacheError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = serde_json::from_str(&raw)?;
        if !snapshot.is_consistent() {
            return Err(CacheError::Inconsistent);
        }
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;

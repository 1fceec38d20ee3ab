//! Auth check throttle: deduplicates remote profile lookups.
//!
//! DESIGN
//! ======
//! A check inside the minimum interval of the previous one answers from the
//! session cache. On a cache miss it falls through to a fresh lookup rather
//! than waiting. Cache hits do not move the window; the timestamp is stamped
//! only when a lookup starts, and before it awaits, so a second caller
//! arriving mid-flight sees the window as taken.
//!
//! Lookup failures return the user without a profile and leave the cache
//! untouched; a transient error must not overwrite a good cached profile.
//! A successful lookup is cached only if the session is still the same one
//! and the cache was not cleared while the lookup was in flight.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::SessionCache;
use crate::provider::{IdentityProvider, ProfileStore};
use crate::types::SessionSnapshot;

pub struct AuthChecker {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    cache: SessionCache,
    min_interval: Duration,
    last_check: Mutex<Option<Instant>>,
}

impl AuthChecker {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        cache: SessionCache,
        min_interval: Duration,
    ) -> Self {
        Self { provider, profiles, cache, min_interval, last_check: Mutex::new(None) }
    }

    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Current session snapshot, fetched remotely only when needed.
    ///
    /// Never fails and never navigates.
    pub async fn check_auth(&self) -> SessionSnapshot {
        if self.within_interval() {
            if let Some(cached) = self.cache.read() {
                debug!("auth check throttled, serving cached snapshot");
                return cached;
            }
            debug!("auth check throttled but cache is empty, fetching");
        }
        *self.last_check.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        let Some(user) = self.provider.current_session() else {
            self.cache.clear();
            return SessionSnapshot::signed_out();
        };

        let generation = self.cache.generation();
        match self.profiles.get_profile(&user.id).await {
            Ok(Some(profile)) => {
                let snapshot = SessionSnapshot::signed_in(user, Some(profile));
                if self.session_unchanged(&snapshot) {
                    self.cache.store_if_current(generation, &snapshot);
                }
                snapshot
            }
            Ok(None) => {
                warn!(user_id = %user.id, "no profile document for signed-in user");
                SessionSnapshot::signed_in(user, None)
            }
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "profile fetch failed");
                SessionSnapshot::signed_in(user, None)
            }
        }
    }

    /// The provider still reports the identity the lookup was made for.
    fn session_unchanged(&self, snapshot: &SessionSnapshot) -> bool {
        let current = self.provider.current_session();
        let unchanged = current.as_ref().map(|u| &u.id) == snapshot.user().map(|u| &u.id);
        if !unchanged {
            debug!("session changed during profile lookup, not caching");
        }
        unchanged
    }

    fn within_interval(&self) -> bool {
        let last = *self.last_check.lock().unwrap_or_else(PoisonError::into_inner);
        last.is_some_and(|at| Instant::now().saturating_duration_since(at) < self.min_interval)
    }
}

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;

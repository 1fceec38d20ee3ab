//! Shared coordinator state and the redirect cooldown policy.
//!
//! DESIGN
//! ======
//! One `CoordinatorState` is created per page load and shared (`Arc`) by
//! the observer and the page guard. All flags flip synchronously before any
//! caller awaits, so two tasks interleaving at a suspension point cannot
//! both claim the first-run slot or both fire a redirect.
//!
//! Redirects are two-step: callers sample `can_redirect` up front, then
//! `try_claim_redirect` re-checks and stamps the timestamp under the lock
//! immediately before navigating.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::provider::Navigator;

pub struct CoordinatorState {
    /// True until the first session event has been seen.
    loading: AtomicBool,
    /// True once the one-time redirect decision has been claimed.
    has_run_once: AtomicBool,
    /// `None` until the first redirect of this page load.
    last_redirect: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl CoordinatorState {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            loading: AtomicBool::new(true),
            has_run_once: AtomicBool::new(false),
            last_redirect: Mutex::new(None),
            cooldown,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Mark loading finished. Returns true only for the call that flipped it.
    pub fn finish_loading(&self) -> bool {
        self.loading.swap(false, Ordering::SeqCst)
    }

    #[must_use]
    pub fn has_run_once(&self) -> bool {
        self.has_run_once.load(Ordering::SeqCst)
    }

    /// Claim the one-time redirect decision. Returns true exactly once.
    pub fn claim_first_run(&self) -> bool {
        !self.has_run_once.swap(true, Ordering::SeqCst)
    }

    /// Whether a redirect may fire now.
    #[must_use]
    pub fn can_redirect(&self) -> bool {
        let last = *self.last_redirect.lock().unwrap_or_else(PoisonError::into_inner);
        self.allows(last, Instant::now())
    }

    /// Re-check the policy and, if it passes, stamp the redirect time.
    pub fn try_claim_redirect(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_redirect.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.allows(*last, now) {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Stamp the redirect time without consulting the policy.
    pub fn record_redirect(&self) {
        *self.last_redirect.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Claim the redirect slot and navigate. Returns whether navigation happened.
    pub fn redirect(&self, navigator: &dyn Navigator, path: &str) -> bool {
        if !self.try_claim_redirect() {
            debug!(%path, "redirect suppressed by cooldown");
            return false;
        }
        info!(%path, "redirecting");
        navigator.navigate_to(path);
        true
    }

    fn allows(&self, last: Option<Instant>, now: Instant) -> bool {
        if self.is_loading() {
            return false;
        }
        last.is_none_or(|at| now.saturating_duration_since(at) > self.cooldown)
    }
}

#[cfg(test)]
#[path = "cooldown_test.rs"]
mod tests;

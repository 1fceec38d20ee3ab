//! Auth observer: the single subscription to session changes.
//!
//! ARCHITECTURE
//! ============
//! `initialize` subscribes once and spawns a pump task that handles events
//! in order. Each event ends loading, maintains the session cache, and the
//! first event of the page load also makes the one-time redirect decision.
//!
//! The first-run flag is claimed before the decision awaits anything, so an
//! event arriving while a profile fetch is in flight cannot start a second
//! decision. A panicking handler is caught at the pump boundary and the
//! subscription keeps running.
//!
//! `Subscription` owns the pump. Releasing it aborts the pump and drops the
//! event receiver, which is how the provider learns we unsubscribed.

use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cooldown::CoordinatorState;
use crate::pages::{Page, Routes};
use crate::provider::{IdentityProvider, Navigator, ProfileStore, SessionEvents};
use crate::throttle::AuthChecker;
use crate::types::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverPhase {
    Uninitialized,
    Subscribed,
    /// Terminal.
    CleanedUp,
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Live session subscription. Released exactly once, at the latest on drop.
pub struct Subscription {
    pump: Option<JoinHandle<()>>,
}

impl Subscription {
    fn new(pump: JoinHandle<()>) -> Self {
        Self { pump: Some(pump) }
    }

    /// Stop receiving events. Returns false if already released.
    pub fn release(&mut self) -> bool {
        match self.pump.take() {
            Some(pump) => {
                pump.abort();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.pump.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// EVENT HANDLER
// =============================================================================

#[derive(Clone)]
pub(crate) struct SessionEventHandler {
    pub(crate) state: Arc<CoordinatorState>,
    pub(crate) checker: Arc<AuthChecker>,
    pub(crate) profiles: Arc<dyn ProfileStore>,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) routes: Arc<Routes>,
}

impl SessionEventHandler {
    pub(crate) async fn handle(&self, session: Option<Identity>) {
        if self.state.finish_loading() {
            debug!(signed_in = session.is_some(), "first session event, loading finished");
        }

        match &session {
            None => self.checker.cache().clear(),
            Some(user) => {
                let checker = Arc::clone(&self.checker);
                debug!(user_id = %user.id, "warming session cache");
                tokio::spawn(async move {
                    checker.check_auth().await;
                });
            }
        }

        if !self.state.claim_first_run() {
            return;
        }
        if let Some(user) = session {
            self.initial_redirect(user).await;
        }
    }

    async fn initial_redirect(&self, user: Identity) {
        let path = self.navigator.current_path();
        match self.routes.classify(&path) {
            Page::Login => {
                if !self.state.can_redirect() {
                    return;
                }
                // First check of the page load: go straight to the store.
                match self.profiles.get_profile(&user.id).await {
                    Ok(Some(profile)) => {
                        self.state.redirect(&*self.navigator, self.routes.landing(profile.role));
                    }
                    Ok(None) => warn!(user_id = %user.id, "signed in on login page without a profile"),
                    Err(e) => warn!(error = %e, user_id = %user.id, "profile fetch failed on login page"),
                }
            }
            Page::RoleSpecific(expected) => {
                if !self.state.can_redirect() {
                    return;
                }
                let snapshot = self.checker.check_auth().await;
                if let Some(role) = snapshot.role().filter(|role| *role != expected) {
                    debug!(%role, %expected, "role does not match page");
                    self.state.redirect(&*self.navigator, self.routes.landing(role));
                }
            }
            Page::Other => {}
        }
    }
}

async fn pump(handler: SessionEventHandler, mut events: SessionEvents) {
    while let Some(session) = events.recv().await {
        if AssertUnwindSafe(handler.handle(session)).catch_unwind().await.is_err() {
            warn!("session event handler panicked");
        }
    }
    debug!("session event stream closed");
}

// =============================================================================
// OBSERVER
// =============================================================================

enum Slot {
    Uninitialized,
    Subscribed(Subscription),
    CleanedUp,
}

pub struct AuthObserver {
    provider: Arc<dyn IdentityProvider>,
    handler: SessionEventHandler,
    slot: Mutex<Slot>,
}

impl AuthObserver {
    pub(crate) fn new(provider: Arc<dyn IdentityProvider>, handler: SessionEventHandler) -> Self {
        Self { provider, handler, slot: Mutex::new(Slot::Uninitialized) }
    }

    #[must_use]
    pub fn phase(&self) -> ObserverPhase {
        match *self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Uninitialized => ObserverPhase::Uninitialized,
            Slot::Subscribed(_) => ObserverPhase::Subscribed,
            Slot::CleanedUp => ObserverPhase::CleanedUp,
        }
    }

    /// Subscribe to session changes. Idempotent; must run inside a tokio
    /// runtime. If the provider is unavailable the observer stays
    /// uninitialized and the call may be retried.
    pub fn initialize(&self) -> ObserverPhase {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Slot::Subscribed(_) => return ObserverPhase::Subscribed,
            Slot::CleanedUp => {
                debug!("observer already cleaned up, not resubscribing");
                return ObserverPhase::CleanedUp;
            }
            Slot::Uninitialized => {}
        }

        match self.provider.subscribe() {
            Ok(events) => {
                let pump = tokio::spawn(pump(self.handler.clone(), events));
                *slot = Slot::Subscribed(Subscription::new(pump));
                info!("auth observer subscribed");
                ObserverPhase::Subscribed
            }
            Err(e) => {
                warn!(error = %e, "auth observer not initialized");
                ObserverPhase::Uninitialized
            }
        }
    }

    /// Release the subscription and end loading. Idempotent; returns true
    /// only for the call that released a live subscription.
    pub fn cleanup(&self) -> bool {
        let previous = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *slot, Slot::CleanedUp)
        };
        self.handler.state.finish_loading();

        match previous {
            Slot::Subscribed(mut subscription) => {
                subscription.release();
                info!("auth observer cleaned up");
                true
            }
            Slot::Uninitialized | Slot::CleanedUp => false,
        }
    }
}

#[cfg(test)]
#[path = "observer_test.rs"]
mod tests;

//! Public entry point wiring all components for one page load.
//!
//! DESIGN
//! ======
//! `AuthCoordinator` owns the shared `CoordinatorState` and hands the same
//! instance to the observer and the page guard, so the redirect cooldown
//! and loading flag are one value for every call site. Clone is cheap and
//! every clone talks to the same state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::SessionCache;
use crate::config::CoordinatorConfig;
use crate::cooldown::CoordinatorState;
use crate::guard::{GuardOutcome, PageGuard};
use crate::observer::{AuthObserver, ObserverPhase, SessionEventHandler};
use crate::provider::{IdentityProvider, Navigator, ProfileStore, ProviderError, SessionStorage};
use crate::throttle::AuthChecker;
use crate::types::{Role, SessionSnapshot};

/// External capabilities a coordinator runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub storage: Arc<dyn SessionStorage>,
    pub navigator: Arc<dyn Navigator>,
}

#[derive(Clone)]
pub struct AuthCoordinator {
    state: Arc<CoordinatorState>,
    checker: Arc<AuthChecker>,
    observer: Arc<AuthObserver>,
    guard: PageGuard,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    config: Arc<CoordinatorConfig>,
}

impl AuthCoordinator {
    #[must_use]
    pub fn new(config: CoordinatorConfig, collaborators: Collaborators) -> Self {
        let Collaborators { provider, profiles, storage, navigator } = collaborators;
        let routes = Arc::new(config.routes.clone());
        let state = Arc::new(CoordinatorState::new(config.redirect_cooldown));
        let cache = SessionCache::new(storage, config.cache_key.clone());
        let checker = Arc::new(AuthChecker::new(
            Arc::clone(&provider),
            Arc::clone(&profiles),
            cache,
            config.min_check_interval,
        ));

        let handler = SessionEventHandler {
            state: Arc::clone(&state),
            checker: Arc::clone(&checker),
            profiles,
            navigator: Arc::clone(&navigator),
            routes: Arc::clone(&routes),
        };
        let observer = Arc::new(AuthObserver::new(Arc::clone(&provider), handler));
        let guard = PageGuard::new(Arc::clone(&state), Arc::clone(&checker), Arc::clone(&navigator), routes);

        Self { state, checker, observer, guard, provider, navigator, config: Arc::new(config) }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Start observing session changes. See [`AuthObserver::initialize`].
    pub fn initialize(&self) -> ObserverPhase {
        self.observer.initialize()
    }

    #[must_use]
    pub fn observer_phase(&self) -> ObserverPhase {
        self.observer.phase()
    }

    /// True until the first session event arrives or `cleanup` runs.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Release the session subscription. Safe to call any number of times.
    pub fn cleanup(&self) -> bool {
        self.observer.cleanup()
    }

    /// Current session snapshot, throttled and cached.
    pub async fn check_auth(&self) -> SessionSnapshot {
        self.checker.check_auth().await
    }

    /// Require `role` on the current page.
    pub async fn check_user_type(&self, role: Role) -> GuardOutcome {
        self.guard.check_user_type(role).await
    }

    /// Sign out, then go to the login page.
    ///
    /// # Errors
    ///
    /// Returns the provider error if sign-out fails; no navigation happens.
    pub async fn logout(&self) -> Result<(), ProviderError> {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "logout failed");
            return Err(e);
        }
        self.checker.cache().clear();
        self.state.record_redirect();
        let login = self.config.routes.login();
        info!(path = %login, "signed out, redirecting to login");
        self.navigator.navigate_to(login);
        Ok(())
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

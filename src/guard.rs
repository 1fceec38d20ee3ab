//! Page guard: on-demand "this page requires role R" check.
//!
//! A missing session or profile sends the browser to login. A mismatched
//! role sends it to the landing page of the role it actually has. Both are
//! gated by the shared redirect cooldown. A collaborator panic while
//! resolving the session counts as "no session".

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::cooldown::CoordinatorState;
use crate::pages::{Page, Routes};
use crate::provider::Navigator;
use crate::throttle::AuthChecker;
use crate::types::{Role, SessionSnapshot};

/// Outcome of a page guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Current page is the login page; nothing checked.
    LoginPage,
    /// Signed in with the required role.
    Allowed,
    /// Navigated away to this path.
    Redirected(String),
    /// A redirect was warranted but the cooldown (or loading) held it back.
    Suppressed,
}

#[derive(Clone)]
pub struct PageGuard {
    state: Arc<CoordinatorState>,
    checker: Arc<AuthChecker>,
    navigator: Arc<dyn Navigator>,
    routes: Arc<Routes>,
}

impl PageGuard {
    pub(crate) fn new(
        state: Arc<CoordinatorState>,
        checker: Arc<AuthChecker>,
        navigator: Arc<dyn Navigator>,
        routes: Arc<Routes>,
    ) -> Self {
        Self { state, checker, navigator, routes }
    }

    /// Assert the signed-in identity has `required` role, redirecting if not.
    pub async fn check_user_type(&self, required: Role) -> GuardOutcome {
        let path = self.navigator.current_path();
        if self.routes.classify(&path) == Page::Login {
            return GuardOutcome::LoginPage;
        }

        // Sampled before resolving; `redirect` re-checks when navigating.
        let can_redirect = self.state.can_redirect();

        let snapshot = match AssertUnwindSafe(self.checker.check_auth()).catch_unwind().await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!(%required, "auth check panicked, treating as signed out");
                SessionSnapshot::signed_out()
            }
        };

        let target = match snapshot.role() {
            None => self.routes.login(),
            Some(role) if role == required => return GuardOutcome::Allowed,
            Some(role) => {
                debug!(%role, %required, "role mismatch");
                self.routes.landing(role)
            }
        };

        if can_redirect && self.state.redirect(&*self.navigator, target) {
            GuardOutcome::Redirected(target.to_owned())
        } else {
            debug!(%target, "page guard redirect suppressed");
            GuardOutcome::Suppressed
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

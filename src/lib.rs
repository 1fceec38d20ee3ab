//! # rolegate
//!
//! Client-side auth-state coordinator. Observes an identity provider's
//! session events, caches the resolved profile for the browsing session, and
//! redirects pages so signed-in users land on the page for their role while
//! signed-out or mismatched users go to login, without redirect loops or
//! redundant profile lookups.
//!
//! This is a navigation convenience layer, not an access-control boundary.
//!
//! Components, leaf first: `cache` (session cache), `throttle` (auth check
//! throttle), `cooldown` (shared state and redirect cooldown), `observer`
//! (session subscription and one-time redirect), `guard` (page guard).
//! `coordinator` wires them; `memory` provides in-memory collaborators.

pub mod cache;
pub mod config;
pub mod cooldown;
pub mod coordinator;
pub mod guard;
pub mod memory;
pub mod observer;
pub mod pages;
pub mod provider;
pub mod throttle;
pub mod types;

pub use config::CoordinatorConfig;
pub use coordinator::{AuthCoordinator, Collaborators};
pub use guard::GuardOutcome;
pub use observer::ObserverPhase;
pub use types::{Identity, Profile, Role, SessionSnapshot};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::coordinator::{AuthCoordinator, Collaborators};
    use crate::config::CoordinatorConfig;
    use crate::memory::{MemoryIdentityProvider, MemoryProfileStore, MemoryStorage, RecordingNavigator};
    use crate::types::{Identity, Profile, Role};

    pub(crate) struct World {
        pub provider: MemoryIdentityProvider,
        pub store: MemoryProfileStore,
        pub storage: MemoryStorage,
        pub navigator: RecordingNavigator,
    }

    impl World {
        pub(crate) fn new(path: &str, session: Option<Identity>) -> Self {
            Self {
                provider: MemoryIdentityProvider::new(session),
                store: MemoryProfileStore::new(),
                storage: MemoryStorage::new(),
                navigator: RecordingNavigator::new(path),
            }
        }

        /// World with `user_id` signed in and holding `role`.
        pub(crate) fn signed_in(path: &str, user_id: &str, role: Role) -> Self {
            let world = Self::new(path, Some(Identity::new(user_id, None)));
            world.store.insert(user_id, Profile::with_role(role));
            world
        }

        pub(crate) fn collaborators(&self) -> Collaborators {
            Collaborators {
                provider: Arc::new(self.provider.clone()),
                profiles: Arc::new(self.store.clone()),
                storage: Arc::new(self.storage.clone()),
                navigator: Arc::new(self.navigator.clone()),
            }
        }

        pub(crate) fn coordinator(&self) -> AuthCoordinator {
            AuthCoordinator::new(CoordinatorConfig::default(), self.collaborators())
        }
    }

    /// Let spawned tasks run until they block.
    pub(crate) async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }
}

//! Capabilities the coordinator depends on but does not implement.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider, the profile store, session-scoped storage and
//! page navigation are all external. Each is a trait object so a browser
//! binding, a remote backend or the in-memory fakes in `memory` can be
//! swapped in without touching coordinator logic.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{Identity, Profile};

/// Stream of session changes. Yields the current session first, then one
/// item per sign-in or sign-out. Dropping it unsubscribes.
pub type SessionEvents = mpsc::UnboundedReceiver<Option<Identity>>;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider is not available")]
    Unavailable,
    #[error("sign-out failed: {0}")]
    SignOut(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile store is not available")]
    Unavailable,
    #[error("profile store error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage is not available")]
    Unavailable,
    #[error("session storage error: {0}")]
    Backend(String),
}

// =============================================================================
// CAPABILITIES
// =============================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session known to the provider right now, without network I/O.
    fn current_session(&self) -> Option<Identity>;

    /// Subscribe to session changes.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the provider has not loaded yet.
    fn subscribe(&self) -> Result<SessionEvents, ProviderError>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the sign-out.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile document keyed by identity id. `Ok(None)` means the
    /// document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;
}

/// Session-scoped string key-value storage.
pub trait SessionStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Page location and navigation.
pub trait Navigator: Send + Sync {
    /// Path of the page currently loaded.
    fn current_path(&self) -> String;

    /// Leave the current page for `path`. Unconditional.
    fn navigate_to(&self, path: &str);
}

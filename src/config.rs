//! Coordinator configuration loaded from environment.
//!
//! Every value has a default; unset or unparsable variables fall back to it.

use std::time::Duration;

use crate::pages::Routes;

const DEFAULT_MIN_CHECK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_REDIRECT_COOLDOWN_MS: u64 = 2_000;
const DEFAULT_CACHE_KEY: &str = "authCache";

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_USER_PATH: &str = "/user";
const DEFAULT_ADMIN_PATH: &str = "/admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Minimum time between remote profile lookups.
    pub min_check_interval: Duration,
    /// Minimum time between redirects.
    pub redirect_cooldown: Duration,
    /// Session-storage key of the single cache slot.
    pub cache_key: String,
    pub routes: Routes,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_check_interval: Duration::from_millis(DEFAULT_MIN_CHECK_INTERVAL_MS),
            redirect_cooldown: Duration::from_millis(DEFAULT_REDIRECT_COOLDOWN_MS),
            cache_key: DEFAULT_CACHE_KEY.to_owned(),
            routes: Routes::new(DEFAULT_LOGIN_PATH, DEFAULT_USER_PATH, DEFAULT_ADMIN_PATH),
        }
    }
}

impl CoordinatorConfig {
    /// Load from `ROLEGATE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_ms = parse_or(&lookup, "ROLEGATE_MIN_CHECK_INTERVAL_MS", DEFAULT_MIN_CHECK_INTERVAL_MS);
        let cooldown_ms = parse_or(&lookup, "ROLEGATE_REDIRECT_COOLDOWN_MS", DEFAULT_REDIRECT_COOLDOWN_MS);
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        Self {
            min_check_interval: Duration::from_millis(interval_ms),
            redirect_cooldown: Duration::from_millis(cooldown_ms),
            cache_key: text("ROLEGATE_CACHE_KEY", DEFAULT_CACHE_KEY),
            routes: Routes::new(
                text("ROLEGATE_LOGIN_PATH", DEFAULT_LOGIN_PATH),
                text("ROLEGATE_USER_PATH", DEFAULT_USER_PATH),
                text("ROLEGATE_ADMIN_PATH", DEFAULT_ADMIN_PATH),
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

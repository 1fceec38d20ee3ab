//! Page classification from the URL path.

use crate::types::Role;

/// What kind of page the browser is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    /// Page that requires the signed-in identity to carry this role.
    RoleSpecific(Role),
    Other,
}

/// Landing paths for login and each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    login: String,
    user: String,
    admin: String,
}

impl Routes {
    #[must_use]
    pub fn new(login: impl Into<String>, user: impl Into<String>, admin: impl Into<String>) -> Self {
        Self { login: login.into(), user: user.into(), admin: admin.into() }
    }

    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Landing page for `role`.
    #[must_use]
    pub fn landing(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin,
            Role::User => &self.user,
        }
    }

    /// Classify `path`. Query strings, fragments, trailing slashes and an
    /// `.html` suffix are ignored; otherwise the whole path must equal the
    /// route, so `/admin/user` is neither the admin nor the user page.
    #[must_use]
    pub fn classify(&self, path: &str) -> Page {
        let path = normalize(path);
        if path.is_empty() {
            return Page::Other;
        }
        let matches = |route: &str| {
            let route = normalize(route);
            !route.is_empty() && path == route
        };

        if matches(&self.login) {
            Page::Login
        } else if matches(&self.admin) {
            Page::RoleSpecific(Role::Admin)
        } else if matches(&self.user) {
            Page::RoleSpecific(Role::User)
        } else {
            Page::Other
        }
    }
}

/// Reduce a path to `/segment/...` form without query, fragment, trailing
/// slash or `.html` suffix. The root path normalizes to the empty string.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim().trim_end_matches('/');
    let path = path.strip_suffix(".html").unwrap_or(path);
    if path.is_empty() {
        return String::new();
    }
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;

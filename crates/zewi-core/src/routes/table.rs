use serde::{Deserialize, Serialize};

pub const LANDING_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const STATE_PATH: &str = "/state";
pub const PROFILE_PATH: &str = "/profile";
pub const NOT_FOUND_PATH: &str = "/404";
pub const SERVER_ERROR_PATH: &str = "/500";

/// Access policy declared by a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePolicy {
    Public,
    RequiresAuth,
    RequiresGuest,
    /// Not-found and server-error pages, reachable in any session state.
    ErrorPage,
}

impl RoutePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            RoutePolicy::Public => "public",
            RoutePolicy::RequiresAuth => "requires-auth",
            RoutePolicy::RequiresGuest => "requires-guest",
            RoutePolicy::ErrorPage => "error-page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub path: String,
    pub policy: RoutePolicy,
}

impl Route {
    pub fn new(name: impl Into<String>, path: impl Into<String>, policy: RoutePolicy) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            policy,
        }
    }
}

/// Exact-path route table with a catch-all fallback.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    fallback: Route,
}

impl RouteTable {
    pub fn new(fallback: Route) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn with(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Route for `path`, ignoring query, fragment and trailing slash.
    /// Unknown paths resolve to the fallback.
    pub fn resolve(&self, path: &str) -> &Route {
        let path = normalize(path);
        self.routes
            .iter()
            .find(|r| r.path == path)
            .unwrap_or(&self.fallback)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn fallback(&self) -> &Route {
        &self.fallback
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::new(Route::new("NotFound", NOT_FOUND_PATH, RoutePolicy::ErrorPage))
            .with(Route::new("Landing", LANDING_PATH, RoutePolicy::Public))
            .with(Route::new("Login", LOGIN_PATH, RoutePolicy::RequiresGuest))
            .with(Route::new("State", STATE_PATH, RoutePolicy::RequiresAuth))
            .with(Route::new("Profile", PROFILE_PATH, RoutePolicy::RequiresAuth))
            .with(Route::new("NotFound", NOT_FOUND_PATH, RoutePolicy::ErrorPage))
            .with(Route::new("ServerError", SERVER_ERROR_PATH, RoutePolicy::ErrorPage))
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        LANDING_PATH
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact_and_normalized() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/state").name, "State");
        assert_eq!(table.resolve("/state/").name, "State");
        assert_eq!(table.resolve("/state?tab=2#top").name, "State");
        assert_eq!(table.resolve("").name, "Landing");
        assert_eq!(table.resolve("/").name, "Landing");
    }

    #[test]
    fn test_unknown_path_falls_back_to_not_found() {
        let table = RouteTable::default();
        let route = table.resolve("/buckets/42/files");
        assert_eq!(route.name, "NotFound");
        assert_eq!(route.policy, RoutePolicy::ErrorPage);
    }

    #[test]
    fn test_policy_labels() {
        assert_eq!(RoutePolicy::RequiresAuth.label(), "requires-auth");
        assert_eq!(RoutePolicy::ErrorPage.label(), "error-page");
    }
}

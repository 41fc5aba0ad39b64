//! Policy gate evaluated before each route transition.
//!
//! The guard only decides; performing the transition is up to the caller.
//! It waits for the session's initial auth check through the session's
//! watch channel, so a protected route is never evaluated against the
//! unverified snapshot.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::table::{Route, RoutePolicy, RouteTable, LOGIN_PATH, SERVER_ERROR_PATH, STATE_PATH};
use crate::api::gateway::AuthGateway;
use crate::auth::session::{Session, SessionStore};
use crate::auth::snapshot::PersistenceAdapter;
use crate::config::Config;

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
    /// Stay where we are (navigation aborted, or readiness timed out on a
    /// non-error route).
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login_path: String,
    /// Where authenticated users land when they hit a guest-only page.
    pub home_path: String,
    pub error_path: String,
    /// `None` waits for initialization indefinitely.
    pub init_timeout: Option<Duration>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_string(),
            home_path: STATE_PATH.to_string(),
            error_path: SERVER_ERROR_PATH.to_string(),
            init_timeout: None,
        }
    }
}

impl From<&Config> for GuardConfig {
    fn from(config: &Config) -> Self {
        Self {
            init_timeout: config.init_timeout(),
            ..Self::default()
        }
    }
}

#[derive(Error, Debug)]
enum GuardError {
    #[error("session closed before initialization completed")]
    SessionClosed,

    #[error("session not initialized after {0:?}")]
    TimedOut(Duration),
}

pub struct NavigationGuard {
    session: watch::Receiver<Session>,
    config: GuardConfig,
}

impl NavigationGuard {
    pub fn new(session: watch::Receiver<Session>, config: GuardConfig) -> Self {
        Self { session, config }
    }

    pub fn for_store<G: AuthGateway, P: PersistenceAdapter>(
        store: &SessionStore<G, P>,
        config: GuardConfig,
    ) -> Self {
        Self::new(store.subscribe(), config)
    }

    /// Decide whether navigation to `route` may proceed. Never fails:
    /// internal errors redirect to the error page.
    pub async fn resolve(&self, route: &Route) -> Decision {
        match self.try_resolve(route).await {
            Ok(decision) => decision,
            Err(GuardError::TimedOut(waited)) if route.policy == RoutePolicy::ErrorPage => {
                debug!(route = %route.name, ?waited, "Auth check still pending, error page allowed");
                Decision::Allow
            }
            Err(GuardError::TimedOut(waited)) => {
                warn!(route = %route.name, ?waited, "Auth check still pending, blocking navigation");
                Decision::Block
            }
            Err(e) => {
                error!(error = %e, route = %route.name, "Navigation failed");
                Decision::Redirect(self.config.error_path.clone())
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but gives up with
    /// [`Decision::Block`] as soon as `abort` completes.
    pub async fn resolve_until<F>(&self, route: &Route, abort: F) -> Decision
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            decision = self.resolve(route) => decision,
            () = abort => {
                debug!(route = %route.name, "Navigation aborted");
                Decision::Block
            }
        }
    }

    /// Look `path` up in `table` and resolve it.
    pub async fn navigate<'t>(&self, table: &'t RouteTable, path: &str) -> (&'t Route, Decision) {
        let route = table.resolve(path);
        let decision = self.resolve(route).await;
        (route, decision)
    }

    async fn try_resolve(&self, route: &Route) -> Result<Decision, GuardError> {
        let session = self.ready_session().await?;
        let decision = evaluate(route.policy, session.is_authenticated(), &self.config);
        debug!(
            route = %route.name,
            policy = route.policy.label(),
            authenticated = session.is_authenticated(),
            ?decision,
            "Navigation resolved"
        );
        Ok(decision)
    }

    /// Session state once initialization has completed.
    async fn ready_session(&self) -> Result<Session, GuardError> {
        let mut rx = self.session.clone();
        let wait = async move {
            rx.wait_for(|s| s.initialized)
                .await
                .map(|s| Session::clone(&s))
                .map_err(|_| GuardError::SessionClosed)
        };

        match self.config.init_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| GuardError::TimedOut(limit))?,
            None => wait.await,
        }
    }
}

/// Pure policy check against an initialized session.
pub fn evaluate(policy: RoutePolicy, authenticated: bool, config: &GuardConfig) -> Decision {
    match policy {
        RoutePolicy::ErrorPage | RoutePolicy::Public => Decision::Allow,
        RoutePolicy::RequiresAuth if !authenticated => Decision::Redirect(config.login_path.clone()),
        RoutePolicy::RequiresGuest if authenticated => Decision::Redirect(config.home_path.clone()),
        RoutePolicy::RequiresAuth | RoutePolicy::RequiresGuest => Decision::Allow,
    }
}

//! Session lifecycle: who is logged in, and whether the server has said so.
//!
//! The store starts from the persisted snapshot (unverified), runs one
//! "who am I" check against the server, and from then on tracks login,
//! logout and profile updates. `initialized` flips to true exactly once,
//! when the first check settles or a login succeeds.
//!
//! All state lives behind a `tokio::sync::watch` channel, so readers get a
//! consistent snapshot and can subscribe to changes. Mutations never hold
//! a lock across an await point.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::gateway::{AuthGateway, LoginResponse};
use crate::api::ApiError;
use crate::auth::snapshot::PersistenceAdapter;
use crate::config::{Config, ProfileSyncMode};
use crate::models::{Credentials, ProfileUpdate, UserProfile};

/// Returned by `update_profile` when nobody is logged in.
pub const NOT_AUTHENTICATED: &str = "not authenticated";

/// Fallback message for a failed profile update.
const PROFILE_UPDATE_FAILED: &str = "Profile update failed";

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub error: Option<String>,
    pub initialized: bool,
    in_flight: usize,
}

impl Session {
    /// True while at least one action is outstanding.
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_authenticated(&self) -> bool {
        self.initialized && self.user.is_some()
    }

    pub fn is_initializing(&self) -> bool {
        !self.initialized
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

/// Outcome of a user-facing action. Failures carry the inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub profile_sync: ProfileSyncMode,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            profile_sync: config.profile_sync,
        }
    }
}

type SharedCheck = Shared<BoxFuture<'static, ()>>;
type SharedLogin = Shared<BoxFuture<'static, ActionResult>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks an action as in flight for as long as it is alive. Dropping it,
/// including when the owning future is cancelled, ends the action.
struct LoadingGuard {
    state: Arc<watch::Sender<Session>>,
}

impl LoadingGuard {
    fn begin(state: &Arc<watch::Sender<Session>>) -> Self {
        state.send_modify(|s| s.in_flight += 1);
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state
            .send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

struct Inner<G, P> {
    gateway: G,
    persistence: P,
    config: SessionConfig,
    state: Arc<watch::Sender<Session>>,
    /// Advanced by every login and logout. Background work started in an
    /// older epoch must not overwrite the user.
    epoch: AtomicU64,
    check_in_flight: Mutex<Option<WeakShared<BoxFuture<'static, ()>>>>,
    logins_in_flight: Mutex<Vec<(Credentials, WeakShared<BoxFuture<'static, ActionResult>>)>>,
}

/// Handle to the application's session. Cloning shares the same session.
pub struct SessionStore<G, P> {
    inner: Arc<Inner<G, P>>,
}

impl<G, P> Clone for SessionStore<G, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: AuthGateway, P: PersistenceAdapter> SessionStore<G, P> {
    /// Create a store seeded from the persisted snapshot. No remote call is
    /// made; see [`SessionStore::start`].
    pub fn new(gateway: G, persistence: P, config: SessionConfig) -> Self {
        let user = persistence.load();
        debug!(has_snapshot = user.is_some(), "Session seeded from snapshot");

        let (state, _) = watch::channel(Session {
            user,
            ..Session::default()
        });

        Self {
            inner: Arc::new(Inner {
                gateway,
                persistence,
                config,
                state: Arc::new(state),
                epoch: AtomicU64::new(0),
                check_in_flight: Mutex::new(None),
                logins_in_flight: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create the store and launch the initialization check in the
    /// background. Must be called from within a tokio runtime.
    pub fn start(gateway: G, persistence: P, config: SessionConfig) -> Self {
        let store = Self::new(gateway, persistence, config);
        tokio::spawn(store.check_future());
        store
    }

    // ===== Getters =====

    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_initializing(&self) -> bool {
        self.inner.state.borrow().is_initializing()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn persistence(&self) -> &P {
        &self.inner.persistence
    }

    /// Resolves once the first auth check (or a login) has settled.
    /// Returns immediately when already initialized. Drop the future to
    /// stop waiting.
    pub async fn wait_until_initialized(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| s.initialized).await;
    }

    // ===== Actions =====

    /// Ask the server who we are. Never fails: any error, including an
    /// unauthenticated response, leaves the session logged out. Always
    /// marks the session initialized. Concurrent calls share one request.
    pub async fn check_auth(&self) {
        self.check_future().await
    }

    /// Log in. Failures are reported in the result and in `error`; the
    /// current user is left untouched. Concurrent calls with identical
    /// credentials share one request, different credentials race and the
    /// last one to resolve wins.
    pub async fn login(&self, credentials: Credentials) -> ActionResult {
        self.login_future(credentials).await
    }

    /// Log out. The local session and snapshot are cleared when this is
    /// called, before the returned future is polled; the future only
    /// performs the remote call, whose failure is logged and ignored.
    pub fn logout(&self) -> impl Future<Output = ()> + Send + 'static {
        let inner = &self.inner;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        inner.persistence.save(None);
        inner.state.send_modify(|s| {
            s.user = None;
            s.error = None;
        });
        info!("Logged out locally");

        let loading = LoadingGuard::begin(&inner.state);
        let inner = Arc::clone(inner);
        async move {
            let _loading = loading;
            match inner.gateway.logout().await {
                Ok(()) => debug!("Server session closed"),
                Err(e) => error!(error = %e, "Logout API error"),
            }
        }
    }

    /// Merge `update` into the current user optimistically, then confirm
    /// with the server. On failure the previous user is restored.
    pub async fn update_profile(&self, update: ProfileUpdate) -> ActionResult {
        let inner = &self.inner;
        let current = inner.state.borrow().user.clone();
        let Some(previous) = current else {
            return ActionResult::failed(NOT_AUTHENTICATED);
        };

        let epoch = inner.epoch.load(Ordering::SeqCst);
        let merged = previous.merged(&update);
        inner.persistence.save(Some(&merged));
        inner.state.send_modify(|s| {
            s.user = Some(merged);
            s.error = None;
        });

        let _loading = LoadingGuard::begin(&inner.state);
        let result = match inner.config.profile_sync {
            ProfileSyncMode::Remote => inner.gateway.update_profile(&update).await,
            ProfileSyncMode::LocalOnly => Ok(()),
        };

        match result {
            Ok(()) => {
                debug!(fields = update.fields().len(), "Profile updated");
                ActionResult::ok()
            }
            Err(e) => {
                let message = profile_error_message(&e);
                warn!(error = %e, "Profile update failed, rolling back");
                let unchanged = inner.epoch.load(Ordering::SeqCst) == epoch;
                if unchanged {
                    inner.persistence.save(Some(&previous));
                }
                inner.state.send_modify(|s| {
                    if unchanged {
                        s.user = Some(previous);
                    }
                    s.error = Some(message.clone());
                });
                if !unchanged {
                    debug!("Session changed during profile update, rollback skipped");
                }
                ActionResult::failed(message)
            }
        }
    }

    // ===== Single-flight plumbing =====

    fn check_future(&self) -> SharedCheck {
        let mut slot = lock(&self.inner.check_in_flight);
        if let Some(running) = slot.as_ref().and_then(WeakShared::upgrade) {
            debug!("Joining in-flight auth check");
            return running;
        }

        let inner = Arc::clone(&self.inner);
        let check = async move { inner.run_check().await }.boxed().shared();
        *slot = check.downgrade();
        check
    }

    fn login_future(&self, credentials: Credentials) -> SharedLogin {
        let mut logins = lock(&self.inner.logins_in_flight);
        logins.retain(|(_, weak)| weak.upgrade().is_some());
        if let Some(running) = logins
            .iter()
            .find(|(c, _)| *c == credentials)
            .and_then(|(_, weak)| weak.upgrade())
        {
            debug!(email = %credentials.email, "Joining in-flight login");
            return running;
        }

        let inner = Arc::clone(&self.inner);
        let key = credentials.clone();
        let login = async move { inner.run_login(credentials).await }
            .boxed()
            .shared();
        if let Some(weak) = login.downgrade() {
            logins.push((key, weak));
        }
        login
    }
}

impl<G: AuthGateway, P: PersistenceAdapter> Inner<G, P> {
    async fn run_check(&self) {
        let first = !self.state.borrow().initialized;
        let _loading = first.then(|| LoadingGuard::begin(&self.state));
        let epoch = self.epoch.load(Ordering::SeqCst);

        let user = match self.gateway.get_profile().await {
            Ok(response) => response.user,
            Err(e) if e.is_unauthorized() => {
                debug!("Session invalid or expired");
                None
            }
            Err(e) => {
                warn!(error = %e, "Auth check failed");
                None
            }
        };

        let current = self.epoch.load(Ordering::SeqCst) == epoch;
        if current {
            self.persistence.save(user.as_ref());
        } else {
            debug!("Login or logout happened during auth check, result discarded");
        }
        let authenticated = user.is_some();
        self.state.send_modify(|s| {
            if current {
                s.user = user;
            }
            s.initialized = true;
        });
        *lock(&self.check_in_flight) = None;
        debug!(authenticated, applied = current, "Auth check settled");
    }

    async fn run_login(&self, credentials: Credentials) -> ActionResult {
        let _loading = LoadingGuard::begin(&self.state);
        self.state.send_modify(|s| s.error = None);

        let result = self
            .gateway
            .login(&credentials)
            .await
            .and_then(LoginResponse::into_user);
        lock(&self.logins_in_flight).retain(|(c, _)| *c != credentials);

        match result {
            Ok(user) => {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.persistence.save(Some(&user));
                info!(user = %user.display_name(), "Login successful");
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.initialized = true;
                });
                ActionResult::ok()
            }
            Err(e) => {
                let message = e.user_message();
                error!(error = %e, email = %credentials.email, "Login failed");
                self.state.send_modify(|s| s.error = Some(message.clone()));
                ActionResult::failed(message)
            }
        }
    }
}

fn profile_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Server { message, .. } if !message.is_empty() => message.clone(),
        _ => PROFILE_UPDATE_FAILED.to_string(),
    }
}

//! zewi core - client-side session lifecycle for the zewi admin frontend.
//!
//! The application creates one [`SessionStore`] at startup and hands clones
//! of it (and a [`NavigationGuard`] subscribed to it) to whatever needs the
//! session. There is no global state.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;

#[cfg(test)]
mod testing;

pub use api::{ApiError, AuthGateway, HttpAuthGateway};
pub use auth::{
    ActionResult, FileSnapshotStore, MemorySnapshotStore, PersistenceAdapter, Session,
    SessionConfig, SessionStore,
};
pub use config::{Config, ProfileSyncMode};
pub use models::{Credentials, ProfileUpdate, UserProfile};
pub use routes::{Decision, GuardConfig, NavigationGuard, Route, RoutePolicy, RouteTable};

//! Authentication module for the client-side session lifecycle.
//!
//! This module provides:
//! - `SessionStore`: session state machine (login, logout, auth check, profile updates)
//! - `PersistenceAdapter`: best-effort snapshot of the last known user
//!
//! The snapshot is only a hint for rendering before the server has answered;
//! the session becomes authenticated only after a check or a login succeeds.

pub mod session;
pub mod snapshot;

pub use session::{ActionResult, Session, SessionConfig, SessionStore, NOT_AUTHENTICATED};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, PersistenceAdapter};

//! Data models shared by the gateway, the session store and persistence.
//!
//! - `UserProfile`: the identity record owned by the remote service
//! - `ProfileUpdate`: a partial profile merged over the current user
//! - `Credentials`: what the login form submits

pub mod credentials;
pub mod user;

pub use credentials::Credentials;
pub use user::{ProfileUpdate, UserProfile};

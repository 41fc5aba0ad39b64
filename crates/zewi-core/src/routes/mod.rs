//! Navigation: the route table and the guard that gates each transition
//! on the session state.

pub mod guard;
pub mod table;

pub use guard::{Decision, GuardConfig, NavigationGuard};
pub use table::{Route, RoutePolicy, RouteTable};

//! Navigation guarding for Portcullis.
//!
//! Every route transition passes through a [`NavigationGuard`], which waits
//! for the session machine to settle and then admits the transition or
//! redirects it. [`Router`] strings guarded transitions together, follows
//! static redirects, and publishes the current location.
//!
//! # Key types
//!
//! - [`RouteTable`] / [`RouteAccess`]: static per-route access metadata
//! - [`NavigationGuard`] / [`Decision`]: the decision table
//! - [`Router`]: redirect following, current location, navigation driver
//! - [`RouterConfig`] / [`GuardPolicy`]: redirect targets and resolve policy

mod config;
mod error;
mod guard;
mod router;
mod routes;

pub use config::{GuardPolicy, RouteAccess, RouterConfig};
pub use error::RouterError;
pub use guard::{Decision, NavigationGuard, decide};
pub use router::Router;
pub use routes::{Route, RouteTable, RouteTableBuilder};

//! Link lifecycle management.
//!
//! [`LinkManager`] owns creation, click accounting, owner-scoped updates and
//! reclamation of dead links. [`LinkFacade`] is the thin entry point used by
//! front ends that only hold raw strings and integers.

pub mod config;
pub mod facade;
pub mod lifecycle;
pub mod manager;

pub use config::LifecycleConfig;
pub use facade::LinkFacade;
pub use lifecycle::{CreateParams, LinkLifecycle, ListedLink};
pub use manager::LinkManager;

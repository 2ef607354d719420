//! Dependent exposed filters for Trovato gather views.
//!
//! A dependent filter instance names a controller filter, a set of trigger
//! values and the filters that depend on them. While the controller's
//! submitted value does not intersect the triggers, the dependents' input
//! is ignored for that request.

pub mod cli;
pub mod config;
pub mod config_storage;
pub mod error;
pub mod form;
pub mod gather;

pub use config::Config;
pub use error::{DependentFilterError, Result};

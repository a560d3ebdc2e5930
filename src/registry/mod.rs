//! Registry engine
//!
//! [`RegistrySession`] is one open/close cycle over the file set.
//! [`ProductRegistry`] is the caller-facing handle: it knows where the file
//! set and package database live and runs one session per operation.

pub mod facade;
pub mod query;
pub mod session;

pub use facade::ProductRegistry;
pub use query::Query;
pub use session::RegistrySession;

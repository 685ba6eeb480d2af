//! SQLite backend for the transkrip warehouse.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod loader;
mod resolver;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use loader::LoadError;
pub use store::SqliteStore;

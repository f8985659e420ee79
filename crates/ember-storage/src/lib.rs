//! Storage backends for link records.
//!
//! Every backend implements [`LinkRepository`] from `ember_core`:
//! [`InMemoryRepository`] for tests and throwaway sessions,
//! [`SqliteRepository`] for a local database file, and [`MySqlRepository`]
//! for a shared server.

mod error;
pub mod memory;
pub mod mysql;
mod row;
mod sql;
pub mod sqlite;

pub use ember_core::{LinkRecord, LinkRepository, StorageError};
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use sqlite::SqliteRepository;

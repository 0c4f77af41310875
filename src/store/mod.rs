//! Backing store for migrations and the version ledger.
//!
//! The engine only talks to the [`Store`] and [`UnitOfWork`] traits. A
//! SQLite implementation is bundled; other drivers plug in by implementing
//! the same two traits.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::{Store, StoreError, UnitOfWork};

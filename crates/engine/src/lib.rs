//! Asset database engine
//!
//! This crate binds the object store to the asset schema:
//! - [`DatabaseRegistry`], [`Connection`]: named databases and versioned open
//! - [`SessionManager`], [`Session`]: the process's single connection
//! - [`execute`]: one transaction per operation, settled into an [`Outcome`]
//! - [`records`]: key and index based record access primitives
//! - [`migration`]: initialization and the v1..v5 upgrade chain
//! - [`EngineConfig`]: database name and schema version

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod executor;
pub mod migration;
pub mod records;
pub mod schema;
pub mod session;

pub use config::EngineConfig;
pub use database::{Connection, Database, DatabaseRegistry, VersionChangeHandler};
pub use executor::{completion, execute, report, IntoCompletion, Outcome};
pub use migration::{MigrationReport, MigrationStep, Migrator};
pub use records::{IndexQuery, InsertMode};
pub use session::{Session, SessionManager};

// Re-export the transaction types operations are written against
pub use assetcache_concurrency::{Cursor, Transaction, TransactionMetrics, TransactionMode};

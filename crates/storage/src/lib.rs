//! Storage layer for assetcache
//!
//! This crate implements the in-process object-store engine state:
//! - Table: BTreeMap-based record storage keyed by a primary key path
//! - Secondary indexes as ordered (index key, primary key) sets
//! - TableSchema / IndexSchema: comparable schema descriptions
//! - DatabaseState: persisted version plus named tables
//!
//! There is no write-ahead log and no durability; state lives as long as
//! the process does.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod schema;
pub mod state;
pub mod table;

pub use schema::{IndexSchema, TableSchema};
pub use state::DatabaseState;
pub use table::{IndexEntry, Table};

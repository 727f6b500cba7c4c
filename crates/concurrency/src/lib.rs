//! Concurrency layer for assetcache
//!
//! This crate implements the transaction model of the reference engine:
//! - Transaction: scoped, moded, with a private working copy for writers
//! - Cursor: forward-only traversal over a table or index that sees
//!   the transaction's own writes
//! - TransactionManager: transaction ids, begin, and lifetime metrics
//!
//! Transactions on one database are serialized by its state lock: readers
//! share it, writers and version-change transactions hold it exclusively
//! until they commit or abort.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod manager;
pub mod transaction;

pub use cursor::Cursor;
pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{Transaction, TransactionMode, TransactionStatus};

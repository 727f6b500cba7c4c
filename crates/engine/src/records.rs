//! Record access primitives
//!
//! Key and index based requests against one table, issued inside a
//! caller-supplied transaction. The error conventions are what operations
//! build on:
//!
//! - a missing key on [`get_by_key`] aborts with `NotFoundError`
//! - a missing key on [`update`] is a suppressed abort (success, no write)
//! - a transform or upsert branch that yields nothing aborts with `Unknown`
//! - deletes are idempotent and empty scans succeed

use assetcache_concurrency::{Cursor, Transaction};
use assetcache_core::{Direction, Error, ErrorCode, Key, KeyRange, Result};
use serde_json::Value;

/// Behavior of [`insert`] when the key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Fail with `ConstraintError`
    CreateOnly,
    /// Overwrite the existing record
    CreateOrReplace,
}

/// Range scan over a named index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery<'a> {
    /// Index name
    pub index: &'a str,
    /// Index keys to visit
    pub range: KeyRange,
    /// Visiting order
    pub direction: Direction,
}

impl<'a> IndexQuery<'a> {
    /// Every record whose index key equals `key`, ascending
    pub fn only(index: &'a str, key: impl Into<Key>) -> Self {
        Self {
            index,
            range: KeyRange::only(key),
            direction: Direction::Next,
        }
    }
}

/// Fetch a record; aborts with `NotFoundError` when absent
pub fn get_by_key(txn: &Transaction<'_>, table: &str, key: &Key) -> Result<Value> {
    txn.get(table, key)?
        .ok_or_else(|| Error::not_found(format!("no record {} in {}", key, table)))
}

/// Insert a record
pub fn insert(txn: &mut Transaction<'_>, table: &str, value: Value, mode: InsertMode) -> Result<Key> {
    let key = match mode {
        InsertMode::CreateOnly => txn.add(table, value)?,
        InsertMode::CreateOrReplace => txn.put(table, value)?,
    };
    Ok(key)
}

/// Delete a record; absent keys succeed
pub fn delete_by_key(txn: &mut Transaction<'_>, table: &str, key: &Key) -> Result<()> {
    txn.delete(table, key)?;
    Ok(())
}

/// Delete every record of a table
pub fn clear(txn: &mut Transaction<'_>, table: &str) -> Result<()> {
    txn.clear(table)?;
    Ok(())
}

/// Every record in primary-key order
pub fn scan_all(txn: &Transaction<'_>, table: &str) -> Result<Vec<Value>> {
    Ok(Cursor::open(txn, table, KeyRange::all(), Direction::Next)?.remaining(txn)?)
}

/// Records selected by an index query, in index order
pub fn scan_by_index(txn: &Transaction<'_>, table: &str, query: &IndexQuery<'_>) -> Result<Vec<Value>> {
    let cursor = Cursor::open_index(txn, table, query.index, query.range.clone(), query.direction)?;
    Ok(cursor.remaining(txn)?)
}

/// Read-modify-write of one record
///
/// Absent key: suppressed `NotFoundError` abort. `transform` returning
/// `None`: `Unknown` abort.
pub fn update<F>(txn: &mut Transaction<'_>, table: &str, key: &Key, transform: F) -> Result<()>
where
    F: FnOnce(Value) -> Option<Value>,
{
    let Some(existing) = txn.get(table, key)? else {
        return Err(Error::suppressed_abort(
            ErrorCode::NotFoundError,
            format!("no record {} in {}", key, table),
        ));
    };
    let updated = transform(existing).ok_or_else(|| {
        Error::abort(
            ErrorCode::Unknown,
            format!("update of {} in {} produced no record", key, table),
        )
    })?;
    txn.put(table, updated)?;
    Ok(())
}

/// Write `on_found(existing)` or `on_not_found()`; `None` from either aborts with `Unknown`
pub fn upsert<F, G>(
    txn: &mut Transaction<'_>,
    table: &str,
    key: &Key,
    on_found: F,
    on_not_found: G,
) -> Result<()>
where
    F: FnOnce(Value) -> Option<Value>,
    G: FnOnce() -> Option<Value>,
{
    let replacement = match txn.get(table, key)? {
        Some(existing) => on_found(existing),
        None => on_not_found(),
    };
    let value = replacement.ok_or_else(|| {
        Error::abort(
            ErrorCode::Unknown,
            format!("upsert of {} in {} produced no record", key, table),
        )
    })?;
    txn.put(table, value)?;
    Ok(())
}

//! Forward-only cursors
//!
//! A [`Cursor`] walks a table (by primary key) or one of its indexes in a
//! fixed [`Direction`] over a [`KeyRange`]. It stores only its last
//! position and re-seeks on every step, so it observes writes made through
//! the same transaction between steps, including deletion of the record it
//! is positioned on.
//!
//! The cursor does not borrow the transaction; each call takes it as an
//! argument. This lets the caller interleave cursor steps with other
//! requests (reads of other tables, cascaded deletes) on the same
//! transaction.

use assetcache_core::{Direction, Key, KeyRange, StoreError};
use assetcache_storage::IndexEntry;
use serde_json::Value;

use crate::transaction::Transaction;

#[derive(Debug, Clone)]
enum Source {
    Primary { after: Option<Key> },
    Index { name: String, after: Option<IndexEntry> },
}

/// Cursor over a table or index
#[derive(Debug, Clone)]
pub struct Cursor {
    table: String,
    source: Source,
    range: KeyRange,
    direction: Direction,
    current: Option<Key>,
}

impl Cursor {
    /// Open a cursor over a table's primary keys
    pub fn open(
        txn: &Transaction<'_>,
        table: &str,
        range: KeyRange,
        direction: Direction,
    ) -> Result<Self, StoreError> {
        txn.table(table)?;
        Ok(Self {
            table: table.to_string(),
            source: Source::Primary { after: None },
            range,
            direction,
            current: None,
        })
    }

    /// Open a cursor over an index; `NotFoundError` if the index does not exist
    pub fn open_index(
        txn: &Transaction<'_>,
        table: &str,
        index: &str,
        range: KeyRange,
        direction: Direction,
    ) -> Result<Self, StoreError> {
        if !txn.table(table)?.has_index(index) {
            return Err(StoreError::not_found(format!(
                "index {} does not exist on table {}",
                index, table
            )));
        }
        Ok(Self {
            table: table.to_string(),
            source: Source::Index {
                name: index.to_string(),
                after: None,
            },
            range,
            direction,
            current: None,
        })
    }

    /// Table this cursor walks
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key of the record the cursor is positioned on
    pub fn primary_key(&self) -> Option<&Key> {
        self.current.as_ref()
    }

    /// Move to the next record and return it; `None` once exhausted
    pub fn advance(&mut self, txn: &Transaction<'_>) -> Result<Option<Value>, StoreError> {
        let next = match &mut self.source {
            Source::Primary { after } => {
                let found = txn.seek(&self.table, &self.range, self.direction, after.as_ref())?;
                if found.is_some() {
                    *after = found.clone();
                }
                found
            }
            Source::Index { name, after } => {
                let found = txn.index_seek(
                    &self.table,
                    name,
                    &self.range,
                    self.direction,
                    after.as_ref(),
                )?;
                let primary = found.as_ref().map(|(_, pk)| pk.clone());
                // exhausted cursors keep their last position
                if found.is_some() {
                    *after = found;
                }
                primary
            }
        };

        self.current = next;
        match &self.current {
            Some(key) => Ok(txn.get(&self.table, key)?),
            None => Ok(None),
        }
    }

    /// Delete the record under the cursor
    pub fn delete(&self, txn: &mut Transaction<'_>) -> Result<(), StoreError> {
        let key = self.current.as_ref().ok_or_else(|| {
            StoreError::invalid_state("cursor is not positioned on a record")
        })?;
        txn.delete(&self.table, key)?;
        Ok(())
    }

    /// Replace the record under the cursor; its primary key must not change
    pub fn update(&self, txn: &mut Transaction<'_>, value: Value) -> Result<(), StoreError> {
        let key = self.current.as_ref().ok_or_else(|| {
            StoreError::invalid_state("cursor is not positioned on a record")
        })?;
        if &txn.table(&self.table)?.primary_key(&value)? != key {
            return Err(StoreError::data("cursor update may not change the primary key"));
        }
        txn.put(&self.table, value)?;
        Ok(())
    }

    /// Drain the remaining records
    pub fn remaining(mut self, txn: &Transaction<'_>) -> Result<Vec<Value>, StoreError> {
        let mut out = Vec::new();
        while let Some(value) = self.advance(txn)? {
            out.push(value);
        }
        Ok(out)
    }
}

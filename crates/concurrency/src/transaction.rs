//! Transaction object
//!
//! A [`Transaction`] is bound to a database's state lock, a scope of table
//! names, and a mode. Read-write and version-change transactions mutate a
//! private working copy; [`Transaction::commit`] installs it under the
//! exclusive guard they already hold, and [`Transaction::abort`] (or dropping
//! the transaction without committing) discards it. No write is visible to
//! anyone else until commit, and an abort discards every write issued in the
//! transaction, including ones that individually succeeded.
//!
//! ## Request checks
//!
//! | Condition                                  | Fault                 |
//! |--------------------------------------------|-----------------------|
//! | transaction already committed or aborted   | `TransactionInactive` |
//! | table outside the scope                    | `NotFound`            |
//! | write in a read-only transaction           | `ReadOnly`            |
//! | schema change outside version-change       | `InvalidState`        |

use assetcache_core::{Direction, Key, KeyPath, KeyRange, StoreError};
use assetcache_storage::{DatabaseState, IndexEntry, IndexSchema, Table};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;

use crate::manager::TransactionManager;

/// Access mode of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads only; may run concurrently with other readers
    ReadOnly,
    /// Reads and record writes on the scoped tables
    ReadWrite,
    /// Exclusive; may also change tables, indexes and the version
    VersionChange,
}

impl TransactionMode {
    /// Check if record writes are allowed
    pub fn is_writable(self) -> bool {
        !matches!(self, TransactionMode::ReadOnly)
    }
}

/// Status of a transaction in its lifecycle
///
/// `Active` → `Committed` on commit, `Active` → `Aborted` on abort or drop.
/// Both terminal states reject further requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

enum Access<'a> {
    Read(RwLockReadGuard<'a, DatabaseState>),
    Write {
        guard: RwLockWriteGuard<'a, DatabaseState>,
        working: DatabaseState,
        /// Whole-state replacement on commit (version change) vs. table install
        replace: bool,
    },
}

/// A transaction over a scope of tables
pub struct Transaction<'a> {
    id: u64,
    mode: TransactionMode,
    scope: Vec<String>,
    status: TransactionStatus,
    access: Access<'a>,
    manager: &'a TransactionManager,
}

impl<'a> Transaction<'a> {
    pub(crate) fn read(
        manager: &'a TransactionManager,
        guard: RwLockReadGuard<'a, DatabaseState>,
        scope: &[&str],
    ) -> Self {
        Self {
            id: manager.next_txn_id(),
            mode: TransactionMode::ReadOnly,
            scope: scope.iter().map(|s| s.to_string()).collect(),
            status: TransactionStatus::Active,
            access: Access::Read(guard),
            manager,
        }
    }

    pub(crate) fn write(
        manager: &'a TransactionManager,
        guard: RwLockWriteGuard<'a, DatabaseState>,
        scope: &[&str],
    ) -> Result<Self, StoreError> {
        let scope: Vec<String> = scope.iter().map(|s| s.to_string()).collect();
        let mut working = DatabaseState::new(guard.name());
        working.set_version(guard.version());
        working.install_tables(guard.clone_tables(&scope)?);
        Ok(Self {
            id: manager.next_txn_id(),
            mode: TransactionMode::ReadWrite,
            scope,
            status: TransactionStatus::Active,
            access: Access::Write {
                guard,
                working,
                replace: false,
            },
            manager,
        })
    }

    pub(crate) fn version_change(
        manager: &'a TransactionManager,
        guard: RwLockWriteGuard<'a, DatabaseState>,
    ) -> Self {
        let working = guard.clone();
        Self {
            id: manager.next_txn_id(),
            mode: TransactionMode::VersionChange,
            scope: working.table_names(),
            status: TransactionStatus::Active,
            access: Access::Write {
                guard,
                working,
                replace: true,
            },
            manager,
        }
    }

    /// Transaction id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Access mode
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Tables this transaction may touch
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Ensure transaction is in Active state
    pub fn ensure_active(&self) -> Result<(), StoreError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::inactive(format!(
                "transaction {} is not active: {:?}",
                self.id, self.status
            )))
        }
    }

    fn state(&self) -> &DatabaseState {
        match &self.access {
            Access::Read(guard) => &**guard,
            Access::Write { working, .. } => working,
        }
    }

    fn check_scope(&self, table: &str) -> Result<(), StoreError> {
        if self.mode == TransactionMode::VersionChange || self.scope.iter().any(|s| s == table) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!(
                "table {} is not in the scope of transaction {}",
                table, self.id
            )))
        }
    }

    fn working_mut(&mut self) -> Result<&mut DatabaseState, StoreError> {
        self.ensure_active()?;
        match &mut self.access {
            Access::Read(_) => Err(StoreError::read_only(format!(
                "transaction {} is read-only",
                self.id
            ))),
            Access::Write { working, .. } => Ok(working),
        }
    }

    fn schema_mut(&mut self) -> Result<&mut DatabaseState, StoreError> {
        if self.mode != TransactionMode::VersionChange {
            return Err(StoreError::invalid_state(format!(
                "schema changes require a version-change transaction (transaction {} is {:?})",
                self.id, self.mode
            )));
        }
        self.working_mut()
    }

    /// Borrow a table for reading
    pub fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.ensure_active()?;
        self.check_scope(name)?;
        self.state().table(name)
    }

    /// Borrow a table for writing
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, StoreError> {
        self.check_scope(name)?;
        self.working_mut()?.table_mut(name)
    }

    // ========================================================================
    // Record requests
    // ========================================================================

    /// Get a record by primary key
    pub fn get(&self, table: &str, key: &Key) -> Result<Option<Value>, StoreError> {
        Ok(self.table(table)?.get(key).cloned())
    }

    /// Insert a record; `ConstraintError` if its key exists
    pub fn add(&mut self, table: &str, value: Value) -> Result<Key, StoreError> {
        self.table_mut(table)?.add(value)
    }

    /// Insert or replace a record
    pub fn put(&mut self, table: &str, value: Value) -> Result<Key, StoreError> {
        self.table_mut(table)?.put(value)
    }

    /// Delete a record; absent keys are not an error
    pub fn delete(&mut self, table: &str, key: &Key) -> Result<Option<Value>, StoreError> {
        Ok(self.table_mut(table)?.delete(key))
    }

    /// Delete every record of a table
    pub fn clear(&mut self, table: &str) -> Result<(), StoreError> {
        self.table_mut(table)?.clear();
        Ok(())
    }

    /// Records in `range` in primary-key order
    pub fn scan(
        &self,
        table: &str,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self.table(table)?.scan(range, direction))
    }

    /// Records whose index key is in `range`, in index order
    pub fn index_scan(
        &self,
        table: &str,
        index: &str,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<Value>, StoreError> {
        self.table(table)?.index_scan(index, range, direction)
    }

    pub(crate) fn seek(
        &self,
        table: &str,
        range: &KeyRange,
        direction: Direction,
        after: Option<&Key>,
    ) -> Result<Option<Key>, StoreError> {
        Ok(self.table(table)?.seek(range, direction, after))
    }

    pub(crate) fn index_seek(
        &self,
        table: &str,
        index: &str,
        range: &KeyRange,
        direction: Direction,
        after: Option<&IndexEntry>,
    ) -> Result<Option<IndexEntry>, StoreError> {
        self.table(table)?.index_seek(index, range, direction, after)
    }

    // ========================================================================
    // Schema requests (version-change only)
    // ========================================================================

    /// Persisted version as seen by this transaction
    pub fn version(&self) -> u32 {
        self.state().version()
    }

    /// Set the version installed at commit
    pub fn set_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.schema_mut()?.set_version(version);
        Ok(())
    }

    /// Table names visible to this transaction
    pub fn table_names(&self) -> Vec<String> {
        self.state().table_names()
    }

    /// Create a table
    pub fn create_table(&mut self, name: &str, key_path: KeyPath) -> Result<(), StoreError> {
        self.schema_mut()?.create_table(name, key_path)?;
        Ok(())
    }

    /// Create an index on a table
    pub fn create_index(
        &mut self,
        table: &str,
        name: &str,
        schema: IndexSchema,
    ) -> Result<(), StoreError> {
        self.schema_mut()?.table_mut(table)?.create_index(name, schema)
    }

    /// Drop an index from a table
    pub fn delete_index(&mut self, table: &str, name: &str) -> Result<(), StoreError> {
        self.schema_mut()?.table_mut(table)?.delete_index(name)
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Commit, making every write visible atomically
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.ensure_active()?;
        if let Access::Write {
            guard,
            working,
            replace,
        } = &mut self.access
        {
            let working = std::mem::replace(working, DatabaseState::new(guard.name()));
            if *replace {
                **guard = working;
            } else {
                guard.install_tables(working.into_tables());
            }
        }
        self.status = TransactionStatus::Committed;
        self.manager.record_commit();
        tracing::trace!(txn_id = self.id, "transaction committed");
        Ok(())
    }

    /// Abort, discarding every write
    pub fn abort(mut self, reason: impl Into<String>) {
        self.mark_aborted(reason.into());
    }

    fn mark_aborted(&mut self, reason: String) {
        if !self.is_active() {
            return;
        }
        tracing::trace!(txn_id = self.id, reason = %reason, "transaction aborted");
        self.status = TransactionStatus::Aborted { reason };
        self.manager.record_abort();
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.mark_aborted("dropped without commit".to_string());
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("scope", &self.scope)
            .field("status", &self.status)
            .finish()
    }
}

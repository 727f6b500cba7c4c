//! Transaction manager for coordinating transaction lifecycles
//!
//! Allocates transaction ids and opens transactions against a database's
//! state lock. Keeps lifetime counters that the facade exposes as metrics.
//!
//! ## Serialization
//!
//! ```text
//! ReadOnly      -> shared read guard; many may run at once
//! ReadWrite     -> exclusive write guard + working copy of scoped tables
//! VersionChange -> exclusive write guard + working copy of the whole state
//! ```
//!
//! A writer holds the exclusive guard from begin to commit/abort, so
//! transactions on one database never interleave their effects.

use assetcache_storage::DatabaseState;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transaction::{Transaction, TransactionMode};
use assetcache_core::StoreError;

/// Snapshot of transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted (explicitly or by drop)
    pub aborted: u64,
    /// Transactions currently open
    pub active: u64,
}

impl TransactionMetrics {
    /// Fraction of finished transactions that committed (1.0 when none finished)
    pub fn commit_rate(&self) -> f64 {
        let finished = self.committed + self.aborted;
        if finished == 0 {
            1.0
        } else {
            self.committed as f64 / finished as f64
        }
    }
}

/// Opens transactions and tracks their outcomes
#[derive(Debug)]
pub struct TransactionManager {
    /// Next transaction ID
    next_txn_id: AtomicU64,
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// Create a manager whose first transaction gets id 1
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU64::new(1),
            started: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
        }
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Begin a transaction over `scope`
    ///
    /// Every table in the scope must exist (`NotFoundError` otherwise).
    /// Version-change transactions ignore `scope` and cover every table.
    pub fn begin<'a>(
        &'a self,
        state: &'a RwLock<DatabaseState>,
        scope: &[&str],
        mode: TransactionMode,
    ) -> Result<Transaction<'a>, StoreError> {
        let txn = match mode {
            TransactionMode::ReadOnly => {
                let guard = state.read();
                check_scope(&guard, scope)?;
                Transaction::read(self, guard, scope)
            }
            TransactionMode::ReadWrite => {
                let guard = state.write();
                check_scope(&guard, scope)?;
                Transaction::write(self, guard, scope)?
            }
            TransactionMode::VersionChange => Transaction::version_change(self, state.write()),
        };
        self.started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(txn_id = txn.id(), mode = ?mode, "transaction begun");
        Ok(txn)
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.started.load(Ordering::Relaxed);
        let committed = self.committed.load(Ordering::Relaxed);
        let aborted = self.aborted.load(Ordering::Relaxed);
        TransactionMetrics {
            started,
            committed,
            aborted,
            active: started.saturating_sub(committed + aborted),
        }
    }
}

fn check_scope(state: &DatabaseState, scope: &[&str]) -> Result<(), StoreError> {
    match scope.iter().find(|name| !state.has_table(name)) {
        Some(missing) => Err(StoreError::not_found(format!(
            "table {} does not exist",
            missing
        ))),
        None => Ok(()),
    }
}

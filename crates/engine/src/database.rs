//! Database registry and connections
//!
//! The [`DatabaseRegistry`] plays the role of the object-store factory: it
//! owns named [`Database`]s and hands out [`Connection`]s to them. Opening a
//! connection at a higher version than the stored one runs an upgrade inside
//! a single version-change transaction.
//!
//! ## Open rules
//!
//! ```text
//! requested == 0          -> InvalidConfig
//! requested <  stored     -> VersionError
//! requested == stored     -> connect
//! requested >  stored     -> notify other connections (they close themselves)
//!                            any still open  -> Blocked
//!                            run upgrade     -> error: AbortError, version unchanged
//!                                            -> ok: version = requested, connect
//! ```

use assetcache_concurrency::{
    Transaction, TransactionManager, TransactionMetrics, TransactionMode,
};
use assetcache_core::{Error, FaultKind, Result, StoreError};
use assetcache_storage::{DatabaseState, TableSchema};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with `(old_version, new_version)` after a forced close
pub type VersionChangeHandler = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// One named database: state, transaction manager, open connections
pub struct Database {
    name: String,
    state: RwLock<DatabaseState>,
    manager: TransactionManager,
    connections: Mutex<Vec<Weak<Connection>>>,
    next_connection_id: AtomicU64,
}

impl Database {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(DatabaseState::new(name)),
            manager: TransactionManager::new(),
            connections: Mutex::new(Vec::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persisted version (0 when never initialized)
    pub fn version(&self) -> u32 {
        self.state.read().version()
    }

    /// Schemas of every table
    pub fn schemas(&self) -> BTreeMap<String, TableSchema> {
        self.state.read().schemas()
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.manager.metrics()
    }

    /// Number of connections that are still open
    pub fn open_connection_count(&self) -> usize {
        self.live_connections().len()
    }

    fn live_connections(&self) -> Vec<Arc<Connection>> {
        let mut connections = self.connections.lock();
        connections.retain(|weak| weak.strong_count() > 0);
        connections
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|conn| !conn.is_closed())
            .collect()
    }

    /// Deliver a version-change notification to every open connection
    ///
    /// Returns how many connections stayed open.
    fn notify_version_change(&self, old_version: u32, new_version: u32) -> usize {
        let live = self.live_connections();
        let mut blocking = 0;
        for conn in live {
            if !conn.on_version_change(old_version, new_version) {
                blocking += 1;
            }
        }
        blocking
    }

    fn begin<'a>(&'a self, scope: &[&str], mode: TransactionMode) -> Result<Transaction<'a>> {
        Ok(self.manager.begin(&self.state, scope, mode)?)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("version", &self.version())
            .finish()
    }
}

/// A connection to a [`Database`]
pub struct Connection {
    id: u64,
    database: Arc<Database>,
    closed: AtomicBool,
    handler: Mutex<Option<VersionChangeHandler>>,
}

impl Connection {
    /// Connection id, unique per database
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Database this connection belongs to
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Database name
    pub fn name(&self) -> &str {
        self.database.name()
    }

    /// Persisted version
    pub fn version(&self) -> u32 {
        self.database.version()
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the connection; further transactions fail
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(database = %self.name(), connection = self.id, "connection closed");
        }
    }

    /// Install the version-change handler
    ///
    /// A connection without a handler ignores version-change notifications
    /// and therefore blocks upgrades requested by other connections.
    pub fn set_version_change_handler(&self, handler: VersionChangeHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Returns `true` if the connection closed itself
    fn on_version_change(&self, old_version: u32, new_version: u32) -> bool {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => {
                tracing::warn!(
                    database = %self.name(),
                    connection = self.id,
                    old_version,
                    new_version,
                    "version change requested by another connection, closing"
                );
                self.close();
                handler(old_version, new_version);
                true
            }
            None => false,
        }
    }

    /// Begin a read-only or read-write transaction
    pub fn transaction(&self, scope: &[&str], mode: TransactionMode) -> Result<Transaction<'_>> {
        if self.is_closed() {
            return Err(StoreError::invalid_state(format!(
                "connection {} to {} is closed",
                self.id,
                self.name()
            ))
            .into());
        }
        if mode == TransactionMode::VersionChange {
            return Err(StoreError::new(
                FaultKind::InvalidAccess,
                "version-change transactions are only started by opening at a higher version",
            )
            .into());
        }
        self.database.begin(scope, mode)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("database", &self.database.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Registry of named databases
#[derive(Default)]
pub struct DatabaseRegistry {
    databases: DashMap<String, Arc<Database>>,
}

impl DatabaseRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a database without connecting
    pub fn database(&self, name: &str) -> Option<Arc<Database>> {
        self.databases.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a database; fails with `Blocked` while connections are open
    pub fn delete_database(&self, name: &str) -> Result<()> {
        if let Some(db) = self.database(name) {
            if db.open_connection_count() > 0 {
                return Err(Error::Blocked(format!(
                    "{} has open connections",
                    name
                )));
            }
        }
        self.databases.remove(name);
        Ok(())
    }

    /// Open a connection at `version`, upgrading the database if needed
    ///
    /// `upgrade` receives the version-change transaction plus the old and
    /// new versions. Returning an error aborts the upgrade; nothing it did
    /// is kept.
    pub fn open<F>(&self, name: &str, version: u32, upgrade: F) -> Result<Arc<Connection>>
    where
        F: FnOnce(&mut Transaction<'_>, u32, u32) -> Result<()>,
    {
        if version == 0 {
            return Err(Error::InvalidConfig(
                "database version must be at least 1".to_string(),
            ));
        }

        let db = Arc::clone(
            self.databases
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Database::new(name)))
                .value(),
        );

        let stored = db.version();
        if version < stored {
            return Err(StoreError::new(
                FaultKind::Version,
                format!(
                    "requested version {} is lower than the stored version {}",
                    version, stored
                ),
            )
            .into());
        }

        if version > stored {
            let blocking = db.notify_version_change(stored, version);
            if blocking > 0 {
                tracing::error!(
                    database = name,
                    blocking,
                    "open blocked by connections that did not close"
                );
                return Err(Error::Blocked(format!(
                    "{} connection(s) to {} did not close for the upgrade to version {}",
                    blocking, name, version
                )));
            }

            let mut txn = db.manager.begin(&db.state, &[], TransactionMode::VersionChange)?;
            if let Err(e) = upgrade(&mut txn, stored, version) {
                txn.abort(e.to_string());
                tracing::error!(
                    database = name,
                    old_version = stored,
                    new_version = version,
                    error = %e,
                    "upgrade aborted"
                );
                return Err(StoreError::new(
                    FaultKind::Abort,
                    format!("upgrade to version {} aborted: {}", version, e),
                )
                .into());
            }
            txn.set_version(version)?;
            txn.commit()?;
        }

        let conn = Arc::new(Connection {
            id: db.next_connection_id.fetch_add(1, Ordering::Relaxed),
            database: Arc::clone(&db),
            closed: AtomicBool::new(false),
            handler: Mutex::new(None),
        });
        db.connections.lock().push(Arc::downgrade(&conn));
        Ok(conn)
    }
}

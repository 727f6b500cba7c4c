//! Sessions and the session manager
//!
//! A [`Session`] is the single connection a process holds to the asset
//! database. Operations borrow it; the [`SessionManager`] owns its
//! lifecycle: open (migrating if needed), close, and forced close when
//! another connection upgrades the database.

use assetcache_concurrency::{Transaction, TransactionMetrics, TransactionMode};
use assetcache_core::{Error, Result};
use assetcache_storage::TableSchema;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::database::{Connection, DatabaseRegistry, VersionChangeHandler};
use crate::migration::Migrator;

/// An open connection to the asset database
#[derive(Debug)]
pub struct Session {
    connection: Arc<Connection>,
}

impl Session {
    /// Wrap an open connection
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    /// Underlying connection
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Check if the session can still start transactions
    pub fn is_open(&self) -> bool {
        !self.connection.is_closed()
    }

    /// Stored schema version
    pub fn version(&self) -> u32 {
        self.connection.version()
    }

    /// Table schemas
    pub fn schemas(&self) -> BTreeMap<String, TableSchema> {
        self.connection.database().schemas()
    }

    /// Transaction counters of the database
    pub fn metrics(&self) -> TransactionMetrics {
        self.connection.database().metrics()
    }

    /// Begin a transaction over `scope`
    pub fn transaction(&self, scope: &[&str], mode: TransactionMode) -> Result<Transaction<'_>> {
        self.connection.transaction(scope, mode)
    }

    /// Close the connection
    pub fn close(&self) {
        self.connection.close();
    }
}

/// Owns the process's session
pub struct SessionManager {
    registry: Arc<DatabaseRegistry>,
    config: EngineConfig,
    session: Mutex<Option<Arc<Session>>>,
    on_version_change: Option<VersionChangeHandler>,
}

impl SessionManager {
    /// Manager over `registry` with `config`
    pub fn new(registry: Arc<DatabaseRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            session: Mutex::new(None),
            on_version_change: None,
        }
    }

    /// Callback invoked after this manager's session was closed by an upgrade elsewhere
    pub fn with_version_change_handler(mut self, handler: VersionChangeHandler) -> Self {
        self.on_version_change = Some(handler);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registry the session is opened from
    pub fn registry(&self) -> &Arc<DatabaseRegistry> {
        &self.registry
    }

    /// Open the session, migrating the database to the configured version
    ///
    /// Opening while a session is already open returns that session.
    pub fn open(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.current() {
            tracing::warn!(
                database = %self.config.database_name,
                "database already opened"
            );
            return Ok(session);
        }

        self.config.validate()?;
        let migrator = Migrator::new(self.config.schema_version);
        let connection = self.registry.open(
            &self.config.database_name,
            self.config.schema_version,
            |txn, old_version, _| migrator.run(txn, old_version).map(|_| ()),
        )?;

        let callback = self.on_version_change.clone();
        connection.set_version_change_handler(Arc::new(move |old_version, new_version| {
            if let Some(callback) = &callback {
                callback(old_version, new_version);
            }
        }));

        let session = Arc::new(Session::new(connection));
        *self.session.lock() = Some(Arc::clone(&session));
        tracing::info!(
            database = %self.config.database_name,
            version = session.version(),
            "database opened"
        );
        Ok(session)
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .as_ref()
            .filter(|session| session.is_open())
            .cloned()
    }

    /// The open session; `NotOpened` if there is none
    pub fn session(&self) -> Result<Arc<Session>> {
        self.current().ok_or(Error::NotOpened)
    }

    /// Check if a session is open
    pub fn is_open(&self) -> bool {
        self.current().is_some()
    }

    /// Close the session; a no-op when none is open
    pub fn close(&self) {
        if let Some(session) = self.session.lock().take() {
            session.close();
            tracing::info!(database = %self.config.database_name, "database closed");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

//! Main database entry point for assetcache.
//!
//! This module provides the `AssetDb` struct, the host-facing handle that
//! owns the process's session, and its builder.

use assetcache_core::{CompletionSink, Result};
use assetcache_engine::{
    report, DatabaseRegistry, EngineConfig, Outcome, Session, SessionManager,
    VersionChangeHandler,
};
use std::path::Path;
use std::sync::Arc;

/// The asset cache database.
///
/// Create one with [`AssetDb::new`] or [`AssetDb::builder`], then call
/// [`AssetDb::open`]. Every host operation takes a [`CompletionSink`] and
/// reports its outcome to it exactly once.
///
/// # Example
///
/// ```ignore
/// use assetcache::prelude::*;
///
/// let db = AssetDb::builder()
///     .on_version_change(|old, new| eprintln!("closed by upgrade {} -> {}", old, new))
///     .build();
/// let sink = RecordingSink::new();
/// db.open(&sink);
/// db.get_asset("u1", "docs/a.psd", &sink);
/// db.close();
/// ```
pub struct AssetDb {
    pub(crate) manager: SessionManager,
}

impl AssetDb {
    /// Create new AssetDb instance with default settings and its own registry.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for database configuration.
    pub fn builder() -> AssetDbBuilder {
        AssetDbBuilder::new()
    }

    /// Open the database, migrating it to the configured schema version.
    ///
    /// Re-opening while open reports success without doing anything. Open
    /// failures report `OpenDatabaseBlocked`, `InvalidConfig` or the
    /// engine's fault code (`AbortError` for a failed migration).
    pub fn open(&self, sink: &dyn CompletionSink) {
        report(sink, self.manager.open().map(|_| Outcome::Committed(())));
    }

    /// Open without a sink, returning the session.
    pub fn try_open(&self) -> Result<Arc<Session>> {
        self.manager.open()
    }

    /// Close the database; a no-op when not open.
    pub fn close(&self) {
        self.manager.close();
    }

    /// Check if the database is open.
    ///
    /// Becomes `false` after a version change elsewhere forced it closed.
    pub fn is_open(&self) -> bool {
        self.manager.is_open()
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        self.manager.config()
    }

    /// The open session; `NotOpened` if there is none.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.manager.session()
    }

    /// Schema version of the open database.
    pub fn version(&self) -> Result<u32> {
        Ok(self.session()?.version())
    }

    /// Get database metrics.
    pub fn metrics(&self) -> Result<DatabaseMetrics> {
        let txn_metrics = self.session()?.metrics();
        Ok(DatabaseMetrics {
            transactions_committed: txn_metrics.committed,
            transactions_aborted: txn_metrics.aborted,
            transactions_active: txn_metrics.active,
            commit_rate: txn_metrics.commit_rate(),
        })
    }
}

impl Default for AssetDb {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssetDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetDb")
            .field("manager", &self.manager)
            .finish()
    }
}

/// Database metrics.
#[derive(Debug, Clone)]
pub struct DatabaseMetrics {
    /// Total committed transactions
    pub transactions_committed: u64,
    /// Total aborted transactions
    pub transactions_aborted: u64,
    /// Currently active transactions
    pub transactions_active: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
}

/// Builder for database configuration.
///
/// # Example
///
/// ```ignore
/// // Stage a legacy generation in a shared registry
/// let registry = Arc::new(DatabaseRegistry::new());
/// let db = AssetDb::builder()
///     .registry(Arc::clone(&registry))
///     .schema_version(3)
///     .build();
///
/// // Load settings from a TOML file
/// let db = AssetDb::builder().config_file("assetcache.toml")?.build();
/// ```
pub struct AssetDbBuilder {
    config: EngineConfig,
    registry: Option<Arc<DatabaseRegistry>>,
    on_version_change: Option<VersionChangeHandler>,
}

impl AssetDbBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: None,
            on_version_change: None,
        }
    }

    /// Set the database name.
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.config.database_name = name.into();
        self
    }

    /// Set the schema version to open at.
    ///
    /// Checked on open; 0 or a version above the latest generation fails
    /// with `InvalidConfig`.
    pub fn schema_version(mut self, version: u32) -> Self {
        self.config.schema_version = version;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file.
    pub fn config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.config(EngineConfig::from_path(path)?))
    }

    /// Open against a shared registry instead of a private one.
    pub fn registry(mut self, registry: Arc<DatabaseRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Callback invoked after an upgrade from another connection forced
    /// this database closed, with the old and new versions.
    pub fn on_version_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        self.on_version_change = Some(Arc::new(callback));
        self
    }

    /// Build the (unopened) database.
    pub fn build(self) -> AssetDb {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(DatabaseRegistry::new()));
        let mut manager = SessionManager::new(registry, self.config);
        if let Some(handler) = self.on_version_change {
            manager = manager.with_version_change_handler(handler);
        }
        AssetDb { manager }
    }

    /// Build and open in one step.
    pub fn open(self) -> Result<AssetDb> {
        let db = self.build();
        db.try_open()?;
        Ok(db)
    }
}

impl Default for AssetDbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

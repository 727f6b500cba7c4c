//! Database state: version plus named tables
//!
//! `DatabaseState` is plain data. Locking, transaction scoping and commit
//! live in the concurrency crate; a read-write transaction clones the
//! tables in its scope, mutates the clones, and installs them on commit.

use assetcache_core::{KeyPath, StoreError};
use std::collections::BTreeMap;

use crate::schema::TableSchema;
use crate::table::Table;

/// Persisted state of one named database
#[derive(Debug, Clone)]
pub struct DatabaseState {
    name: String,
    version: u32,
    tables: BTreeMap<String, Table>,
}

impl DatabaseState {
    /// Fresh database at version 0 with no tables
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            tables: BTreeMap::new(),
        }
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persisted schema version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Set the persisted schema version
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Sorted table names
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Check whether a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Borrow a table
    pub fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::not_found(format!("table {} does not exist", name)))
    }

    /// Mutably borrow a table
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, StoreError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(format!("table {} does not exist", name)))
    }

    /// Create an empty table
    pub fn create_table(&mut self, name: &str, key_path: KeyPath) -> Result<&mut Table, StoreError> {
        if self.tables.contains_key(name) {
            return Err(StoreError::constraint(format!(
                "table {} already exists",
                name
            )));
        }
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(key_path)))
    }

    /// Schemas of every table, by name
    pub fn schemas(&self) -> BTreeMap<String, TableSchema> {
        self.tables
            .iter()
            .map(|(name, table)| (name.clone(), table.schema()))
            .collect()
    }

    /// Clone the named tables (the working set of a read-write transaction)
    pub fn clone_tables(&self, names: &[String]) -> Result<BTreeMap<String, Table>, StoreError> {
        names
            .iter()
            .map(|name| Ok((name.clone(), self.table(name)?.clone())))
            .collect()
    }

    /// Consume the state, yielding its tables
    pub fn into_tables(self) -> BTreeMap<String, Table> {
        self.tables
    }

    /// Replace tables with committed working copies
    pub fn install_tables(&mut self, tables: BTreeMap<String, Table>) {
        self.tables.extend(tables);
    }
}

//! Table and index schema descriptions

use assetcache_core::KeyPath;
use std::collections::BTreeMap;

/// Definition of a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Path evaluated against each record to produce the index key
    pub key_path: KeyPath,
    /// Whether two records may share an index key
    pub unique: bool,
}

impl IndexSchema {
    /// Non-unique index over `key_path`
    pub fn new(key_path: KeyPath) -> Self {
        Self {
            key_path,
            unique: false,
        }
    }

    /// Unique index over `key_path`
    pub fn unique(key_path: KeyPath) -> Self {
        Self {
            key_path,
            unique: true,
        }
    }
}

/// Shape of a table: primary key path plus named indexes
///
/// Two tables with equal schemas accept exactly the same records and expose
/// exactly the same indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Primary key path
    pub key_path: KeyPath,
    /// Indexes by name
    pub indexes: BTreeMap<String, IndexSchema>,
}

impl TableSchema {
    /// Schema with no indexes
    pub fn new(key_path: KeyPath) -> Self {
        Self {
            key_path,
            indexes: BTreeMap::new(),
        }
    }

    /// Add an index definition
    pub fn with_index(mut self, name: impl Into<String>, index: IndexSchema) -> Self {
        self.indexes.insert(name.into(), index);
        self
    }

    /// Sorted index names
    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.keys().map(String::as_str).collect()
    }
}

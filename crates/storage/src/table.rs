//! Table storage
//!
//! A [`Table`] keeps records ordered by primary key in a `BTreeMap` and each
//! secondary index as an ordered set of `(index key, primary key)` pairs.
//! Keeping the primary key in the index entry gives a total order even for
//! non-unique indexes, which is what cursors need to resume after the entry
//! they last returned.
//!
//! # Seeking
//!
//! [`Table::seek`] and [`Table::index_seek`] return the first position
//! strictly after (in the traversal direction) a previous position. Cursors
//! call them once per step, so they observe inserts and deletes made between
//! steps.

use assetcache_core::{Direction, Key, KeyPath, KeyRange, StoreError};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::schema::{IndexSchema, TableSchema};

/// Position inside an index: `(index key, primary key)`
pub type IndexEntry = (Key, Key);

/// Smallest possible key; used to seek to the start of an index key's run
fn min_key() -> Key {
    Key::Number(f64::NEG_INFINITY)
}

fn above_lower(range: &KeyRange, key: &Key) -> bool {
    match &range.lower {
        None => true,
        Some(b) if b.open => key > &b.key,
        Some(b) => key >= &b.key,
    }
}

fn below_upper(range: &KeyRange, key: &Key) -> bool {
    match &range.upper {
        None => true,
        Some(b) if b.open => key < &b.key,
        Some(b) => key <= &b.key,
    }
}

#[derive(Debug, Clone)]
struct Index {
    schema: IndexSchema,
    entries: BTreeSet<IndexEntry>,
}

impl Index {
    fn new(schema: IndexSchema) -> Self {
        Self {
            schema,
            entries: BTreeSet::new(),
        }
    }

    /// Check whether `index_key` is already held by a record other than `primary`
    fn conflicts(&self, index_key: &Key, primary: &Key) -> bool {
        self.entries
            .range((Bound::Included((index_key.clone(), min_key())), Bound::Unbounded))
            .take_while(|(k, _)| k == index_key)
            .any(|(_, p)| p != primary)
    }
}

/// One object store: records plus their secondary indexes
#[derive(Debug, Clone)]
pub struct Table {
    key_path: KeyPath,
    records: BTreeMap<Key, Value>,
    indexes: BTreeMap<String, Index>,
}

impl Table {
    /// Create an empty table keyed by `key_path`
    pub fn new(key_path: KeyPath) -> Self {
        Self {
            key_path,
            records: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// Primary key path
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    /// Current schema (key path plus index definitions)
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            key_path: self.key_path.clone(),
            indexes: self
                .indexes
                .iter()
                .map(|(name, index)| (name.clone(), index.schema.clone()))
                .collect(),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Extract the primary key of `value`
    pub fn primary_key(&self, value: &Value) -> Result<Key, StoreError> {
        self.key_path.evaluate(value).ok_or_else(|| {
            StoreError::data(format!(
                "record does not yield a valid key at path {}",
                self.key_path
            ))
        })
    }

    /// Get a record by primary key
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.records.get(key)
    }

    /// Check whether a record exists
    pub fn contains(&self, key: &Key) -> bool {
        self.records.contains_key(key)
    }

    /// Insert a record, failing with `ConstraintError` if its key exists
    pub fn add(&mut self, value: Value) -> Result<Key, StoreError> {
        let key = self.primary_key(&value)?;
        if self.records.contains_key(&key) {
            return Err(StoreError::constraint(format!(
                "a record with key {} already exists",
                key
            )));
        }
        self.write(key, value)
    }

    /// Insert or replace a record
    pub fn put(&mut self, value: Value) -> Result<Key, StoreError> {
        let key = self.primary_key(&value)?;
        self.write(key, value)
    }

    fn write(&mut self, key: Key, value: Value) -> Result<Key, StoreError> {
        let mut index_keys = Vec::with_capacity(self.indexes.len());
        for (name, index) in &self.indexes {
            let index_key = index.schema.key_path.evaluate(&value);
            if let Some(ik) = &index_key {
                if index.schema.unique && index.conflicts(ik, &key) {
                    return Err(StoreError::constraint(format!(
                        "unique index {} already contains key {}",
                        name, ik
                    )));
                }
            }
            index_keys.push(index_key);
        }

        self.unindex(&key);
        for (index, index_key) in self.indexes.values_mut().zip(index_keys) {
            if let Some(ik) = index_key {
                index.entries.insert((ik, key.clone()));
            }
        }
        self.records.insert(key.clone(), value);
        Ok(key)
    }

    fn unindex(&mut self, key: &Key) {
        let Some(old) = self.records.get(key) else {
            return;
        };
        for index in self.indexes.values_mut() {
            if let Some(ik) = index.schema.key_path.evaluate(old) {
                index.entries.remove(&(ik, key.clone()));
            }
        }
    }

    /// Delete a record; returns the removed value if it existed
    pub fn delete(&mut self, key: &Key) -> Option<Value> {
        self.unindex(key);
        self.records.remove(key)
    }

    /// Remove every record, keeping the schema
    pub fn clear(&mut self) {
        self.records.clear();
        for index in self.indexes.values_mut() {
            index.entries.clear();
        }
    }

    /// All records in primary-key order
    pub fn values(&self) -> impl DoubleEndedIterator<Item = (&Key, &Value)> {
        self.records.iter()
    }

    /// First primary key after `after` within `range`, in `direction`
    pub fn seek(&self, range: &KeyRange, direction: Direction, after: Option<&Key>) -> Option<Key> {
        match direction {
            Direction::Next => {
                let start = match after {
                    Some(k) => Bound::Excluded(k.clone()),
                    None => range
                        .lower
                        .as_ref()
                        .map_or(Bound::Unbounded, |b| Bound::Included(b.key.clone())),
                };
                self.records
                    .range((start, Bound::Unbounded))
                    .map(|(k, _)| k)
                    .find(|k| above_lower(range, k))
                    .filter(|k| below_upper(range, k))
                    .cloned()
            }
            Direction::Prev => {
                let end = match after {
                    Some(k) => Bound::Excluded(k.clone()),
                    None => Bound::Unbounded,
                };
                self.records
                    .range((Bound::Unbounded, end))
                    .rev()
                    .map(|(k, _)| k)
                    .find(|k| below_upper(range, k))
                    .filter(|k| above_lower(range, k))
                    .cloned()
            }
        }
    }

    /// Records in `range`, ordered by primary key in `direction`
    pub fn scan(&self, range: &KeyRange, direction: Direction) -> Vec<Value> {
        let matching = self.records.iter().filter(|(k, _)| range.contains(k));
        match direction {
            Direction::Next => matching.map(|(_, v)| v.clone()).collect(),
            Direction::Prev => matching.rev().map(|(_, v)| v.clone()).collect(),
        }
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Sorted index names
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    /// Check whether an index exists
    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Create an index and populate it from existing records
    ///
    /// Fails with `ConstraintError` if the name is taken or if existing
    /// records violate a unique index.
    pub fn create_index(&mut self, name: &str, schema: IndexSchema) -> Result<(), StoreError> {
        if self.indexes.contains_key(name) {
            return Err(StoreError::constraint(format!(
                "index {} already exists",
                name
            )));
        }

        let mut index = Index::new(schema);
        for (key, value) in &self.records {
            if let Some(ik) = index.schema.key_path.evaluate(value) {
                if index.schema.unique && index.conflicts(&ik, key) {
                    return Err(StoreError::constraint(format!(
                        "existing records violate unique index {}",
                        name
                    )));
                }
                index.entries.insert((ik, key.clone()));
            }
        }

        tracing::trace!(index = name, entries = index.entries.len(), "index created");
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Drop an index
    pub fn delete_index(&mut self, name: &str) -> Result<(), StoreError> {
        self.indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(format!("index {} does not exist", name)))
    }

    fn index(&self, name: &str) -> Result<&Index, StoreError> {
        self.indexes
            .get(name)
            .ok_or_else(|| StoreError::not_found(format!("index {} does not exist", name)))
    }

    /// First index entry after `after` whose index key is within `range`
    pub fn index_seek(
        &self,
        name: &str,
        range: &KeyRange,
        direction: Direction,
        after: Option<&IndexEntry>,
    ) -> Result<Option<IndexEntry>, StoreError> {
        let entries = &self.index(name)?.entries;
        let found = match direction {
            Direction::Next => {
                let start = match after {
                    Some(entry) => Bound::Excluded(entry.clone()),
                    None => range.lower.as_ref().map_or(Bound::Unbounded, |b| {
                        Bound::Included((b.key.clone(), min_key()))
                    }),
                };
                entries
                    .range((start, Bound::Unbounded))
                    .find(|(ik, _)| above_lower(range, ik))
                    .filter(|(ik, _)| below_upper(range, ik))
            }
            Direction::Prev => {
                let end = match after {
                    Some(entry) => Bound::Excluded(entry.clone()),
                    None => Bound::Unbounded,
                };
                entries
                    .range((Bound::Unbounded, end))
                    .rev()
                    .find(|(ik, _)| below_upper(range, ik))
                    .filter(|(ik, _)| above_lower(range, ik))
            }
        };
        Ok(found.cloned())
    }

    /// Records whose index key is within `range`, ordered by index key
    pub fn index_scan(
        &self,
        name: &str,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<Value>, StoreError> {
        let mut out = Vec::new();
        let mut position = None;
        while let Some(entry) = self.index_seek(name, range, direction, position.as_ref())? {
            if let Some(value) = self.records.get(&entry.1) {
                out.push(value.clone());
            }
            position = Some(entry);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset_table() -> Table {
        let mut table = Table::new(KeyPath::compound(["userId", "path"]));
        table
            .create_index(
                "byHeartbeat",
                IndexSchema::new(KeyPath::compound(["userId", "heartbeat"])),
            )
            .unwrap();
        table
            .create_index("byPath", IndexSchema::unique(KeyPath::single("path")))
            .unwrap();
        table
    }

    fn record(user: &str, path: &str, heartbeat: i64) -> Value {
        json!({"userId": user, "path": path, "heartbeat": heartbeat})
    }

    fn paths(values: &[Value]) -> Vec<&str> {
        values.iter().map(|v| v["path"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_add_and_get() {
        let mut table = asset_table();
        let key = table.add(record("u1", "a", 1)).unwrap();
        assert_eq!(key, Key::array([Key::from("u1"), Key::from("a")]));
        assert_eq!(table.get(&key).unwrap()["heartbeat"], 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_add_duplicate_is_constraint() {
        let mut table = asset_table();
        table.add(record("u1", "a", 1)).unwrap();
        let err = table.add(record("u1", "a", 2)).unwrap_err();
        assert_eq!(err.kind, assetcache_core::FaultKind::Constraint);
    }

    #[test]
    fn test_put_overwrites_and_reindexes() {
        let mut table = asset_table();
        table.put(record("u1", "a", 1)).unwrap();
        table.put(record("u1", "a", 9)).unwrap();

        let hits = table
            .index_scan("byHeartbeat", &KeyRange::prefix("u1"), Direction::Next)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["heartbeat"], 9);
    }

    #[test]
    fn test_missing_primary_key_is_data_error() {
        let mut table = asset_table();
        let err = table.put(json!({"userId": "u1"})).unwrap_err();
        assert_eq!(err.kind, assetcache_core::FaultKind::Data);
    }

    #[test]
    fn test_unique_index_violation() {
        let mut table = asset_table();
        table.put(record("u1", "a", 1)).unwrap();
        let err = table.put(record("u2", "a", 1)).unwrap_err();
        assert_eq!(err.kind, assetcache_core::FaultKind::Constraint);
        // the failed write left nothing behind
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_record_without_index_key_is_not_indexed() {
        let mut table = asset_table();
        table.put(json!({"userId": "u1", "path": "a"})).unwrap();
        let hits = table
            .index_scan("byHeartbeat", &KeyRange::all(), Direction::Next)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_index_scan_directions() {
        let mut table = asset_table();
        table.put(record("u1", "a", 30)).unwrap();
        table.put(record("u1", "b", 10)).unwrap();
        table.put(record("u1", "c", 20)).unwrap();
        table.put(record("u2", "d", 99)).unwrap();

        let asc = table
            .index_scan("byHeartbeat", &KeyRange::prefix("u1"), Direction::Next)
            .unwrap();
        assert_eq!(paths(&asc), vec!["b", "c", "a"]);

        let desc = table
            .index_scan("byHeartbeat", &KeyRange::prefix("u1"), Direction::Prev)
            .unwrap();
        assert_eq!(paths(&desc), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_index_seek_resumes_after_deletion() {
        let mut table = asset_table();
        for (path, hb) in [("a", 1), ("b", 2), ("c", 3)] {
            table.put(record("u1", path, hb)).unwrap();
        }
        let range = KeyRange::prefix("u1");
        let first = table
            .index_seek("byHeartbeat", &range, Direction::Next, None)
            .unwrap()
            .unwrap();
        table.delete(&first.1);
        let second = table
            .index_seek("byHeartbeat", &range, Direction::Next, Some(&first))
            .unwrap()
            .unwrap();
        assert_eq!(second.1, Key::array([Key::from("u1"), Key::from("b")]));
    }

    #[test]
    fn test_primary_seek_and_scan() {
        let mut table = asset_table();
        for path in ["a", "b", "c"] {
            table.put(record("u1", path, 0)).unwrap();
        }
        let range = KeyRange::prefix("u1");
        let last = table.seek(&range, Direction::Prev, None).unwrap();
        assert_eq!(last, Key::array([Key::from("u1"), Key::from("c")]));
        let before = table.seek(&range, Direction::Prev, Some(&last)).unwrap();
        assert_eq!(before, Key::array([Key::from("u1"), Key::from("b")]));

        let all = table.scan(&KeyRange::all(), Direction::Prev);
        assert_eq!(paths(&all), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_index_lifecycle() {
        let mut table = asset_table();
        table.put(record("u1", "a", 1)).unwrap();
        assert!(table.create_index("byPath", IndexSchema::new(KeyPath::single("path"))).is_err());

        table.delete_index("byPath").unwrap();
        assert!(!table.has_index("byPath"));
        assert_eq!(
            table.delete_index("byPath").unwrap_err().kind,
            assetcache_core::FaultKind::NotFound
        );

        table
            .create_index("byPath", IndexSchema::unique(KeyPath::single("path")))
            .unwrap();
        let hits = table
            .index_scan("byPath", &KeyRange::only("a"), Direction::Next)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut table = asset_table();
        table.put(record("u1", "a", 1)).unwrap();
        table.put(record("u2", "b", 1)).unwrap();
        assert_eq!(table.len(), 2);
        table.clear();
        assert!(table.is_empty());
        assert!(table
            .index_scan("byPath", &KeyRange::all(), Direction::Next)
            .unwrap()
            .is_empty());
    }
}

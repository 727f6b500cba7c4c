//! Object-store key model
//!
//! Keys identify records in a table and order entries in an index:
//! - [`Key`]: a number, a string, or an array of keys
//! - [`KeyPath`]: how a key is extracted from a structured record
//! - [`KeyRange`]: a contiguous interval of keys for range scans
//! - [`Direction`]: ascending or descending traversal
//!
//! ## Ordering
//!
//! Keys of different kinds order numbers < strings < arrays. Numbers compare
//! numerically, strings by code point, arrays element by element with a
//! proper prefix ordered first. The empty array is therefore greater than
//! every number and string, which is what makes `[user, []]` a usable upper
//! bound for "every compound key starting with `user`".

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A valid object-store key
#[derive(Debug, Clone)]
pub enum Key {
    /// Numeric key (never NaN)
    Number(f64),
    /// String key
    String(String),
    /// Compound key
    Array(Vec<Key>),
}

impl Key {
    /// Build a compound key from its parts
    pub fn array(parts: impl IntoIterator<Item = Key>) -> Self {
        Key::Array(parts.into_iter().collect())
    }

    /// Convert a structured value into a key
    ///
    /// Returns `None` for values that are not valid keys: null, booleans,
    /// objects, and arrays containing any of those.
    pub fn from_json(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| !f.is_nan()).map(Key::Number),
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
            _ => None,
        }
    }

    /// Convert the key back into a structured value
    ///
    /// Integral numbers that fit an `i64` come back as integers.
    pub fn to_json(&self) -> Value {
        match self {
            Key::Number(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    Value::from(*n as i64)
                } else {
                    Value::from(*n)
                }
            }
            Key::String(s) => Value::String(s.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_json).collect()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::String(_) => 1,
            Key::Array(_) => 2,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        Key::Number(n)
    }
}

impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self {
        Key::Array(items)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Where a key lives inside a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    /// A single dotted path, e.g. `localFileStateInfo.timeStamp`
    Single(String),
    /// Several dotted paths evaluated into an array key
    Compound(Vec<String>),
}

impl KeyPath {
    /// Single-path constructor
    pub fn single(path: impl Into<String>) -> Self {
        KeyPath::Single(path.into())
    }

    /// Compound-path constructor
    pub fn compound<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath::Compound(paths.into_iter().map(Into::into).collect())
    }

    /// Extract the key this path designates from `record`
    ///
    /// Returns `None` when any component is missing or is not a valid key.
    pub fn evaluate(&self, record: &Value) -> Option<Key> {
        match self {
            KeyPath::Single(path) => lookup(record, path).and_then(Key::from_json),
            KeyPath::Compound(paths) => paths
                .iter()
                .map(|p| lookup(record, p).and_then(Key::from_json))
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Single(path) => write!(f, "{}", path),
            KeyPath::Compound(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

fn lookup<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(record);
    }
    path.split('.')
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

/// One end of a [`KeyRange`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    /// Boundary key
    pub key: Key,
    /// Whether the boundary key itself is excluded
    pub open: bool,
}

/// A contiguous interval of keys
///
/// A missing bound means the range is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower bound
    pub lower: Option<Bound>,
    /// Upper bound
    pub upper: Option<Bound>,
}

impl KeyRange {
    /// Every key
    pub fn all() -> Self {
        Self::default()
    }

    /// Exactly one key
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self {
            lower: Some(Bound {
                key: key.clone(),
                open: false,
            }),
            upper: Some(Bound { key, open: false }),
        }
    }

    /// Keys between `lower` and `upper`
    pub fn bound(lower: Key, upper: Key, lower_open: bool, upper_open: bool) -> Self {
        Self {
            lower: Some(Bound {
                key: lower,
                open: lower_open,
            }),
            upper: Some(Bound {
                key: upper,
                open: upper_open,
            }),
        }
    }

    /// Every compound key whose first component is `first`
    ///
    /// Spans `[first]` through `[first, []]`.
    pub fn prefix(first: impl Into<Key>) -> Self {
        let first = first.into();
        Self::bound(
            Key::array([first.clone()]),
            Key::array([first, Key::Array(Vec::new())]),
            false,
            false,
        )
    }

    /// Check whether `key` falls inside the range
    pub fn contains(&self, key: &Key) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(b) if b.open => key > &b.key,
            Some(b) => key >= &b.key,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(b) if b.open => key < &b.key,
            Some(b) => key <= &b.key,
        };
        above_lower && below_upper
    }
}

/// Traversal order of a scan or cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending key order
    #[default]
    Next,
    /// Descending key order
    Prev,
}

//! Convenient imports for assetcache.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use assetcache::prelude::*;
//!
//! let db = AssetDb::new();
//! db.open(&RecordingSink::new());
//! ```

// Main entry point
pub use crate::database::{AssetDb, AssetDbBuilder};

// Error handling
pub use crate::types::{Error, ErrorCode, Result};

// Completion reporting
pub use crate::types::{Completion, CompletionSink, RecordingSink};

// Operation options
pub use assetcache_primitives::{AssetUpdateOption, EvictionPolicy, SortBy, SortOrder};

// Records
pub use crate::types::{ActiveAssetRecord, AssetRecord, Timestamp};

// Re-export serde_json for convenience
pub use serde_json::json;

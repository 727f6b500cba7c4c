//! # assetcache
//!
//! Persistence and cache-eviction layer for local asset synchronization
//! state.
//!
//! assetcache tracks which assets are known locally, their sync and
//! conflict state, and which assets are open in which sessions, and it
//! reclaims cache space by evicting stale, fully synchronized assets.
//!
//! ## Quick Start
//!
//! ```ignore
//! use assetcache::prelude::*;
//!
//! assetcache::init_logging();
//!
//! let db = AssetDb::new();
//! let sink = RecordingSink::new();
//! db.open(&sink);
//!
//! db.create_asset(r#"{"userId":"u1","sandboxPath":"docs/a.psd","assetId":"urn:a"}"#, &sink);
//! db.update_last_heartbeat_timestamp("u1", "docs/a.psd", 1_700_000_000_000, &sink);
//! db.purge_stale_assets(
//!     "u1",
//!     "session-1",
//!     EvictionPolicy { threshold: 1_600_000_000_000, secondary_threshold: 1_650_000_000_000, max_cache_count: 20 },
//!     &sink,
//! );
//!
//! db.close();
//! ```
//!
//! ## Layers
//!
//! - [`AssetDb`] - host boundary: JSON payloads in, one completion per call out
//! - [`AssetStore`], [`ActiveAssetStore`] - typed domain operations
//! - [`assetcache_engine`] - sessions, executor, migrations, record primitives

#![warn(missing_docs)]

mod database;
mod host;
mod logging;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{AssetDb, AssetDbBuilder, DatabaseMetrics};
pub use logging::init_logging;

// Re-export domain stores
pub use assetcache_primitives::{
    ActiveAssetStore, AssetStore, AssetUpdateOption, EvictionPolicy, SortBy, SortOrder,
};

// Re-export types
pub use types::*;

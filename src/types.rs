//! Public types for the assetcache host API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// Records
pub use assetcache_core::{
    ActiveAssetRecord, AssetRecord, ConflictInfo, ConflictRole, FileStateInfo, LifecycleState,
    Timestamp,
};

// Errors
pub use assetcache_core::{Error, ErrorCode, FaultKind, Result};

// Completion reporting
pub use assetcache_core::{Completion, CompletionSink, RecordingSink};

// Engine configuration and registry
pub use assetcache_engine::{DatabaseRegistry, EngineConfig, Outcome};

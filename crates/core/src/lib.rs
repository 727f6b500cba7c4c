//! Core types for assetcache
//!
//! This crate defines the fundamental types shared by every layer:
//! - [`Key`], [`KeyPath`], [`KeyRange`]: the object-store key model
//! - [`AssetRecord`], [`ActiveAssetRecord`]: the two persisted record types
//! - [`Error`], [`ErrorCode`], [`FaultKind`]: the error taxonomy
//! - [`CompletionSink`]: the outcome-reporting interface used by the host boundary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod record;
pub mod sink;

pub use error::{Error, ErrorCode, FaultKind, Result, StoreError};
pub use key::{Direction, Key, KeyPath, KeyRange};
pub use record::{
    ActiveAssetRecord, AssetRecord, ConflictInfo, ConflictRole, FileStateInfo, LifecycleState,
    Timestamp,
};
pub use sink::{Completion, CompletionSink, RecordingSink};

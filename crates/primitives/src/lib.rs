//! Asset cache primitives
//!
//! Stateless facades over the two asset tables:
//! - [`AssetStore`]: CRUD, index queries and field updates on `Assets_Tbl`
//! - [`ActiveAssetStore`]: which asset is open in which session
//! - [`conflict`]: linking an original asset and its conflicted copy
//! - [`eviction`]: the stale-asset sweep
//!
//! Every operation runs in its own transaction and returns an
//! [`Outcome`](assetcache_engine::Outcome).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod active_assets;
pub mod asset_store;
pub mod conflict;
pub mod eviction;

pub use active_assets::ActiveAssetStore;
pub use asset_store::{AssetStore, AssetUpdateOption, SortBy, SortOrder};
pub use eviction::EvictionPolicy;

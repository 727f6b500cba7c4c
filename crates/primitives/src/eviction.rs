//! Cache eviction sweep
//!
//! Walks one user's assets by `userHeartbeatIndex`, most recently active
//! first, in a single read-write transaction over both tables.
//!
//! ## Classification
//!
//! ```text
//! secondary (path contains '_')  -> evaluated against secondary_threshold
//! primary, kept < max_cache_count -> kept += 1, retained
//! primary, otherwise              -> evaluated against threshold
//! ```
//!
//! An evaluated asset is evicted iff its heartbeat, last-sync and local
//! timestamps are all present (non-zero), the heartbeat is older than the
//! threshold, and last-sync equals the local timestamp.
//!
//! Eviction deletes the asset under the cursor, deletes its active entry
//! for the sweeping session, and strips the conflict pointer of its peer.
//! Any failure aborts the transaction and no deletion persists.

use assetcache_core::{ActiveAssetRecord, AssetRecord, Direction, KeyRange, Result, Timestamp};
use assetcache_engine::schema::{ACTIVE_ASSETS_TABLE, ASSETS_TABLE, USER_HEARTBEAT_INDEX};
use assetcache_engine::{execute, Cursor, Outcome, Transaction, TransactionMode};
use serde::{Deserialize, Serialize};

use crate::asset_store::AssetStore;
use crate::conflict::strip_peer;

/// Thresholds and cap of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    /// Primary assets with an older heartbeat are eviction candidates
    pub threshold: Timestamp,
    /// Secondary assets with an older heartbeat are eviction candidates
    pub secondary_threshold: Timestamp,
    /// Most recently active primary assets always retained
    pub max_cache_count: usize,
}

fn present(time_stamp: Option<Timestamp>) -> Option<Timestamp> {
    time_stamp.filter(|&t| t != 0)
}

/// Check if `record` may be evicted at `threshold`
pub fn is_evictable(record: &AssetRecord, threshold: Timestamp) -> bool {
    match (
        present(record.last_heartbeat_time_stamp),
        present(record.last_sync_time_stamp),
        present(record.local_time_stamp()),
    ) {
        (Some(heartbeat), Some(last_sync), Some(local)) => {
            heartbeat < threshold && last_sync == local
        }
        _ => false,
    }
}

/// Run the sweep inside `txn`; returns the evicted records in visiting order
///
/// `None` means the heartbeat index could not be opened. That case is only
/// logged.
pub fn purge_stale_assets(
    txn: &mut Transaction<'_>,
    user_id: &str,
    session_id: &str,
    policy: &EvictionPolicy,
) -> Result<Option<Vec<AssetRecord>>> {
    let mut cursor = match Cursor::open_index(
        txn,
        ASSETS_TABLE,
        USER_HEARTBEAT_INDEX,
        KeyRange::prefix(user_id),
        Direction::Prev,
    ) {
        Ok(cursor) => cursor,
        Err(e) => {
            tracing::error!(user_id, error = %e, "failed to open cursor");
            return Ok(None);
        }
    };

    let mut kept = 0;
    let mut purged = Vec::new();
    while let Some(value) = cursor.advance(txn)? {
        let record = AssetRecord::from_value(value)?;
        let secondary = record.is_secondary();
        let threshold = if secondary {
            policy.secondary_threshold
        } else if kept < policy.max_cache_count {
            kept += 1;
            continue;
        } else {
            policy.threshold
        };

        if !is_evictable(&record, threshold) {
            continue;
        }

        cursor.delete(txn)?;
        txn.delete(
            ACTIVE_ASSETS_TABLE,
            &ActiveAssetRecord::key_for(&record.asset_id, session_id),
        )?;
        if let Some(info) = &record.asset_conflict_info {
            strip_peer(txn, &record.user_id, &info.associated_asset_local_storage_path)?;
        }
        tracing::info!(
            asset_id = %record.asset_id,
            sandbox_path = %record.sandbox_path,
            secondary,
            "purged asset from asset table"
        );
        purged.push(record);
    }

    tracing::debug!(user_id, purged = purged.len(), kept, "eviction sweep finished");
    Ok(Some(purged))
}

impl AssetStore {
    /// Evict stale, fully synchronized assets of `user_id`
    pub fn purge_stale_assets(
        &self,
        user_id: &str,
        session_id: &str,
        policy: &EvictionPolicy,
    ) -> Result<Outcome<Option<Vec<AssetRecord>>>> {
        tracing::debug!(user_id, session_id, ?policy, "purge stale assets");
        execute(
            self.session(),
            &[ASSETS_TABLE, ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "purgeAndGetOldCachedAssets",
            |txn| purge_stale_assets(txn, user_id, session_id, policy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetcache_core::FileStateInfo;

    fn record(heartbeat: Option<i64>, last_sync: Option<i64>, local: Option<i64>) -> AssetRecord {
        let mut record = AssetRecord::new("u", "/p", "A");
        record.last_heartbeat_time_stamp = heartbeat;
        record.last_sync_time_stamp = last_sync;
        record.local_file_state_info = local.map(|ts| FileStateInfo::new(0, ts));
        record
    }

    #[test]
    fn test_evictable_when_stale_and_synced() {
        assert!(is_evictable(&record(Some(10), Some(5), Some(5)), 20));
    }

    #[test]
    fn test_not_evictable_when_recent() {
        assert!(!is_evictable(&record(Some(20), Some(5), Some(5)), 20));
    }

    #[test]
    fn test_not_evictable_with_pending_change() {
        assert!(!is_evictable(&record(Some(10), Some(5), Some(6)), 20));
    }

    #[test]
    fn test_missing_or_zero_timestamps_block_eviction() {
        assert!(!is_evictable(&record(None, Some(5), Some(5)), 20));
        assert!(!is_evictable(&record(Some(10), Some(0), Some(0)), 20));
        assert!(!is_evictable(&record(Some(10), Some(5), None), 20));
    }
}

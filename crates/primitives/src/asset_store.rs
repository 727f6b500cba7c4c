//! AssetStore: locally known assets
//!
//! ## Design: STATELESS FACADE
//!
//! AssetStore holds only an `Arc<Session>`. Every method runs in its own
//! transaction through the executor and returns the settled [`Outcome`].
//! Records live in `Assets_Tbl`, keyed by `[userId, sandboxPath]`.
//!
//! ## Field updates
//!
//! The eight `update_*` methods are read-modify-write:
//!
//! - absent record: success, nothing written (suppressed `NotFoundError`)
//! - record lacks the sub-object being updated (`localFileStateInfo` or
//!   `remoteFileStateInfo`): failure with `Unknown`, nothing written

use assetcache_core::{AssetRecord, Direction, Key, KeyRange, Result, Timestamp};
use assetcache_engine::records::{self, IndexQuery, InsertMode};
use assetcache_engine::schema::{
    ASSETS_TABLE, ASSET_ID_INDEX, USER_HEARTBEAT_INDEX, USER_MODIFIED_TIME_INDEX,
};
use assetcache_engine::{execute, Outcome, Session, TransactionMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Which part of an existing asset [`AssetStore::create_or_update`] replaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetUpdateOption {
    /// Replace the whole record; the only option that creates
    #[default]
    All,
    /// Copy `localFileStateInfo`
    LocalFileStateInfo,
    /// Copy `remoteFileStateInfo`
    RemoteFileStateInfo,
    /// Copy `localFileStateInfo.timeStamp`
    LocalFileTimeStamp,
    /// Copy `remoteFileStateInfo.timeStamp`
    RemoteFileTimeStamp,
    /// Copy `lastSyncTimeStamp`
    LastSyncTimeStamp,
    /// Copy `lastHeartbeatTimeStamp`
    LastHeartbeatTimeStamp,
}

impl AssetUpdateOption {
    /// Apply the payload to an existing record; `None` if a needed sub-object is missing
    pub fn merge(self, existing: AssetRecord, payload: &AssetRecord) -> Option<AssetRecord> {
        let mut record = existing;
        match self {
            AssetUpdateOption::All => return Some(payload.clone()),
            AssetUpdateOption::LocalFileStateInfo => {
                record.local_file_state_info = payload.local_file_state_info.clone();
            }
            AssetUpdateOption::RemoteFileStateInfo => {
                record.remote_file_state_info = payload.remote_file_state_info.clone();
            }
            AssetUpdateOption::LocalFileTimeStamp => {
                let time_stamp = payload.local_file_state_info.as_ref()?.time_stamp;
                record.local_file_state_info.as_mut()?.time_stamp = time_stamp;
            }
            AssetUpdateOption::RemoteFileTimeStamp => {
                let time_stamp = payload.remote_file_state_info.as_ref()?.time_stamp;
                record.remote_file_state_info.as_mut()?.time_stamp = time_stamp;
            }
            AssetUpdateOption::LastSyncTimeStamp => {
                record.last_sync_time_stamp = payload.last_sync_time_stamp;
            }
            AssetUpdateOption::LastHeartbeatTimeStamp => {
                record.last_heartbeat_time_stamp = payload.last_heartbeat_time_stamp;
            }
        }
        Some(record)
    }
}

/// Index used by [`AssetStore::by_user_id`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    /// `lastHeartbeatTimeStamp`
    #[default]
    HeartbeatTime,
    /// `localFileStateInfo.timeStamp`
    ModifiedTime,
}

impl SortBy {
    fn index(self) -> &'static str {
        match self {
            SortBy::HeartbeatTime => USER_HEARTBEAT_INDEX,
            SortBy::ModifiedTime => USER_MODIFIED_TIME_INDEX,
        }
    }
}

/// Order of [`AssetStore::by_user_id`] results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    #[default]
    Ascending,
    /// Newest first
    Descending,
}

impl From<SortOrder> for Direction {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => Direction::Next,
            SortOrder::Descending => Direction::Prev,
        }
    }
}

/// Locally known assets
#[derive(Debug, Clone)]
pub struct AssetStore {
    session: Arc<Session>,
}

impl AssetStore {
    /// Create new AssetStore instance
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Session the store runs against
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn decode_all(values: Vec<Value>) -> Result<Vec<AssetRecord>> {
        values.into_iter().map(AssetRecord::from_value).collect()
    }

    fn query(&self, operation: &str, query: IndexQuery<'_>) -> Result<Outcome<Vec<AssetRecord>>> {
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadOnly,
            operation,
            |txn| Self::decode_all(records::scan_by_index(txn, ASSETS_TABLE, &query)?),
        )
    }

    // ========================================================================
    // Create / remove
    // ========================================================================

    /// Insert a new asset; `ConstraintError` if its key exists
    pub fn create(&self, record: &AssetRecord) -> Result<Outcome<()>> {
        tracing::debug!(user_id = %record.user_id, sandbox_path = %record.sandbox_path, "create asset entry");
        let value = record.to_value()?;
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "createAssetEntry",
            |txn| {
                records::insert(txn, ASSETS_TABLE, value, InsertMode::CreateOnly)?;
                Ok(())
            },
        )
    }

    /// Create or merge into an existing asset according to `option`
    ///
    /// Only [`AssetUpdateOption::All`] creates a missing record; any other
    /// option on a missing record fails with `Unknown` and writes nothing.
    pub fn create_or_update(
        &self,
        record: &AssetRecord,
        option: AssetUpdateOption,
    ) -> Result<Outcome<()>> {
        tracing::debug!(
            user_id = %record.user_id,
            sandbox_path = %record.sandbox_path,
            ?option,
            "create or update asset entry"
        );
        let key = record.key();
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "createOrUpdateAssetEntry",
            |txn| {
                records::upsert(
                    txn,
                    ASSETS_TABLE,
                    &key,
                    |existing| {
                        let existing = AssetRecord::from_value(existing).ok()?;
                        option.merge(existing, record)?.to_value().ok()
                    },
                    || match option {
                        AssetUpdateOption::All => record.to_value().ok(),
                        _ => {
                            tracing::error!(?option, "asset not found, no entry is created");
                            None
                        }
                    },
                )
            },
        )
    }

    /// Delete an asset; absent keys succeed
    pub fn remove(&self, user_id: &str, sandbox_path: &str) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, "remove asset entry");
        let key = AssetRecord::key_for(user_id, sandbox_path);
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "removeAssetEntry",
            |txn| records::delete_by_key(txn, ASSETS_TABLE, &key),
        )
    }

    /// Delete every asset
    pub fn clear(&self) -> Result<Outcome<()>> {
        tracing::debug!("clear assets");
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "clearAssets",
            |txn| records::clear(txn, ASSETS_TABLE),
        )
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch one asset; `NotFoundError` when absent
    pub fn get(&self, user_id: &str, sandbox_path: &str) -> Result<Outcome<AssetRecord>> {
        tracing::debug!(user_id, sandbox_path, "get asset");
        let key = AssetRecord::key_for(user_id, sandbox_path);
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadOnly,
            "getAsset",
            |txn| AssetRecord::from_value(records::get_by_key(txn, ASSETS_TABLE, &key)?),
        )
    }

    /// Last heartbeat of one asset; `NotFoundError` when the asset is absent
    pub fn last_heartbeat_time_stamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
    ) -> Result<Outcome<Option<Timestamp>>> {
        Ok(self
            .get(user_id, sandbox_path)?
            .map(|record| record.last_heartbeat_time_stamp))
    }

    /// Every asset with `asset_id`, in primary-key order
    pub fn by_asset_id(&self, asset_id: &str) -> Result<Outcome<Vec<AssetRecord>>> {
        tracing::debug!(asset_id, "get assets by asset id");
        self.query(
            "getAssetsByAssetID",
            IndexQuery::only(ASSET_ID_INDEX, asset_id),
        )
    }

    /// A user's assets ordered by heartbeat or local modification time
    ///
    /// Assets missing the sort field are not indexed and so not returned.
    pub fn by_user_id(
        &self,
        user_id: &str,
        sort_by: SortBy,
        order: SortOrder,
    ) -> Result<Outcome<Vec<AssetRecord>>> {
        tracing::debug!(user_id, ?sort_by, ?order, "get assets by user id");
        self.query(
            "getAssetsByUserID",
            IndexQuery {
                index: sort_by.index(),
                range: KeyRange::prefix(user_id),
                direction: order.into(),
            },
        )
    }

    // ========================================================================
    // Field updates
    // ========================================================================

    fn update<F>(&self, operation: &str, user_id: &str, sandbox_path: &str, mutate: F) -> Result<Outcome<()>>
    where
        F: FnOnce(&mut AssetRecord) -> Option<()>,
    {
        let key: Key = AssetRecord::key_for(user_id, sandbox_path);
        execute(
            &self.session,
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            operation,
            |txn| {
                records::update(txn, ASSETS_TABLE, &key, |value| {
                    let mut record = AssetRecord::from_value(value).ok()?;
                    if mutate(&mut record).is_none() {
                        tracing::error!(operation, "record is missing the field being updated");
                        return None;
                    }
                    record.to_value().ok()
                })
            },
        )
    }

    /// Set local state and timestamp
    pub fn update_local_file_state_info(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        state: i64,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, state, "update local file state info");
        self.update("updateLocalFileStateInfo", user_id, sandbox_path, |record| {
            let info = record.local_file_state_info.as_mut()?;
            info.state = state;
            info.time_stamp = Some(time_stamp);
            Some(())
        })
    }

    /// Set remote state and timestamp
    pub fn update_remote_file_state_info(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        state: i64,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, state, "update remote file state info");
        self.update("updateRemoteFileStateInfo", user_id, sandbox_path, |record| {
            let info = record.remote_file_state_info.as_mut()?;
            info.state = state;
            info.time_stamp = Some(time_stamp);
            Some(())
        })
    }

    /// Set the local timestamp
    pub fn update_local_file_time_stamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, "update local file timestamp");
        self.update("updateLocalFileTimeStamp", user_id, sandbox_path, |record| {
            record.local_file_state_info.as_mut()?.time_stamp = Some(time_stamp);
            Some(())
        })
    }

    /// Set the remote timestamp
    pub fn update_remote_file_time_stamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, "update remote file timestamp");
        self.update("updateRemoteFileTimeStamp", user_id, sandbox_path, |record| {
            record.remote_file_state_info.as_mut()?.time_stamp = Some(time_stamp);
            Some(())
        })
    }

    /// Set the local timestamp to `updated` if it is still `last`
    ///
    /// When the timestamp moved on, the record is rewritten unchanged.
    pub fn update_local_file_time_stamp_if_unchanged(
        &self,
        user_id: &str,
        sandbox_path: &str,
        updated: Timestamp,
        last: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, updated, last, "update local file timestamp if unchanged");
        self.update("updateLocalFileTimeStampIfNotChanged", user_id, sandbox_path, |record| {
            let info = record.local_file_state_info.as_mut()?;
            if info.time_stamp == Some(last) {
                info.time_stamp = Some(updated);
            }
            Some(())
        })
    }

    /// Set the local timestamp to the last-sync timestamp if it is still `last`
    pub fn update_local_file_time_stamp_to_last_sync_if_unchanged(
        &self,
        user_id: &str,
        sandbox_path: &str,
        last: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, last, "update local file timestamp to last sync if unchanged");
        self.update(
            "updateLocalFileTimeStampWithLastSyncTimeStampIfNotChanged",
            user_id,
            sandbox_path,
            |record| {
                let last_sync = record.last_sync_time_stamp;
                let info = record.local_file_state_info.as_mut()?;
                if info.time_stamp == Some(last) {
                    info.time_stamp = last_sync;
                }
                Some(())
            },
        )
    }

    /// Set the last-sync timestamp
    pub fn update_last_sync_time_stamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, "update last sync timestamp");
        self.update("updateAssetLastSyncTimeStamp", user_id, sandbox_path, |record| {
            record.last_sync_time_stamp = Some(time_stamp);
            Some(())
        })
    }

    /// Set the last-heartbeat timestamp
    pub fn update_last_heartbeat_time_stamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, time_stamp, "update last heartbeat timestamp");
        self.update("updateAssetLastHeartbeatTimeStamp", user_id, sandbox_path, |record| {
            record.last_heartbeat_time_stamp = Some(time_stamp);
            Some(())
        })
    }
}

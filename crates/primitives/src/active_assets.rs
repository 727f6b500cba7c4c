//! ActiveAssetStore: assets open in sessions
//!
//! Stateless facade over `Active_Assets_Tbl`, keyed by
//! `[assetId, sessionId]`, with lookups by either half of the key.

use assetcache_core::{ActiveAssetRecord, Result};
use assetcache_engine::records::{self, IndexQuery, InsertMode};
use assetcache_engine::schema::{
    ACTIVE_ASSETS_TABLE, ACTIVE_ASSET_ID_INDEX, ACTIVE_SESSION_ID_INDEX,
};
use assetcache_engine::{execute, Outcome, Session, TransactionMode};
use serde_json::Value;
use std::sync::Arc;

/// Assets open in sessions
#[derive(Debug, Clone)]
pub struct ActiveAssetStore {
    session: Arc<Session>,
}

fn decode_all(values: Vec<Value>) -> Result<Vec<ActiveAssetRecord>> {
    values.into_iter().map(ActiveAssetRecord::from_value).collect()
}

impl ActiveAssetStore {
    /// Create new ActiveAssetStore instance
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Record that an asset is open in a session, replacing any previous entry
    pub fn create_or_replace(&self, record: &ActiveAssetRecord) -> Result<Outcome<()>> {
        tracing::debug!(asset_id = %record.asset_id, session_id = %record.session_id, "create or replace active asset");
        let value = record.to_value()?;
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "createOrReplaceActiveAssetEntry",
            |txn| {
                records::insert(txn, ACTIVE_ASSETS_TABLE, value, InsertMode::CreateOrReplace)?;
                Ok(())
            },
        )
    }

    /// Delete one entry; absent keys succeed
    pub fn remove(&self, asset_id: &str, session_id: &str) -> Result<Outcome<()>> {
        tracing::debug!(asset_id, session_id, "remove active asset");
        let key = ActiveAssetRecord::key_for(asset_id, session_id);
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "removeActiveAssetEntry",
            |txn| records::delete_by_key(txn, ACTIVE_ASSETS_TABLE, &key),
        )
    }

    /// Delete every entry
    pub fn clear(&self) -> Result<Outcome<()>> {
        tracing::debug!("clear active assets");
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "clearActiveAssets",
            |txn| records::clear(txn, ACTIVE_ASSETS_TABLE),
        )
    }

    /// Fetch one entry; `NotFoundError` when absent
    pub fn get(&self, asset_id: &str, session_id: &str) -> Result<Outcome<ActiveAssetRecord>> {
        let key = ActiveAssetRecord::key_for(asset_id, session_id);
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadOnly,
            "getActiveAsset",
            |txn| ActiveAssetRecord::from_value(records::get_by_key(txn, ACTIVE_ASSETS_TABLE, &key)?),
        )
    }

    /// Every entry in key order
    pub fn all(&self) -> Result<Outcome<Vec<ActiveAssetRecord>>> {
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadOnly,
            "getAllActiveAssets",
            |txn| decode_all(records::scan_all(txn, ACTIVE_ASSETS_TABLE)?),
        )
    }

    fn query(&self, operation: &str, query: IndexQuery<'_>) -> Result<Outcome<Vec<ActiveAssetRecord>>> {
        execute(
            &self.session,
            &[ACTIVE_ASSETS_TABLE],
            TransactionMode::ReadOnly,
            operation,
            |txn| decode_all(records::scan_by_index(txn, ACTIVE_ASSETS_TABLE, &query)?),
        )
    }

    /// Every session that has `asset_id` open
    pub fn by_asset_id(&self, asset_id: &str) -> Result<Outcome<Vec<ActiveAssetRecord>>> {
        tracing::debug!(asset_id, "get active assets by asset id");
        self.query(
            "getActiveAssetsByAssetID",
            IndexQuery::only(ACTIVE_ASSET_ID_INDEX, asset_id),
        )
    }

    /// Every asset open in `session_id`
    pub fn by_session_id(&self, session_id: &str) -> Result<Outcome<Vec<ActiveAssetRecord>>> {
        tracing::debug!(session_id, "get active assets by session id");
        self.query(
            "getActiveAssetsBySessionID",
            IndexQuery::only(ACTIVE_SESSION_ID_INDEX, session_id),
        )
    }
}

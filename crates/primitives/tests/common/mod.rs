//! Shared helpers for primitives integration tests

#![allow(dead_code)]

use std::sync::Arc;

use assetcache_core::{ActiveAssetRecord, AssetRecord, FileStateInfo, Timestamp};
use assetcache_engine::records;
use assetcache_engine::schema::ASSETS_TABLE;
use assetcache_engine::{DatabaseRegistry, EngineConfig, Session, SessionManager, TransactionMode};
use assetcache_primitives::{ActiveAssetStore, AssetStore};

/// Both stores over one fresh database
pub fn stores() -> (AssetStore, ActiveAssetStore) {
    let session = open();
    (AssetStore::new(Arc::clone(&session)), ActiveAssetStore::new(session))
}

/// A fresh session at the current schema version
pub fn open() -> Arc<Session> {
    SessionManager::new(Arc::new(DatabaseRegistry::new()), EngineConfig::default())
        .open()
        .expect("open fresh database")
}

/// Asset with every timestamp the eviction sweep looks at
pub fn synced_asset(
    user: &str,
    path: &str,
    asset_id: &str,
    heartbeat: Timestamp,
    last_sync: Timestamp,
    local: Timestamp,
) -> AssetRecord {
    let mut record = AssetRecord::new(user, path, asset_id);
    record.media_type = "application/vnd.adobe.photoshop+dcx".to_string();
    record.last_heartbeat_time_stamp = Some(heartbeat);
    record.last_sync_time_stamp = Some(last_sync);
    record.local_file_state_info = Some(FileStateInfo::new(0, local));
    record.remote_file_state_info = Some(FileStateInfo::new(0, last_sync));
    record
}

/// Insert `records`, panicking on failure
pub fn seed(store: &AssetStore, records: &[AssetRecord]) {
    for record in records {
        store
            .create(record)
            .expect("seed asset")
            .into_value()
            .expect("seed committed");
    }
}

/// Every asset, in primary-key order
pub fn all_assets(store: &AssetStore) -> Vec<AssetRecord> {
    let txn = store
        .session()
        .transaction(&[ASSETS_TABLE], TransactionMode::ReadOnly)
        .expect("read transaction");
    records::scan_all(&txn, ASSETS_TABLE)
        .expect("scan")
        .into_iter()
        .map(|v| AssetRecord::from_value(v).expect("decode"))
        .collect()
}

/// Store `value` as-is, bypassing the typed record layer
pub fn put_raw(store: &AssetStore, value: serde_json::Value) {
    let mut txn = store
        .session()
        .transaction(&[ASSETS_TABLE], TransactionMode::ReadWrite)
        .expect("write transaction");
    txn.put(ASSETS_TABLE, value).expect("raw put");
    txn.commit().expect("commit");
}

/// Sandbox paths of every asset of `user`, in primary-key order
pub fn paths(store: &AssetStore, user: &str) -> Vec<String> {
    all_assets(store)
        .into_iter()
        .filter(|r| r.user_id == user)
        .map(|r| r.sandbox_path)
        .collect()
}

/// One asset, or `None` if absent
pub fn find(store: &AssetStore, user: &str, path: &str) -> Option<AssetRecord> {
    match store.get(user, path) {
        Ok(outcome) => outcome.into_value(),
        Err(e) if e.is_not_found() => None,
        Err(e) => panic!("unexpected error: {}", e),
    }
}

/// Active entry for `asset_id` in `session_id`
pub fn active(asset_id: &str, session_id: &str) -> ActiveAssetRecord {
    ActiveAssetRecord::new(asset_id, session_id)
}

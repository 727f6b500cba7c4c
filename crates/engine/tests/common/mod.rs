//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use assetcache_core::Result;
use assetcache_engine::migration::initialize;
use assetcache_engine::schema::DATABASE_NAME;
use assetcache_engine::{
    DatabaseRegistry, EngineConfig, Session, SessionManager, Transaction, TransactionMode,
};
use serde_json::{json, Value};

/// Session manager over `registry` opening at `version`
pub fn manager(registry: &Arc<DatabaseRegistry>, version: u32) -> SessionManager {
    SessionManager::new(
        Arc::clone(registry),
        EngineConfig {
            schema_version: version,
            ..EngineConfig::default()
        },
    )
}

/// A fresh database at the current version
pub fn open_fresh() -> Arc<Session> {
    manager(&Arc::new(DatabaseRegistry::new()), 5)
        .open()
        .expect("open fresh database")
}

/// Stage a database stored at `version`, seeded by `seed`
///
/// The staging connection is closed before returning so later opens are
/// not blocked.
pub fn stage<F>(registry: &DatabaseRegistry, version: u32, seed: F)
where
    F: FnOnce(&mut Transaction<'_>) -> Result<()>,
{
    let connection = registry
        .open(DATABASE_NAME, version, |txn, _, _| {
            initialize(txn)?;
            seed(txn)
        })
        .expect("stage legacy database");
    connection.close();
}

/// Every record of `table`
pub fn dump(session: &Session, table: &str) -> Vec<Value> {
    let txn = session
        .transaction(&[table], TransactionMode::ReadOnly)
        .expect("read transaction");
    assetcache_engine::records::scan_all(&txn, table).expect("scan")
}

/// Asset payload with the fields the tests look at
pub fn asset(user: &str, path: &str, asset_id: &str, media_type: &str) -> Value {
    json!({
        "userId": user,
        "sandboxPath": path,
        "assetId": asset_id,
        "mediaType": media_type,
    })
}

/// Active-asset payload
pub fn active(asset_id: &str, session_id: &str) -> Value {
    json!({"assetId": asset_id, "sessionId": session_id})
}

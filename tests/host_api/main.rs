//! Host API Test Suite
//!
//! Drives `AssetDb` the way a host does: JSON payloads in, exactly one
//! completion per call out.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test host_api
//! cargo test --test host_api eviction::
//! ```

use assetcache::prelude::*;
use serde_json::Value;

// Test modules
pub mod active_assets;
pub mod assets;
pub mod connection;
pub mod eviction;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Open a database with default settings and a private registry
pub fn open_db() -> AssetDb {
    AssetDb::builder().open().expect("Failed to open database")
}

/// Run one host call and return its single completion
pub fn call(f: impl FnOnce(&RecordingSink)) -> Completion {
    let sink = RecordingSink::new();
    f(&sink);
    let mut completions = sink.take();
    assert_eq!(completions.len(), 1, "expected exactly one completion");
    completions.remove(0)
}

/// Run one host call that must succeed with a value, and parse it
pub fn value(f: impl FnOnce(&RecordingSink)) -> Value {
    match call(f) {
        Completion::CompletedWithValue(text) => {
            serde_json::from_str(&text).expect("completion value is JSON")
        }
        other => panic!("expected a value, got {:?}", other),
    }
}

/// Failure code of one host call
pub fn code(f: impl FnOnce(&RecordingSink)) -> ErrorCode {
    match call(f) {
        Completion::FailedWithCode(code) => code,
        other => panic!("expected a coded failure, got {:?}", other),
    }
}

/// JSON text of an asset with every timestamp the sweep looks at
pub fn asset_json(user: &str, path: &str, asset_id: &str, heartbeat: i64, last_sync: i64, local: i64) -> String {
    json!({
        "userId": user,
        "sandboxPath": path,
        "assetId": asset_id,
        "mediaType": "application/vnd.adobe.photoshop+dcx",
        "localFileStateInfo": {"state": 1, "timeStamp": local},
        "remoteFileStateInfo": {"state": 1, "timeStamp": last_sync},
        "lastSyncTimeStamp": last_sync,
        "lastHeartbeatTimeStamp": heartbeat,
    })
    .to_string()
}

/// Create an asset, asserting success
pub fn create(db: &AssetDb, json: &str) {
    assert_eq!(call(|s| db.create_asset(json, s)), Completion::Completed);
}

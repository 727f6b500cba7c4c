//! Open, close, configuration and version-change handling

use crate::*;
use assetcache::DatabaseRegistry;
use assetcache_engine::migration::initialize;
use assetcache_engine::schema::DATABASE_NAME;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// OPEN / CLOSE
// =============================================================================

#[test]
fn test_open_and_reopen_both_succeed() {
    let db = AssetDb::new();
    assert_eq!(call(|s| db.open(s)), Completion::Completed);
    assert_eq!(call(|s| db.open(s)), Completion::Completed);
    assert!(db.is_open());
    assert_eq!(db.version().unwrap(), 5);
}

#[test]
fn test_operations_after_close_fail_not_opened() {
    let db = open_db();
    db.close();
    assert!(!db.is_open());
    assert_eq!(
        code(|s| db.get_all_active_assets(s)),
        ErrorCode::DatabaseNotOpened
    );
    // closing twice is harmless
    db.close();
}

#[test]
fn test_data_survives_close_and_reopen() {
    let registry = Arc::new(DatabaseRegistry::new());
    let db = AssetDb::builder().registry(Arc::clone(&registry)).build();
    db.open(&RecordingSink::new());
    create(&db, &asset_json("u1", "/a", "A", 1, 1, 1));
    db.close();

    db.open(&RecordingSink::new());
    let stored = value(|s| db.get_asset("u1", "/a", s));
    assert_eq!(stored["assetId"], "A");
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_invalid_schema_versions_fail_invalid_config() {
    for version in [0, 6] {
        let db = AssetDb::builder().schema_version(version).build();
        assert_eq!(code(|s| db.open(s)), ErrorCode::InvalidConfig);
        assert!(!db.is_open());
    }
}

#[test]
fn test_config_file_selects_database() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "database_name = \"testDB\"\nschema_version = 5").unwrap();

    let registry = Arc::new(DatabaseRegistry::new());
    let db = AssetDb::builder()
        .registry(Arc::clone(&registry))
        .config_file(file.path())
        .unwrap()
        .open()
        .unwrap();

    assert_eq!(db.config().database_name, "testDB");
    assert!(registry.database("testDB").is_some());
    assert!(registry.database(DATABASE_NAME).is_none());
}

#[test]
fn test_opening_below_stored_version_fails() {
    let registry = Arc::new(DatabaseRegistry::new());
    let current = AssetDb::builder().registry(Arc::clone(&registry)).open().unwrap();
    current.close();

    let older = AssetDb::builder()
        .registry(Arc::clone(&registry))
        .schema_version(3)
        .build();
    assert_eq!(code(|s| older.open(s)), ErrorCode::VersionError);
}

// =============================================================================
// VERSION CHANGE
// =============================================================================

#[test]
fn test_upgrade_elsewhere_closes_and_notifies() {
    let registry = Arc::new(DatabaseRegistry::new());
    let seen = Arc::new(AtomicU64::new(0));
    let seen_by_callback = Arc::clone(&seen);

    let old = AssetDb::builder()
        .registry(Arc::clone(&registry))
        .schema_version(4)
        .on_version_change(move |old_version, new_version| {
            seen_by_callback.store(u64::from(old_version * 10 + new_version), Ordering::SeqCst);
        })
        .open()
        .unwrap();

    let new = AssetDb::builder().registry(Arc::clone(&registry)).build();
    assert_eq!(call(|s| new.open(s)), Completion::Completed);

    assert_eq!(seen.load(Ordering::SeqCst), 45);
    assert!(!old.is_open());
    assert_eq!(code(|s| old.clear_assets(s)), ErrorCode::DatabaseNotOpened);
    assert_eq!(new.version().unwrap(), 5);
}

#[test]
fn test_connection_without_handler_blocks_upgrade() {
    let registry = Arc::new(DatabaseRegistry::new());
    let holder = registry
        .open(DATABASE_NAME, 4, |txn, _, _| initialize(txn))
        .unwrap();

    let db = AssetDb::builder().registry(Arc::clone(&registry)).build();
    assert_eq!(code(|s| db.open(s)), ErrorCode::OpenDatabaseBlocked);
    assert!(!db.is_open());

    holder.close();
    assert_eq!(call(|s| db.open(s)), Completion::Completed);
}

#[test]
fn test_legacy_database_is_migrated_on_open() {
    let registry = Arc::new(DatabaseRegistry::new());
    let staging = registry
        .open(DATABASE_NAME, 4, |txn, _, _| {
            initialize(txn)?;
            txn.put(
                "Assets_Tbl",
                json!({"userId": "u1", "sandboxPath": "/keep", "assetId": "K", "mediaType": "x+dcx"}),
            )?;
            txn.put(
                "Assets_Tbl",
                json!({"userId": "u1", "sandboxPath": "/drop", "assetId": "D", "mediaType": "image/png"}),
            )?;
            txn.put("Active_Assets_Tbl", json!({"assetId": "D", "sessionId": "s1"}))?;
            Ok(())
        })
        .unwrap();
    staging.close();

    let db = AssetDb::builder().registry(Arc::clone(&registry)).open().unwrap();

    assert_eq!(value(|s| db.get_asset("u1", "/keep", s))["assetId"], "K");
    assert_eq!(code(|s| db.get_asset("u1", "/drop", s)), ErrorCode::NotFoundError);
    assert_eq!(value(|s| db.get_all_active_assets(s)), json!([]));
}

// =============================================================================
// METRICS
// =============================================================================

#[test]
fn test_metrics_count_transactions() {
    let db = open_db();
    let before = db.metrics().unwrap();

    create(&db, &asset_json("u1", "/a", "A", 1, 1, 1));
    assert_eq!(code(|s| db.create_asset(&asset_json("u1", "/a", "A", 1, 1, 1), s)), ErrorCode::ConstraintError);

    let after = db.metrics().unwrap();
    assert_eq!(after.transactions_committed, before.transactions_committed + 1);
    assert_eq!(after.transactions_aborted, before.transactions_aborted + 1);
    assert_eq!(after.transactions_active, 0);
    assert!(after.commit_rate < 1.0);
}

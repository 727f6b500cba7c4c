//! Eviction sweep through the host boundary

use crate::*;
use assetcache::DatabaseRegistry;
use assetcache_engine::migration::initialize;
use assetcache_engine::schema::{ASSETS_TABLE, DATABASE_NAME, USER_HEARTBEAT_INDEX};
use assetcache_engine::TransactionMode;
use proptest::prelude::*;
use std::sync::Arc;

fn policy(threshold: i64, secondary_threshold: i64, max_cache_count: usize) -> EvictionPolicy {
    EvictionPolicy {
        threshold,
        secondary_threshold,
        max_cache_count,
    }
}

fn purged_paths(list: Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|r| r["sandboxPath"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_purge_reports_evicted_snapshots_in_visit_order() {
    let db = open_db();
    for (i, heartbeat) in [50, 40, 30, 20, 10].into_iter().enumerate() {
        create(&db, &asset_json("u1", &format!("p{}", i + 1), "A", heartbeat, 7, 7));
    }

    let purged = value(|s| db.purge_stale_assets("u1", "s1", policy(35, 35, 2), s));

    assert_eq!(purged_paths(purged.clone()), ["p3", "p4", "p5"]);
    assert_eq!(purged[0]["lastHeartbeatTimeStamp"], 30);
    assert_eq!(code(|s| db.get_asset("u1", "p3", s)), ErrorCode::NotFoundError);
    assert_eq!(value(|s| db.get_asset("u1", "p1", s))["assetId"], "A");
}

#[test]
fn test_purge_with_nothing_to_evict_reports_empty_array() {
    let db = open_db();
    create(&db, &asset_json("u1", "/dirty", "A", 1, 5, 6));
    assert_eq!(
        value(|s| db.purge_stale_assets("u1", "s1", policy(35, 35, 0), s)),
        json!([])
    );
}

#[test]
fn test_purge_cascades_to_active_entry_and_peer() {
    let db = open_db();
    create(&db, &asset_json("u1", "/doc", "A", 100, 1, 1));
    create(&db, &asset_json("u1", "/doc_copy", "B", 10, 1, 1));
    call(|s| db.set_conflict("u1", "/doc", "/doc_copy", s));
    call(|s| {
        db.create_or_replace_active_asset(&json!({"assetId": "B", "sessionId": "s1"}).to_string(), s)
    });

    // "/doc_copy" is secondary: evaluated against the secondary threshold despite the cap
    let purged = value(|s| db.purge_stale_assets("u1", "s1", policy(0, 35, 5), s));

    assert_eq!(purged_paths(purged), ["/doc_copy"]);
    assert!(value(|s| db.get_asset("u1", "/doc", s)).get("assetConflictInfo").is_none());
    assert_eq!(value(|s| db.get_all_active_assets(s)), json!([]));
}

#[test]
fn test_purge_before_open_fails_not_opened() {
    let db = AssetDb::new();
    assert_eq!(
        code(|s| db.purge_stale_assets("u1", "s1", policy(1, 1, 1), s)),
        ErrorCode::DatabaseNotOpened
    );
}

#[test]
fn test_undecodable_record_fails_the_sweep_with_unknown_and_rolls_back() {
    let db = open_db();
    create(&db, &asset_json("u1", "/good", "G", 10, 1, 1));
    create(&db, &asset_json("u1", "/newest", "N", 90, 1, 1));
    {
        let session = db.session().unwrap();
        let mut txn = session
            .transaction(&[ASSETS_TABLE], TransactionMode::ReadWrite)
            .unwrap();
        txn.put(
            ASSETS_TABLE,
            json!({
                "userId": "u1",
                "sandboxPath": "/legacy",
                "assetId": "L",
                "lastHeartbeatTimeStamp": 40,
                "localFileStateInfo": "corrupt",
            }),
        )
        .unwrap();
        txn.commit().unwrap();
    }

    // "/newest" is deleted before "/legacy" is reached
    assert_eq!(
        code(|s| db.purge_stale_assets("u1", "s1", policy(100, 100, 0), s)),
        ErrorCode::Unknown
    );
    assert_eq!(value(|s| db.get_asset("u1", "/newest", s))["assetId"], "N");
    assert_eq!(value(|s| db.get_asset("u1", "/good", s))["assetId"], "G");

    // reads and writes of the record fail the same way
    assert_eq!(code(|s| db.get_asset("u1", "/legacy", s)), ErrorCode::Unknown);
    assert_eq!(
        code(|s| db.update_last_sync_timestamp("u1", "/legacy", 5, s)),
        ErrorCode::Unknown
    );
}

#[test]
fn test_missing_heartbeat_index_reports_nothing() {
    let registry = Arc::new(DatabaseRegistry::new());
    registry
        .open(DATABASE_NAME, 5, |txn, _, _| {
            initialize(txn)?;
            txn.delete_index(ASSETS_TABLE, USER_HEARTBEAT_INDEX)?;
            Ok(())
        })
        .unwrap()
        .close();
    let db = AssetDb::builder().registry(registry).open().unwrap();
    create(&db, &asset_json("u1", "/old", "A", 10, 1, 1));

    let sink = RecordingSink::new();
    db.purge_stale_assets("u1", "s1", policy(35, 35, 0), &sink);

    assert!(sink.take().is_empty());
    assert_eq!(value(|s| db.get_asset("u1", "/old", s))["assetId"], "A");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_cap_protects_most_recent_primary_assets(
        heartbeats in proptest::collection::btree_set(1i64..1_000, 1..15),
        cap in 0usize..6,
    ) {
        let db = open_db();
        for (i, heartbeat) in heartbeats.iter().enumerate() {
            create(&db, &asset_json("u1", &format!("/p{}", i), "A", *heartbeat, 3, 3));
        }

        // every asset is stale, so exactly the newest `cap` survive
        let purged = value(|s| db.purge_stale_assets("u1", "s1", policy(i64::MAX, i64::MAX, cap), s));
        let purged_heartbeats: Vec<i64> = purged
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["lastHeartbeatTimeStamp"].as_i64().unwrap())
            .collect();

        let expected: Vec<i64> = heartbeats.iter().rev().skip(cap).copied().collect();
        prop_assert_eq!(purged_heartbeats, expected);
    }
}

//! Asset host operations: CRUD, queries, field updates, conflicts

use crate::*;

// =============================================================================
// CREATE / GET / REMOVE
// =============================================================================

#[test]
fn test_create_then_get_returns_the_payload() {
    let db = open_db();
    let payload = asset_json("u1", "docs/a.psd", "urn:a", 10, 5, 5);
    create(&db, &payload);

    let stored = value(|s| db.get_asset("u1", "docs/a.psd", s));
    assert_eq!(stored, serde_json::from_str::<Value>(&payload).unwrap());
}

#[test]
fn test_create_existing_fails_with_constraint_error() {
    let db = open_db();
    create(&db, &asset_json("u1", "/a", "A", 1, 1, 1));
    assert_eq!(
        code(|s| db.create_asset(&asset_json("u1", "/a", "B", 1, 1, 1), s)),
        ErrorCode::ConstraintError
    );
}

#[test]
fn test_payload_without_key_fields_fails_with_unknown() {
    let db = open_db();
    assert_eq!(
        code(|s| db.create_asset(r#"{"assetId": "A"}"#, s)),
        ErrorCode::Unknown
    );
    assert_eq!(code(|s| db.create_asset("[]", s)), ErrorCode::Unknown);
}

#[test]
fn test_remove_and_clear() {
    let db = open_db();
    create(&db, &asset_json("u1", "/a", "A", 1, 1, 1));
    create(&db, &asset_json("u1", "/b", "B", 1, 1, 1));

    assert_eq!(call(|s| db.remove_asset("u1", "/a", s)), Completion::Completed);
    assert_eq!(call(|s| db.remove_asset("u1", "/a", s)), Completion::Completed);
    assert_eq!(code(|s| db.get_asset("u1", "/a", s)), ErrorCode::NotFoundError);

    assert_eq!(call(|s| db.clear_assets(s)), Completion::Completed);
    assert_eq!(code(|s| db.get_asset("u1", "/b", s)), ErrorCode::NotFoundError);
}

#[test]
fn test_last_heartbeat_is_text() {
    let db = open_db();
    create(&db, &asset_json("u1", "/a", "A", 42, 1, 1));
    create(&db, r#"{"userId": "u1", "sandboxPath": "/b", "assetId": "B"}"#);

    assert_eq!(
        call(|s| db.get_last_heartbeat_timestamp("u1", "/a", s)),
        Completion::CompletedWithValue("42".to_string())
    );
    assert_eq!(
        call(|s| db.get_last_heartbeat_timestamp("u1", "/b", s)),
        Completion::CompletedWithValue("null".to_string())
    );
}

// =============================================================================
// QUERIES
// =============================================================================

fn ids(list: Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|r| r["assetId"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_queries_by_asset_and_user() {
    let db = open_db();
    create(&db, &asset_json("u1", "/a", "A", 30, 1, 100));
    create(&db, &asset_json("u1", "/b", "B", 10, 1, 300));
    create(&db, &asset_json("u1", "/c", "C", 20, 1, 200));
    create(&db, &asset_json("u2", "/d", "A", 5, 1, 5));

    assert_eq!(ids(value(|s| db.get_assets_by_asset_id("A", s))), ["A", "A"]);
    assert_eq!(value(|s| db.get_assets_by_asset_id("Z", s)), json!([]));

    let by_user = |sort_by, order| ids(value(|s| db.get_assets_by_user_id("u1", sort_by, order, s)));
    assert_eq!(by_user(SortBy::HeartbeatTime, SortOrder::Descending), ["A", "C", "B"]);
    assert_eq!(by_user(SortBy::ModifiedTime, SortOrder::Ascending), ["A", "C", "B"]);
    assert_eq!(by_user(SortBy::ModifiedTime, SortOrder::Descending), ["B", "C", "A"]);
}

// =============================================================================
// CREATE OR UPDATE
// =============================================================================

#[test]
fn test_create_or_update_options() {
    let db = open_db();
    let payload = asset_json("u1", "/a", "A", 1, 2, 3);

    assert_eq!(
        code(|s| db.create_or_update_asset(&payload, AssetUpdateOption::LastHeartbeatTimeStamp, s)),
        ErrorCode::Unknown
    );
    assert_eq!(
        call(|s| db.create_or_update_asset(&payload, AssetUpdateOption::All, s)),
        Completion::Completed
    );

    let newer = asset_json("u1", "/a", "OTHER", 99, 98, 97);
    call(|s| db.create_or_update_asset(&newer, AssetUpdateOption::LastHeartbeatTimeStamp, s));

    let stored = value(|s| db.get_asset("u1", "/a", s));
    assert_eq!(stored["lastHeartbeatTimeStamp"], 99);
    assert_eq!(stored["lastSyncTimeStamp"], 2);
    assert_eq!(stored["assetId"], "A");
}

// =============================================================================
// FIELD UPDATES
// =============================================================================

#[test]
fn test_field_updates() {
    let db = open_db();
    create(&db, &asset_json("u1", "/a", "A", 1, 2, 3));

    call(|s| db.update_local_file_state_info("u1", "/a", 10, 7, s));
    call(|s| db.update_remote_file_state_info("u1", "/a", 11, 8, s));
    call(|s| db.update_last_sync_timestamp("u1", "/a", 12, s));
    call(|s| db.update_last_heartbeat_timestamp("u1", "/a", 13, s));
    let stored = value(|s| db.get_asset("u1", "/a", s));
    assert_eq!(stored["localFileStateInfo"], json!({"state": 7, "timeStamp": 10}));
    assert_eq!(stored["remoteFileStateInfo"], json!({"state": 8, "timeStamp": 11}));
    assert_eq!(stored["lastSyncTimeStamp"], 12);
    assert_eq!(stored["lastHeartbeatTimeStamp"], 13);

    call(|s| db.update_local_file_timestamp("u1", "/a", 20, s));
    call(|s| db.update_remote_file_timestamp("u1", "/a", 21, s));
    let stored = value(|s| db.get_asset("u1", "/a", s));
    assert_eq!(stored["localFileStateInfo"], json!({"state": 7, "timeStamp": 20}));
    assert_eq!(stored["remoteFileStateInfo"], json!({"state": 8, "timeStamp": 21}));

    call(|s| db.update_local_file_timestamp_if_unchanged("u1", "/a", 30, 19, s));
    assert_eq!(value(|s| db.get_asset("u1", "/a", s))["localFileStateInfo"]["timeStamp"], 20);
    call(|s| db.update_local_file_timestamp_if_unchanged("u1", "/a", 30, 20, s));
    assert_eq!(value(|s| db.get_asset("u1", "/a", s))["localFileStateInfo"]["timeStamp"], 30);
    call(|s| db.update_local_file_timestamp_to_last_sync_if_unchanged("u1", "/a", 30, s));
    assert_eq!(value(|s| db.get_asset("u1", "/a", s))["localFileStateInfo"]["timeStamp"], 12);
}

#[test]
fn test_update_of_absent_asset_succeeds_without_writing() {
    let db = open_db();
    assert_eq!(
        call(|s| db.update_last_sync_timestamp("u1", "/none", 5, s)),
        Completion::Completed
    );
    assert_eq!(
        call(|s| db.update_local_file_timestamp_if_unchanged("u1", "/none", 5, 4, s)),
        Completion::Completed
    );
    assert_eq!(code(|s| db.get_asset("u1", "/none", s)), ErrorCode::NotFoundError);
}

#[test]
fn test_update_of_missing_sub_object_fails() {
    let db = open_db();
    create(&db, r#"{"userId": "u1", "sandboxPath": "/a", "assetId": "A"}"#);
    assert_eq!(
        code(|s| db.update_local_file_timestamp("u1", "/a", 5, s)),
        ErrorCode::Unknown
    );
}

// =============================================================================
// CONFLICTS
// =============================================================================

#[test]
fn test_set_and_clear_conflict() {
    let db = open_db();
    create(&db, &asset_json("u1", "/doc", "A", 1, 1, 1));
    create(&db, &asset_json("u1", "/doc-copy", "B", 1, 1, 1));

    assert_eq!(call(|s| db.set_conflict("u1", "/doc", "/doc-copy", s)), Completion::Completed);
    assert_eq!(
        value(|s| db.get_asset("u1", "/doc", s))["assetConflictInfo"],
        json!({
            "assetConflictState": 0,
            "associatedAssetId": "B",
            "associatedAssetLocalStoragePath": "/doc-copy",
        })
    );
    assert_eq!(
        value(|s| db.get_asset("u1", "/doc-copy", s))["assetConflictInfo"]["assetConflictState"],
        1
    );

    assert_eq!(call(|s| db.clear_conflict("u1", "/doc", s)), Completion::Completed);
    for path in ["/doc", "/doc-copy"] {
        assert!(value(|s| db.get_asset("u1", path, s)).get("assetConflictInfo").is_none());
    }
}

#[test]
fn test_set_conflict_with_missing_asset_fails() {
    let db = open_db();
    create(&db, &asset_json("u1", "/doc", "A", 1, 1, 1));
    assert_eq!(
        code(|s| db.set_conflict("u1", "/doc", "/nope", s)),
        ErrorCode::NotFoundError
    );
    assert!(value(|s| db.get_asset("u1", "/doc", s)).get("assetConflictInfo").is_none());
}

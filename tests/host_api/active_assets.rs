//! Active-asset host operations

use crate::*;

fn entry(asset_id: &str, session_id: &str) -> String {
    json!({"assetId": asset_id, "sessionId": session_id}).to_string()
}

#[test]
fn test_create_get_remove() {
    let db = open_db();
    assert_eq!(
        call(|s| db.create_or_replace_active_asset(&entry("A", "s1"), s)),
        Completion::Completed
    );

    let stored = value(|s| db.get_active_asset("A", "s1", s));
    assert_eq!(stored, json!({"assetId": "A", "sessionId": "s1"}));

    assert_eq!(call(|s| db.remove_active_asset("A", "s1", s)), Completion::Completed);
    assert_eq!(
        code(|s| db.get_active_asset("A", "s1", s)),
        ErrorCode::NotFoundError
    );
    // removing an absent entry still succeeds
    assert_eq!(call(|s| db.remove_active_asset("A", "s1", s)), Completion::Completed);
}

#[test]
fn test_replace_keeps_one_row_and_extra_fields() {
    let db = open_db();
    call(|s| db.create_or_replace_active_asset(&entry("A", "s1"), s));
    let replacement = json!({"assetId": "A", "sessionId": "s1", "syncFlag": 1, "openedBy": "tab-3"});
    call(|s| db.create_or_replace_active_asset(&replacement.to_string(), s));

    assert_eq!(value(|s| db.get_all_active_assets(s)), json!([replacement]));
}

#[test]
fn test_lists_are_json_arrays() {
    let db = open_db();
    assert_eq!(value(|s| db.get_all_active_assets(s)), json!([]));
    assert_eq!(value(|s| db.get_active_assets_by_asset_id("A", s)), json!([]));

    for (asset, session) in [("B", "s1"), ("A", "s2"), ("A", "s1")] {
        call(|s| db.create_or_replace_active_asset(&entry(asset, session), s));
    }

    assert_eq!(
        value(|s| db.get_active_assets_by_asset_id("A", s)),
        json!([
            {"assetId": "A", "sessionId": "s1"},
            {"assetId": "A", "sessionId": "s2"},
        ])
    );
    assert_eq!(
        value(|s| db.get_active_assets_by_session_id("s1", s)),
        json!([
            {"assetId": "A", "sessionId": "s1"},
            {"assetId": "B", "sessionId": "s1"},
        ])
    );

    assert_eq!(call(|s| db.clear_active_assets(s)), Completion::Completed);
    assert_eq!(value(|s| db.get_all_active_assets(s)), json!([]));
}

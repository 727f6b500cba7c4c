//! Host boundary operations.
//!
//! Every operation takes its arguments plus a [`CompletionSink`] and reports
//! to it exactly once. Record payloads arrive as JSON text and returned
//! values leave as JSON text; lists are JSON arrays.
//!
//! A payload that does not parse fails with `Unknown` before any
//! transaction is opened. Calling an operation while the database is not
//! open fails with `DatabaseNotOpened`.

use assetcache_core::{ActiveAssetRecord, AssetRecord, CompletionSink, Result, Timestamp};
use assetcache_engine::{report, IntoCompletion, Outcome, Session};
use assetcache_primitives::{
    ActiveAssetStore, AssetStore, AssetUpdateOption, EvictionPolicy, SortBy, SortOrder,
};
use serde::Serialize;
use std::sync::Arc;

use crate::database::AssetDb;

fn encode<T: Serialize>(outcome: Outcome<T>) -> Result<Outcome<String>> {
    Ok(match outcome {
        Outcome::Committed(value) => Outcome::Committed(serde_json::to_string(&value)?),
        Outcome::Suppressed { code } => Outcome::Suppressed { code },
    })
}

fn parse_asset(json: &str) -> Result<AssetRecord> {
    Ok(serde_json::from_str(json)?)
}

fn parse_active_asset(json: &str) -> Result<ActiveAssetRecord> {
    Ok(serde_json::from_str(json)?)
}

impl AssetDb {
    fn run<T, F>(&self, sink: &dyn CompletionSink, operation: F)
    where
        T: IntoCompletion,
        F: FnOnce(Arc<Session>) -> Result<Outcome<T>>,
    {
        report(sink, self.session().and_then(operation));
    }

    fn with_assets<T, F>(&self, sink: &dyn CompletionSink, operation: F)
    where
        T: IntoCompletion,
        F: FnOnce(&AssetStore) -> Result<Outcome<T>>,
    {
        self.run(sink, |session| operation(&AssetStore::new(session)));
    }

    fn with_active_assets<T, F>(&self, sink: &dyn CompletionSink, operation: F)
    where
        T: IntoCompletion,
        F: FnOnce(&ActiveAssetStore) -> Result<Outcome<T>>,
    {
        self.run(sink, |session| operation(&ActiveAssetStore::new(session)));
    }

    // ========================================================================
    // Active assets
    // ========================================================================

    /// Record that an asset is open in a session, replacing any previous entry.
    pub fn create_or_replace_active_asset(&self, json: &str, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| {
            store.create_or_replace(&parse_active_asset(json)?)
        });
    }

    /// Delete one active-asset entry; absent entries succeed.
    pub fn remove_active_asset(&self, asset_id: &str, session_id: &str, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| store.remove(asset_id, session_id));
    }

    /// Delete every active-asset entry.
    pub fn clear_active_assets(&self, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| store.clear());
    }

    /// Report one active-asset entry as JSON.
    pub fn get_active_asset(&self, asset_id: &str, session_id: &str, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| encode(store.get(asset_id, session_id)?));
    }

    /// Report every active-asset entry as a JSON array.
    pub fn get_all_active_assets(&self, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| encode(store.all()?));
    }

    /// Report the sessions holding `asset_id` open.
    pub fn get_active_assets_by_asset_id(&self, asset_id: &str, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| encode(store.by_asset_id(asset_id)?));
    }

    /// Report the assets open in `session_id`.
    pub fn get_active_assets_by_session_id(&self, session_id: &str, sink: &dyn CompletionSink) {
        self.with_active_assets(sink, |store| encode(store.by_session_id(session_id)?));
    }

    // ========================================================================
    // Assets
    // ========================================================================

    /// Insert a new asset; an existing key fails with `ConstraintError`.
    pub fn create_asset(&self, json: &str, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| store.create(&parse_asset(json)?));
    }

    /// Create an asset or merge the field selected by `option` into it.
    pub fn create_or_update_asset(
        &self,
        json: &str,
        option: AssetUpdateOption,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.create_or_update(&parse_asset(json)?, option)
        });
    }

    /// Delete one asset; absent assets succeed.
    pub fn remove_asset(&self, user_id: &str, sandbox_path: &str, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| store.remove(user_id, sandbox_path));
    }

    /// Delete every asset.
    pub fn clear_assets(&self, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| store.clear());
    }

    /// Report one asset as JSON.
    pub fn get_asset(&self, user_id: &str, sandbox_path: &str, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| encode(store.get(user_id, sandbox_path)?));
    }

    /// Report an asset's last heartbeat as text, `null` when unset.
    pub fn get_last_heartbeat_timestamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            encode(store.last_heartbeat_time_stamp(user_id, sandbox_path)?)
        });
    }

    /// Report every asset with `asset_id` as a JSON array.
    pub fn get_assets_by_asset_id(&self, asset_id: &str, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| encode(store.by_asset_id(asset_id)?));
    }

    /// Report a user's assets sorted by heartbeat or local modification time.
    pub fn get_assets_by_user_id(
        &self,
        user_id: &str,
        sort_by: SortBy,
        order: SortOrder,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            encode(store.by_user_id(user_id, sort_by, order)?)
        });
    }

    // ========================================================================
    // Field updates
    // ========================================================================

    /// Set the local state and timestamp.
    pub fn update_local_file_state_info(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        state: i64,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_local_file_state_info(user_id, sandbox_path, time_stamp, state)
        });
    }

    /// Set the remote state and timestamp.
    pub fn update_remote_file_state_info(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        state: i64,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_remote_file_state_info(user_id, sandbox_path, time_stamp, state)
        });
    }

    /// Set the local timestamp.
    pub fn update_local_file_timestamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_local_file_time_stamp(user_id, sandbox_path, time_stamp)
        });
    }

    /// Set the remote timestamp.
    pub fn update_remote_file_timestamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_remote_file_time_stamp(user_id, sandbox_path, time_stamp)
        });
    }

    /// Set the local timestamp to `updated` if it is still `last`.
    pub fn update_local_file_timestamp_if_unchanged(
        &self,
        user_id: &str,
        sandbox_path: &str,
        updated: Timestamp,
        last: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_local_file_time_stamp_if_unchanged(user_id, sandbox_path, updated, last)
        });
    }

    /// Set the local timestamp to the last-sync timestamp if it is still `last`.
    pub fn update_local_file_timestamp_to_last_sync_if_unchanged(
        &self,
        user_id: &str,
        sandbox_path: &str,
        last: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_local_file_time_stamp_to_last_sync_if_unchanged(user_id, sandbox_path, last)
        });
    }

    /// Set the last-sync timestamp.
    pub fn update_last_sync_timestamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_last_sync_time_stamp(user_id, sandbox_path, time_stamp)
        });
    }

    /// Set the last-heartbeat timestamp.
    pub fn update_last_heartbeat_timestamp(
        &self,
        user_id: &str,
        sandbox_path: &str,
        time_stamp: Timestamp,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.update_last_heartbeat_time_stamp(user_id, sandbox_path, time_stamp)
        });
    }

    // ========================================================================
    // Conflicts and eviction
    // ========================================================================

    /// Link an original asset and its conflicted copy.
    pub fn set_conflict(
        &self,
        user_id: &str,
        original_path: &str,
        copy_path: &str,
        sink: &dyn CompletionSink,
    ) {
        self.with_assets(sink, |store| {
            store.set_conflict(user_id, original_path, copy_path)
        });
    }

    /// Unlink an asset from its conflict peer.
    pub fn clear_conflict(&self, user_id: &str, sandbox_path: &str, sink: &dyn CompletionSink) {
        self.with_assets(sink, |store| store.clear_conflict(user_id, sandbox_path));
    }

    /// Evict a user's stale, synchronized assets and report them as a JSON array.
    ///
    /// If the heartbeat index cannot be opened the failure is logged and
    /// nothing is reported.
    pub fn purge_stale_assets(
        &self,
        user_id: &str,
        session_id: &str,
        policy: EvictionPolicy,
        sink: &dyn CompletionSink,
    ) {
        let result = self
            .session()
            .and_then(|session| AssetStore::new(session).purge_stale_assets(user_id, session_id, &policy));
        let result = match result {
            Ok(Outcome::Committed(None)) => return,
            Ok(outcome) => encode(outcome.map(Option::unwrap_or_default)),
            Err(e) => Err(e),
        };
        report(sink, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetcache_core::{Completion, ErrorCode, RecordingSink};

    fn opened() -> AssetDb {
        let db = AssetDb::new();
        db.try_open().unwrap();
        db
    }

    #[test]
    fn test_operations_before_open_fail_not_opened() {
        let db = AssetDb::new();
        let sink = RecordingSink::new();
        db.get_asset("u", "/p", &sink);
        db.clear_active_assets(&sink);
        assert_eq!(
            sink.take(),
            vec![
                Completion::FailedWithCode(ErrorCode::DatabaseNotOpened),
                Completion::FailedWithCode(ErrorCode::DatabaseNotOpened),
            ]
        );
    }

    #[test]
    fn test_malformed_payload_fails_with_unknown() {
        let db = opened();
        let sink = RecordingSink::new();
        db.create_asset("{not json", &sink);
        db.create_or_replace_active_asset(r#"{"assetId": "A"}"#, &sink);
        assert_eq!(
            sink.take(),
            vec![
                Completion::FailedWithCode(ErrorCode::Unknown),
                Completion::FailedWithCode(ErrorCode::Unknown),
            ]
        );
    }

    #[test]
    fn test_encode_keeps_suppression() {
        let outcome: Outcome<u8> = Outcome::Suppressed {
            code: ErrorCode::NotFoundError,
        };
        assert_eq!(encode(outcome).unwrap(), Outcome::Suppressed { code: ErrorCode::NotFoundError });
        assert_eq!(encode(Outcome::Committed(vec![1, 2])).unwrap(), Outcome::Committed("[1,2]".to_string()));
    }
}

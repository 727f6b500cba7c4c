//! Conflict linking
//!
//! A conflict pair is two assets of one user pointing at each other through
//! `assetConflictInfo`: the original carries role `Original` and the copy's
//! id and path, the copy carries role `ConflictedCopy` and the original's.
//!
//! Linking needs both records and writes both or neither. Unlinking clears
//! the target and, if it still exists, the peer. A peer that has already
//! disappeared is not an error.

use assetcache_core::{AssetRecord, ConflictInfo, ConflictRole, Result};
use assetcache_engine::records;
use assetcache_engine::schema::ASSETS_TABLE;
use assetcache_engine::{execute, Outcome, Transaction, TransactionMode};

use crate::asset_store::AssetStore;

pub(crate) fn fetch_asset(txn: &Transaction<'_>, user_id: &str, sandbox_path: &str) -> Result<AssetRecord> {
    let key = AssetRecord::key_for(user_id, sandbox_path);
    AssetRecord::from_value(records::get_by_key(txn, ASSETS_TABLE, &key)?)
}

pub(crate) fn put_asset(txn: &mut Transaction<'_>, record: &AssetRecord) -> Result<()> {
    txn.put(ASSETS_TABLE, record.to_value()?)?;
    Ok(())
}

/// Point `original_path` and `copy_path` at each other
///
/// Aborts with `NotFoundError` if either record is missing.
pub fn link(
    txn: &mut Transaction<'_>,
    user_id: &str,
    original_path: &str,
    copy_path: &str,
) -> Result<()> {
    let mut original = fetch_asset(txn, user_id, original_path).map_err(|e| {
        tracing::warn!(user_id, original_path, "original asset not found");
        e
    })?;
    let mut copy = fetch_asset(txn, user_id, copy_path).map_err(|e| {
        tracing::warn!(user_id, copy_path, "conflicted copy asset not found");
        e
    })?;

    original.asset_conflict_info = Some(ConflictInfo {
        role: ConflictRole::Original,
        associated_asset_id: copy.asset_id.clone(),
        associated_asset_local_storage_path: copy.sandbox_path.clone(),
    });
    copy.asset_conflict_info = Some(ConflictInfo {
        role: ConflictRole::ConflictedCopy,
        associated_asset_id: original.asset_id.clone(),
        associated_asset_local_storage_path: original.sandbox_path.clone(),
    });

    put_asset(txn, &original)?;
    put_asset(txn, &copy)
}

/// Remove the conflict pointer from the peer at `peer_path`, if both exist
///
/// Returns `true` if the peer was rewritten.
pub fn strip_peer(txn: &mut Transaction<'_>, user_id: &str, peer_path: &str) -> Result<bool> {
    let key = AssetRecord::key_for(user_id, peer_path);
    let Some(value) = txn.get(ASSETS_TABLE, &key)? else {
        return Ok(false);
    };
    let mut peer = AssetRecord::from_value(value)?;
    if peer.asset_conflict_info.take().is_none() {
        return Ok(false);
    }
    put_asset(txn, &peer)?;
    Ok(true)
}

/// Clear the conflict pointer of `sandbox_path` and of its peer
///
/// Aborts with `NotFoundError` if the record is missing. Returns `true` if
/// the record held a pointer.
pub fn unlink(txn: &mut Transaction<'_>, user_id: &str, sandbox_path: &str) -> Result<bool> {
    let mut record = fetch_asset(txn, user_id, sandbox_path).map_err(|e| {
        tracing::warn!(user_id, sandbox_path, "asset not found");
        e
    })?;
    let Some(info) = record.asset_conflict_info.take() else {
        return Ok(false);
    };
    put_asset(txn, &record)?;
    strip_peer(txn, user_id, &info.associated_asset_local_storage_path)?;
    Ok(true)
}

impl AssetStore {
    /// Link an original asset and its conflicted copy
    pub fn set_conflict(
        &self,
        user_id: &str,
        original_path: &str,
        copy_path: &str,
    ) -> Result<Outcome<()>> {
        tracing::debug!(user_id, original_path, copy_path, "set conflict info");
        execute(
            self.session(),
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "setAssetConflictInfo",
            |txn| link(txn, user_id, original_path, copy_path),
        )
    }

    /// Unlink an asset from its conflict peer
    pub fn clear_conflict(&self, user_id: &str, sandbox_path: &str) -> Result<Outcome<()>> {
        tracing::debug!(user_id, sandbox_path, "clear conflict info");
        execute(
            self.session(),
            &[ASSETS_TABLE],
            TransactionMode::ReadWrite,
            "clearAssetConflictInfo",
            |txn| unlink(txn, user_id, sandbox_path).map(|_| ()),
        )
    }
}

//! The four schema upgrades

use assetcache_concurrency::Transaction;
use assetcache_core::record::is_composite_media_type;
use assetcache_core::{LifecycleState, Result};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use super::{remove_records, update_properties_in_all_records, MigrationStep};
use crate::schema::{self, ACTIVE_ASSETS_TABLE, ASSETS_TABLE};

/// v1 -> v2: every active asset gets `syncFlag = 0`
#[derive(Debug, Clone, Copy)]
pub struct AddSyncFlag;

impl MigrationStep for AddSyncFlag {
    fn from_version(&self) -> u32 {
        1
    }

    fn name(&self) -> &str {
        "add sync flag to active assets"
    }

    fn apply(&self, txn: &mut Transaction<'_>) -> Result<()> {
        update_properties_in_all_records(txn, ACTIVE_ASSETS_TABLE, |fields| {
            fields.insert("syncFlag".to_string(), json!(0));
        })?;
        Ok(())
    }
}

/// v2 -> v3: every asset gets `repoState = Unknown`
#[derive(Debug, Clone, Copy)]
pub struct AddLifecycleState;

impl MigrationStep for AddLifecycleState {
    fn from_version(&self) -> u32 {
        2
    }

    fn name(&self) -> &str {
        "add lifecycle state to assets"
    }

    fn apply(&self, txn: &mut Transaction<'_>) -> Result<()> {
        update_properties_in_all_records(txn, ASSETS_TABLE, |fields| {
            fields.insert("repoState".to_string(), json!(LifecycleState::UNKNOWN.0));
        })?;
        Ok(())
    }
}

/// v3 -> v4: drop and recreate every index on both tables
#[derive(Debug, Clone, Copy)]
pub struct RebuildIndexes;

impl MigrationStep for RebuildIndexes {
    fn from_version(&self) -> u32 {
        3
    }

    fn name(&self) -> &str {
        "rebuild indexes"
    }

    fn apply(&self, txn: &mut Transaction<'_>) -> Result<()> {
        for (table, definition) in schema::current_schemas() {
            for index in txn.table(&table)?.index_names() {
                txn.delete_index(&table, &index)?;
            }
            schema::create_indexes(txn, &table, &definition)?;
        }
        Ok(())
    }
}

/// v4 -> v5: drop assets that are not composite documents, and their active entries
#[derive(Debug, Clone, Copy)]
pub struct RemoveNonCompositeAssets;

fn is_composite(asset: &Value) -> bool {
    asset
        .get("mediaType")
        .and_then(Value::as_str)
        .is_some_and(is_composite_media_type)
}

impl MigrationStep for RemoveNonCompositeAssets {
    fn from_version(&self) -> u32 {
        4
    }

    fn name(&self) -> &str {
        "remove non-composite assets"
    }

    fn apply(&self, txn: &mut Transaction<'_>) -> Result<()> {
        let removed = remove_records(txn, ASSETS_TABLE, |asset| !is_composite(asset))?;
        let asset_ids: BTreeSet<String> = removed
            .iter()
            .filter_map(|asset| asset.get("assetId").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let removed_active = if asset_ids.is_empty() {
            0
        } else {
            remove_records(txn, ACTIVE_ASSETS_TABLE, |active| {
                active
                    .get("assetId")
                    .and_then(Value::as_str)
                    .is_some_and(|id| asset_ids.contains(id))
            })?
            .len()
        };

        tracing::info!(
            assets = removed.len(),
            active_assets = removed_active,
            "removed non-composite assets"
        );
        Ok(())
    }
}

//! Current-generation schema
//!
//! Two tables, at schema version 5:
//!
//! | Table               | Primary key                 | Indexes |
//! |---------------------|-----------------------------|---------|
//! | `Active_Assets_Tbl` | `[assetId, sessionId]`      | `assetIdIndex`, `sessionIdIndex` |
//! | `Assets_Tbl`        | `[userId, sandboxPath]`     | `assetIndex`, `sandboxPathIndex` (unique), `userHeartbeatIndex`, `userModifiedTimeIndex` |

use assetcache_concurrency::Transaction;
use assetcache_core::{KeyPath, Result};
use assetcache_storage::{IndexSchema, TableSchema};
use std::collections::BTreeMap;

/// Default database name
pub const DATABASE_NAME: &str = "acplLiteDB";

/// Latest schema generation
pub const CURRENT_VERSION: u32 = 5;

/// Table of assets open in sessions
pub const ACTIVE_ASSETS_TABLE: &str = "Active_Assets_Tbl";

/// Table of locally known assets
pub const ASSETS_TABLE: &str = "Assets_Tbl";

/// Active assets by `assetId`
pub const ACTIVE_ASSET_ID_INDEX: &str = "assetIdIndex";
/// Active assets by `sessionId`
pub const ACTIVE_SESSION_ID_INDEX: &str = "sessionIdIndex";

/// Assets by `assetId`
pub const ASSET_ID_INDEX: &str = "assetIndex";
/// Assets by `sandboxPath` (unique)
pub const SANDBOX_PATH_INDEX: &str = "sandboxPathIndex";
/// Assets by `[userId, lastHeartbeatTimeStamp]`
pub const USER_HEARTBEAT_INDEX: &str = "userHeartbeatIndex";
/// Assets by `[userId, localFileStateInfo.timeStamp]`
pub const USER_MODIFIED_TIME_INDEX: &str = "userModifiedTimeIndex";

/// Schema of `Active_Assets_Tbl`
pub fn active_assets_schema() -> TableSchema {
    TableSchema::new(KeyPath::compound(["assetId", "sessionId"]))
        .with_index(
            ACTIVE_ASSET_ID_INDEX,
            IndexSchema::new(KeyPath::single("assetId")),
        )
        .with_index(
            ACTIVE_SESSION_ID_INDEX,
            IndexSchema::new(KeyPath::single("sessionId")),
        )
}

/// Schema of `Assets_Tbl`
pub fn assets_schema() -> TableSchema {
    TableSchema::new(KeyPath::compound(["userId", "sandboxPath"]))
        .with_index(ASSET_ID_INDEX, IndexSchema::new(KeyPath::single("assetId")))
        .with_index(
            SANDBOX_PATH_INDEX,
            IndexSchema::unique(KeyPath::single("sandboxPath")),
        )
        .with_index(
            USER_HEARTBEAT_INDEX,
            IndexSchema::new(KeyPath::compound(["userId", "lastHeartbeatTimeStamp"])),
        )
        .with_index(
            USER_MODIFIED_TIME_INDEX,
            IndexSchema::new(KeyPath::compound([
                "userId",
                "localFileStateInfo.timeStamp",
            ])),
        )
}

/// Both tables by name
pub fn current_schemas() -> BTreeMap<String, TableSchema> {
    BTreeMap::from([
        (ACTIVE_ASSETS_TABLE.to_string(), active_assets_schema()),
        (ASSETS_TABLE.to_string(), assets_schema()),
    ])
}

/// Create a table and its indexes inside a version-change transaction
pub fn create_table(txn: &mut Transaction<'_>, name: &str, schema: &TableSchema) -> Result<()> {
    txn.create_table(name, schema.key_path.clone())?;
    create_indexes(txn, name, schema)
}

/// Create every index of `schema` on an existing table
pub fn create_indexes(txn: &mut Transaction<'_>, name: &str, schema: &TableSchema) -> Result<()> {
    for (index, definition) in &schema.indexes {
        txn.create_index(name, index, definition.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_sets() {
        assert_eq!(
            active_assets_schema().index_names(),
            vec!["assetIdIndex", "sessionIdIndex"]
        );
        let assets = assets_schema();
        assert_eq!(
            assets.index_names(),
            vec![
                "assetIndex",
                "sandboxPathIndex",
                "userHeartbeatIndex",
                "userModifiedTimeIndex"
            ]
        );
        assert!(assets.indexes[SANDBOX_PATH_INDEX].unique);
        assert_eq!(current_schemas().len(), 2);
    }
}

//! Persisted record types
//!
//! Records are stored by the engine as JSON documents; these types are the
//! typed view used by domain operations. Field names follow the host's JSON
//! format and unknown fields are carried through untouched in `extra`, so a
//! read-modify-write never drops data written by a newer host.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::key::Key;

/// Milliseconds since the epoch
pub type Timestamp = i64;

/// Sandbox paths containing this marker belong to secondary assets
pub const SECONDARY_PATH_MARKER: char = '_';

/// Media types of assets that survive the v5 migration end with this suffix
pub const COMPOSITE_MEDIA_SUFFIX: &str = "+dcx";

/// Check if a media type carries the composite-format suffix
pub fn is_composite_media_type(media_type: &str) -> bool {
    media_type.ends_with(COMPOSITE_MEDIA_SUFFIX)
}

// Legacy hosts write `null` where a field was never set.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sync state and timestamp of one side (local or remote) of an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStateInfo {
    /// Host-defined state value
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: i64,
    /// Time of the last change on this side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<Timestamp>,
}

impl FileStateInfo {
    /// State info with both fields set
    pub fn new(state: i64, time_stamp: Timestamp) -> Self {
        Self {
            state,
            time_stamp: Some(time_stamp),
        }
    }
}

/// Which side of a conflict pair a record is
///
/// States written by newer hosts decode as [`ConflictRole::Other`] and are
/// written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ConflictRole {
    /// The asset the conflicted copy was forked from
    Original,
    /// The copy created to hold the conflicting local edits
    ConflictedCopy,
    /// A state this layer does not interpret
    Other(i64),
}

impl From<i64> for ConflictRole {
    fn from(value: i64) -> Self {
        match value {
            0 => ConflictRole::Original,
            1 => ConflictRole::ConflictedCopy,
            other => ConflictRole::Other(other),
        }
    }
}

impl From<ConflictRole> for i64 {
    fn from(role: ConflictRole) -> i64 {
        match role {
            ConflictRole::Original => 0,
            ConflictRole::ConflictedCopy => 1,
            ConflictRole::Other(value) => value,
        }
    }
}

/// Pointer from an asset to its conflict peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    /// Role of the record holding this pointer
    #[serde(rename = "assetConflictState")]
    pub role: ConflictRole,
    /// Asset id of the peer
    pub associated_asset_id: String,
    /// Sandbox path of the peer (same user)
    pub associated_asset_local_storage_path: String,
}

/// Repository lifecycle state, opaque to this layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LifecycleState(pub i64);

impl LifecycleState {
    /// Default value stamped onto legacy records
    pub const UNKNOWN: LifecycleState = LifecycleState(0);
}

/// One locally known asset, keyed by `(userId, sandboxPath)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Owning user
    pub user_id: String,
    /// Location of the asset in the local sandbox
    pub sandbox_path: String,
    /// Cloud asset id
    #[serde(default, deserialize_with = "null_as_default")]
    pub asset_id: String,
    /// Media type tag
    #[serde(default, deserialize_with = "null_as_default")]
    pub media_type: String,
    /// Local side; its timestamp is the local-commit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file_state_info: Option<FileStateInfo>,
    /// Remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_file_state_info: Option<FileStateInfo>,
    /// Last time local and remote were confirmed identical
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time_stamp: Option<Timestamp>,
    /// Last time a session signaled the asset as open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time_stamp: Option<Timestamp>,
    /// Lifecycle state (added in schema v3)
    #[serde(default, rename = "repoState", skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<LifecycleState>,
    /// Conflict pointer, when the asset is part of a conflict pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_conflict_info: Option<ConflictInfo>,
    /// Fields this layer does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetRecord {
    /// Minimal record with just the primary key and asset id
    pub fn new(
        user_id: impl Into<String>,
        sandbox_path: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            sandbox_path: sandbox_path.into(),
            asset_id: asset_id.into(),
            ..Default::default()
        }
    }

    /// Primary key `[userId, sandboxPath]`
    pub fn key(&self) -> Key {
        Self::key_for(&self.user_id, &self.sandbox_path)
    }

    /// Primary key for a user and path
    pub fn key_for(user_id: &str, sandbox_path: &str) -> Key {
        Key::array([Key::from(user_id), Key::from(sandbox_path)])
    }

    /// Local-commit timestamp, if recorded
    pub fn local_time_stamp(&self) -> Option<Timestamp> {
        self.local_file_state_info
            .as_ref()
            .and_then(|info| info.time_stamp)
    }

    /// Check if the asset is classified as secondary by its path
    pub fn is_secondary(&self) -> bool {
        self.sandbox_path.contains(SECONDARY_PATH_MARKER)
    }

    /// Decode from a stored JSON document
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode into a JSON document for storage
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }
}

/// An asset open in a session, keyed by `(assetId, sessionId)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAssetRecord {
    /// Cloud asset id
    pub asset_id: String,
    /// Session holding the asset open
    pub session_id: String,
    /// Sync flag (added in schema v2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_flag: Option<i64>,
    /// Fields this layer does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActiveAssetRecord {
    /// Record for an asset opened in a session
    pub fn new(asset_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Primary key `[assetId, sessionId]`
    pub fn key(&self) -> Key {
        Self::key_for(&self.asset_id, &self.session_id)
    }

    /// Primary key for an asset and session
    pub fn key_for(asset_id: &str, session_id: &str) -> Key {
        Key::array([Key::from(asset_id), Key::from(session_id)])
    }

    /// Decode from a stored JSON document
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode into a JSON document for storage
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }
}

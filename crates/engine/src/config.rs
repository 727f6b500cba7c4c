//! Engine configuration
//!
//! Which database to open and which schema generation to migrate it to.
//! Loadable from TOML:
//!
//! ```toml
//! database_name = "acplLiteDB"
//! schema_version = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use assetcache_core::{Error, Result};

use crate::schema::{CURRENT_VERSION, DATABASE_NAME};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the database in the registry
    pub database_name: String,
    /// Schema generation to open at (1..=current)
    pub schema_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_name: DATABASE_NAME.to_string(),
            schema_version: CURRENT_VERSION,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)
            .map_err(|e| Error::InvalidConfig(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Internal(format!("config encode failed: {}", e)))
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.database_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "database name must not be empty".to_string(),
            ));
        }
        if self.schema_version == 0 || self.schema_version > CURRENT_VERSION {
            return Err(Error::InvalidConfig(format!(
                "schema version {} is outside 1..={}",
                self.schema_version, CURRENT_VERSION
            )));
        }
        Ok(())
    }
}

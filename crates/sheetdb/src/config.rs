//! Session configuration: per-entity overrides of sheet name, header row
//! and column names, loadable from YAML or JSON.
//!
//! ```yaml
//! entities:
//!   Car:
//!     sheet_name: Autók
//!     header_row: 1
//!     columns:
//!       plate: { column_name: Rendszám, key: true }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Keyed by entity type name.
    pub entities: BTreeMap<String, EntityConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityConfig {
    pub sheet_name: Option<String>,
    /// Zero-based.
    pub header_row: Option<u32>,
    /// Keyed by declared field name.
    pub columns: BTreeMap<String, ColumnConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnConfig {
    pub column_name: Option<String>,
    pub key: Option<bool>,
}

impl SessionConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// `.json` files parse as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        tracing::debug!(path = %path.display(), json = is_json, "loading session config");
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn entity(&self, type_name: &str) -> Option<&EntityConfig> {
        self.entities.get(type_name)
    }

    pub fn with_entity(mut self, type_name: impl Into<String>, config: EntityConfig) -> Self {
        self.entities.insert(type_name.into(), config);
        self
    }
}

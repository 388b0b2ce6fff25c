use serde::{Deserialize, Serialize};
use std::env;

pub const KEY_PREFIX_VAR: &str = "SLOTPLAN_KEY_PREFIX";
pub const DEFAULT_SUBGROUP_VAR: &str = "SLOTPLAN_DEFAULT_SUBGROUP";
pub const EXTENSION_VAR: &str = "SLOTPLAN_BITMAP_EXTENSION";

/// Where weekly bitmaps live inside the blob store.
///
/// Keys are laid out as `{key_prefix}/{team}/{subgroup}/{member}` or
/// `{key_prefix}/{team}/{member}` for members outside any subgroup, with
/// `.{extension}` appended when one is configured.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(rename = "keyPrefix")]
    pub key_prefix: String,
    /// Subgroup used for members submitted without one.
    #[serde(rename = "defaultSubgroup")]
    pub default_subgroup: Option<String>,
    pub extension: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            key_prefix: "Teams".to_string(),
            default_subgroup: None,
            extension: None,
        }
    }
}

impl StoreConfig {
    /// Reads the configuration from the environment. Unset or empty
    /// variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = StoreConfig::default();

        StoreConfig {
            key_prefix: var(KEY_PREFIX_VAR)
                .map(|prefix| prefix.trim_end_matches('/').to_string())
                .unwrap_or(defaults.key_prefix),
            default_subgroup: var(DEFAULT_SUBGROUP_VAR),
            extension: var(EXTENSION_VAR).map(|ext| ext.trim_start_matches('.').to_string()),
        }
    }

    pub fn suffix(&self) -> String {
        self.extension
            .as_ref()
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }
}

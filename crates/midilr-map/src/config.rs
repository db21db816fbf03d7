//! Bridge configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/midilr/config.yaml

use crate::command_map::DuplicatePolicy;
use crate::storage;
use crate::table::{Column, SortState};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Folder holding the saved profiles
    /// Default: ~/.config/midilr/profiles
    pub profile_dir: PathBuf,
    /// Profile loaded at start and saved at shutdown (file name inside profile_dir)
    pub default_profile: String,
    /// What happens when a control is bound a second time
    pub duplicate_policy: DuplicatePolicy,
    /// Initial table ordering
    pub sort_column: Column,
    pub sort_ascending: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            profile_dir: config_root().join("profiles"),
            default_profile: "default.yaml".to_string(),
            duplicate_policy: DuplicatePolicy::Replace,
            sort_column: SortState::default().column,
            sort_ascending: SortState::default().ascending,
        }
    }
}

impl BridgeConfig {
    /// Initial table ordering from the sort fields
    pub fn sort_state(&self) -> SortState {
        SortState::new(self.sort_column, self.sort_ascending)
    }

    /// Full path of the default profile
    pub fn default_profile_path(&self) -> PathBuf {
        self.profile_dir.join(&self.default_profile)
    }
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("midilr")
}

/// Get the default config file path
///
/// Returns: ~/.config/midilr/config.yaml
pub fn default_config_path() -> PathBuf {
    config_root().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// A missing, unreadable or invalid file gives the defaults; the last two
/// are logged as warnings.
pub fn load_config(path: &Path) -> BridgeConfig {
    match read_config(path) {
        Ok(Some(config)) => {
            log::info!(
                "load_config: {:?}: profiles in {:?}, default '{}', duplicates {:?}",
                path,
                config.profile_dir,
                config.default_profile,
                config.duplicate_policy
            );
            config
        }
        Ok(None) => {
            log::info!("load_config: No config at {:?}, using defaults", path);
            BridgeConfig::default()
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            BridgeConfig::default()
        }
    }
}

fn read_config(path: &Path) -> Result<Option<BridgeConfig>> {
    let Some(text) = storage::read_if_exists(path)? else {
        return Ok(None);
    };
    let config = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(Some(config))
}

/// Save configuration as YAML, creating the config directory if needed
pub fn save_config(config: &BridgeConfig, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    storage::write_creating_dirs(path, &yaml)?;
    log::info!("save_config: Saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.default_profile, "default.yaml");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.sort_state(), SortState::default());
        assert_eq!(config.sort_column, Column::CommandName);
        assert!(config.default_profile_path().ends_with("profiles/default.yaml"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "duplicate_policy: reject\nsort_column: command_name\n";
        let config: BridgeConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.sort_state(), SortState::new(Column::CommandName, true));
        assert_eq!(config.default_profile, "default.yaml");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = BridgeConfig {
            profile_dir: dir.path().join("profiles"),
            default_profile: "studio.yaml".to_string(),
            duplicate_policy: DuplicatePolicy::Reject,
            sort_column: Column::Channel,
            sort_ascending: false,
        };
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path);
        assert_eq!(loaded.profile_dir, config.profile_dir);
        assert_eq!(loaded.default_profile, "studio.yaml");
        assert_eq!(loaded.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(loaded.sort_state(), SortState::new(Column::Channel, false));
    }

    #[test]
    fn test_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_config(&dir.path().join("absent.yaml"));
        assert_eq!(missing.default_profile, "default.yaml");

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "sort_column: [unterminated").unwrap();
        assert_eq!(load_config(&bad).duplicate_policy, DuplicatePolicy::Replace);
    }
}

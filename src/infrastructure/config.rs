use crate::domain::{
    config::PeriboardConfig,
    error::{PeriboardError, PeriboardResult},
};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager
///
/// Layers a project-local `.periboard/config.toml` (found by walking up
/// from the working directory) over the per-user config. The project
/// file wins when both exist.
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> PeriboardResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_config(&self) -> PeriboardResult<PeriboardConfig> {
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                return self.load_config_from_path(project_path);
            }
        }

        if self.global_config_path.exists() {
            return self.load_config_from_path(&self.global_config_path);
        }

        Ok(PeriboardConfig::default())
    }

    /// Load configuration from a specific file
    pub fn load_config_from_path(&self, path: &Path) -> PeriboardResult<PeriboardConfig> {
        let content = fs::read_to_string(path).map_err(|e| PeriboardError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| PeriboardError::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }

    /// Save configuration to the per-user config file
    pub fn save_config(&self, config: &PeriboardConfig) -> PeriboardResult<()> {
        self.save_config_to_path(&self.global_config_path, config)
    }

    /// Save configuration to a specific file
    pub fn save_config_to_path(
        &self,
        path: &Path,
        config: &PeriboardConfig,
    ) -> PeriboardResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PeriboardError::Config {
                message: format!("failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| PeriboardError::Config {
            message: format!("failed to serialize configuration: {}", e),
        })?;

        fs::write(path, content).map_err(|e| PeriboardError::Config {
            message: format!("failed to write {}: {}", path.display(), e),
        })
    }

    pub fn global_config_path(&self) -> &Path {
        &self.global_config_path
    }

    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_config_path.as_deref()
    }

    /// Get per-user configuration path
    fn get_global_config_path() -> PeriboardResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| PeriboardError::Config {
            message: "could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("periboard").join("config.toml"))
    }

    /// Find project configuration path by walking up the directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".periboard").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
            path = path.parent()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        ConfigManager {
            global_config_path: PathBuf::from("/nonexistent/config.toml"),
            project_config_path: None,
        }
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let config = manager().load_config().unwrap();
        assert_eq!(config.global.timeout_ms, 5000);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = PeriboardConfig::default();
        config.device.zstage.up_position = 825;

        let manager = manager();
        manager.save_config_to_path(&path, &config).unwrap();
        let reloaded = manager.load_config_from_path(&path).unwrap();

        assert_eq!(reloaded.device.zstage.up_position, 825);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not = [valid").unwrap();

        let result = manager().load_config_from_path(&path);
        assert!(matches!(result, Err(PeriboardError::Config { .. })));
    }
}

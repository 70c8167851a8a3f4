//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::{ConfigError, ReaderConfig};

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: readlog.toml
        search_paths.push(PathBuf::from("readlog.toml"));

        // 2. User config directory: ~/.config/readlog/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("readlog").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load and validate configuration from the first available file.
    ///
    /// # Errors
    ///
    /// Returns an error if no config file exists, or if the first one found
    /// cannot be read, parsed or validated.
    pub fn load(&self) -> Result<ReaderConfig, ConfigError> {
        let Some(path) = self.find_config_file() else {
            return Err(ConfigError::NotFound {
                searched: self.search_paths.clone(),
            });
        };
        tracing::debug!(path = %path.display(), "Loading config file");
        let config = Self::load_from_path(&path)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            aliases = config.aliases.len(),
            directory = %config.log_directory.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration from a specific path without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<ReaderConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_loader_default_paths() {
        let loader = ConfigLoader::new();
        assert!(!loader.search_paths().is_empty());
        assert!(loader.search_paths()[0].ends_with("readlog.toml"));
    }

    #[test]
    fn test_config_loader_fails_when_no_file() {
        let loader = ConfigLoader::with_path(PathBuf::from("/nonexistent/path.toml"));
        assert!(matches!(loader.load(), Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_and_validate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readlog.toml");
        std::fs::write(
            &path,
            r#"
            logDirectory = "/tmp/logs"

            [aliases.app]
            regexp = '.*'
            pathFilter = 'app.*\.log'
            "#,
        )
        .unwrap();

        let config = ConfigLoader::with_path(path).load().unwrap();
        assert_eq!(config.aliases.len(), 1);
        assert_eq!(config.aliases["app"].path_filter, r"app.*\.log");
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readlog.toml");
        std::fs::write(&path, "logDirectory = [").unwrap();

        assert!(matches!(
            ConfigLoader::with_path(path).load(),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readlog.toml");
        std::fs::write(&path, r#"logDirectory = "/tmp/logs""#).unwrap();

        assert!(matches!(
            ConfigLoader::with_path(path).load(),
            Err(ConfigError::NoAliases)
        ));
    }
}

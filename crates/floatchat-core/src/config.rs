use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

/// Base URL used when neither the environment nor the config file names one
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Environment variable that overrides the configured base URL
pub const API_URL_ENV: &str = "FLOATCHAT_API_URL";

const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FALLBACK_ASSETS_DIR: &str = "assets/fallback";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub status_timeout_secs: Option<u64>,
    pub fallback_assets_dir: Option<String>,
    pub plots_dir: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Base URL of the analysis service: env var, then config, then default
    pub fn api_base_url(&self) -> String {
        let env_url = std::env::var(API_URL_ENV).ok();
        resolve_base_url(env_url.as_deref(), self.api_base_url.as_deref())
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs.unwrap_or(DEFAULT_STATUS_TIMEOUT_SECS))
    }

    pub fn fallback_assets_dir(&self) -> String {
        self.fallback_assets_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_FALLBACK_ASSETS_DIR.to_string())
    }

    /// Where saved plot images are written
    pub fn plots_dir(&self) -> PathBuf {
        if let Some(dir) = &self.plots_dir {
            return PathBuf::from(dir);
        }
        dirs::download_dir()
            .map(|p| p.join("floatchat"))
            .unwrap_or_else(|| PathBuf::from("plots"))
    }

    /// Directory holding the config file and the log file
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("floatchat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

fn resolve_base_url(env_url: Option<&str>, configured: Option<&str>) -> String {
    let chosen = [env_url, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL);

    chosen.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.status_timeout(), Duration::from_secs(5));
        assert_eq!(config.fallback_assets_dir(), "assets/fallback");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base_url: Some("http://ocean.example:8080/api".to_string()),
            status_timeout_secs: Some(2),
            fallback_assets_dir: None,
            plots_dir: Some("/tmp/floatchat-plots".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.status_timeout(), Duration::from_secs(2));
        assert_eq!(loaded.plots_dir(), PathBuf::from("/tmp/floatchat-plots"));
    }

    #[test]
    fn test_partial_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api_base_url": "http://10.0.0.5:5000/api/" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://10.0.0.5:5000/api/"));
        assert!(config.status_timeout_secs.is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_base_url_resolution_order() {
        assert_eq!(resolve_base_url(None, None), DEFAULT_API_BASE_URL);
        assert_eq!(
            resolve_base_url(None, Some("http://cfg:1/api/")),
            "http://cfg:1/api"
        );
        assert_eq!(
            resolve_base_url(Some("http://env:2/api"), Some("http://cfg:1/api")),
            "http://env:2/api"
        );
        // Blank values are ignored
        assert_eq!(
            resolve_base_url(Some("  "), Some("http://cfg:1/api")),
            "http://cfg:1/api"
        );
    }
}

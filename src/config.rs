use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_base_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "jobsync")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load config.toml from the platform config directory; defaults apply when
/// the file is absent.
pub fn load_config() -> Result<Config> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: Config = toml::from_str(&contents).context("Failed to parse config.toml")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        assert_eq!(Config::default().base_url, "http://127.0.0.1:8001");
    }

    #[test]
    fn test_parse_config_override() {
        let config: Config = toml::from_str("base_url = \"https://jobsync.example.com\"").unwrap();
        assert_eq!(config.base_url, "https://jobsync.example.com");
    }

    #[test]
    fn test_parse_empty_config_uses_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8001");
    }
}

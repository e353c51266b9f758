//! CLI configuration utilities

use anyhow::{Context, Result};
use jobdm_http::ClientConfig;
use std::path::{Path, PathBuf};

/// File name of the generated client configuration
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Data directory when `--data-dir` and `JOBDM_STATE_DIR` are both unset
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobdm")
}

/// Resolve the client configuration for a command
///
/// An explicit `config_path` must exist. Otherwise `<data_dir>/config.json` is
/// used when present, falling back to defaults plus `JOBDM_*` variables.
/// `api_url` overrides whatever was loaded.
pub fn load_client_config(
    data_dir: &Path,
    config_path: Option<&Path>,
    api_url: Option<&str>,
) -> Result<ClientConfig> {
    let default_path = data_dir.join(CONFIG_FILE_NAME);
    let config = match config_path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None if default_path.exists() => ClientConfig::from_file(&default_path)
            .with_context(|| format!("failed to load config from {}", default_path.display()))?,
        None => ClientConfig::from_env()?,
    };

    match api_url {
        Some(url) => Ok(ClientConfig {
            api_url: url.to_string(),
            ..config
        }
        .validate()?),
        None => Ok(config),
    }
}

/// Save client configuration to JSON file
pub fn save_client_config<P: AsRef<Path>>(config: &ClientConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_client_config(&ClientConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        generate_default_config(&path).unwrap();
        let config = load_client_config(dir.path(), None, None).unwrap();

        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_api_url_flag_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        generate_default_config(&path).unwrap();

        let config =
            load_client_config(dir.path(), Some(&path), Some("https://api.jobdm.io/")).unwrap();

        assert_eq!(config.api_url, "https://api.jobdm.io");
    }

    #[test]
    fn test_invalid_api_url_flag_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(load_client_config(dir.path(), None, Some("not a url")).is_err());
    }

    #[test]
    fn test_default_data_dir_is_jobdm_scoped() {
        assert!(default_data_dir().ends_with("jobdm"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(load_client_config(dir.path(), Some(&missing), None).is_err());
    }
}

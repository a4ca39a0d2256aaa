//! CLI subcommands.

pub mod config;
pub mod extract;
pub mod serve;

use std::path::{Path, PathBuf};

use brdoc_core::models::config::BrdocConfig;
use tracing::debug;

/// Platform configuration file (`~/.config/brdoc/config.json` on Linux).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("brdoc")
        .join("config.json")
}

/// Configuration file in effect: `--config` if given, else the platform path.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration; a missing default file means defaults, a missing
/// explicit file is an error.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<BrdocConfig> {
    let path = config_path(explicit);

    if explicit.is_none() && !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(BrdocConfig::default());
    }

    read_config(&path)
}

fn read_config(path: &Path) -> anyhow::Result<BrdocConfig> {
    BrdocConfig::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_must_exist() {
        assert!(load_config(Some("/nonexistent/brdoc.json")).is_err());
    }

    #[test]
    fn test_explicit_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 9100}}"#).unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.pdf.render_dpi, 200);
    }
}

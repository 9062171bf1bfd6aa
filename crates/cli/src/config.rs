//! CLI configuration utilities

use anyhow::{Context, Result};
use portal_core::{FileStorage, PortalConfig};
use std::path::{Path, PathBuf};
use tracing::info;

/// Load configuration from defaults, an optional file and `PORTAL_*` variables
pub fn load(path: Option<&Path>) -> Result<PortalConfig> {
    if let Some(path) = path {
        info!("Loading configuration from: {}", path.display());
    }
    PortalConfig::load(path).context("Failed to load configuration")
}

/// Session file location: the flag wins over configuration, then the platform default
pub fn state_file(flag: Option<PathBuf>, config: &PortalConfig) -> Result<PathBuf> {
    flag.or_else(|| config.storage.path.clone())
        .or_else(FileStorage::default_path)
        .context("Could not determine a data directory; pass --state-file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_file_precedence() {
        let mut config = PortalConfig::default();
        config.storage.path = Some(PathBuf::from("/from/config.json"));

        let flag = Some(PathBuf::from("/from/flag.json"));
        assert_eq!(state_file(flag, &config).unwrap(), PathBuf::from("/from/flag.json"));
        assert_eq!(state_file(None, &config).unwrap(), PathBuf::from("/from/config.json"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://api.example.com\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
    }
}

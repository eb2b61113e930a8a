use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::{expand_path, home_dir};

use super::cli::CliConfig;
use super::constants::{APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Storage configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StorageFileConfig {
    pub data_dir: Option<String>,
}

/// Pricing configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PricingFileConfig {
    pub file: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub storage: Option<StorageFileConfig>,
    pub pricing: Option<PricingFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Top-level keys that matched no known section
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        let keys = self.unknown_fields();
        if !keys.is_empty() {
            tracing::warn!(
                fields = %keys.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(storage) = other.storage {
            let current = self.storage.get_or_insert_with(StorageFileConfig::default);
            if storage.data_dir.is_some() {
                tracing::trace!(data_dir = ?storage.data_dir, "Merging storage.data_dir");
                current.data_dir = storage.data_dir;
            }
        }

        if let Some(pricing) = other.pricing {
            let current = self.pricing.get_or_insert_with(PricingFileConfig::default);
            if pricing.file.is_some() {
                tracing::trace!(file = ?pricing.file, "Merging pricing.file");
                current.file = pricing.file;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    /// Data directory override; platform default when `None`
    pub data_dir: Option<PathBuf>,
}

/// Pricing configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingConfig {
    /// Pricing JSON file; `pricing.json` in the data directory when `None`
    pub file: Option<PathBuf>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pricing: PricingConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.spanstore/spanstore.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::resolve(cli, file_config)
    }

    /// Layer defaults, file config and CLI/env overrides, then validate
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_storage = file_config.storage.unwrap_or_default();
        let file_pricing = file_config.pricing.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let data_dir = cli
            .data_dir
            .as_ref()
            .map(|p| expand_path(&p.to_string_lossy()))
            .or_else(|| file_storage.data_dir.as_deref().map(expand_path));

        let pricing_file = cli
            .pricing_file
            .as_ref()
            .map(|p| expand_path(&p.to_string_lossy()))
            .or_else(|| file_pricing.file.as_deref().map(expand_path));

        let config = Self {
            server: ServerConfig { host, port },
            storage: StorageConfig { data_dir },
            pricing: PricingConfig { file: pricing_file },
        };

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration resolved");
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        Ok(())
    }
}

fn get_profile_config_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_file_config_parse_full() {
        let config = parse(
            r#"{
                "server": { "host": "0.0.0.0", "port": 8080 },
                "storage": { "data_dir": "/srv/spans" },
                "pricing": { "file": "/etc/pricing.json" }
            }"#,
        );

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(
            config.storage.as_ref().unwrap().data_dir.as_deref(),
            Some("/srv/spans")
        );
        assert_eq!(
            config.pricing.as_ref().unwrap().file.as_deref(),
            Some("/etc/pricing.json")
        );
        assert!(config.unknown_fields().is_empty());
    }

    #[test]
    fn test_file_config_unknown_fields() {
        let config = parse(r#"{ "sever": { "port": 1 }, "server": { "port": 2 } }"#);
        assert_eq!(config.unknown_fields(), vec!["sever"]);
        assert_eq!(config.server.unwrap().port, Some(2));
    }

    #[test]
    fn test_merge_other_takes_precedence() {
        let mut base = parse(r#"{ "server": { "host": "10.0.0.1", "port": 7000 } }"#);
        base.merge(parse(
            r#"{ "server": { "port": 7001 }, "pricing": { "file": "/p.json" } }"#,
        ));

        let server = base.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("10.0.0.1"));
        assert_eq!(server.port, Some(7001));
        assert_eq!(base.pricing.unwrap().file.as_deref(), Some("/p.json"));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default()).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(config.pricing.file, None);
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let cli = CliConfig {
            port: Some(9100),
            data_dir: Some(PathBuf::from("/cli/data")),
            ..Default::default()
        };
        let file = parse(
            r#"{ "server": { "host": "0.0.0.0", "port": 9000 }, "storage": { "data_dir": "/file/data" } }"#,
        );

        let config = AppConfig::resolve(&cli, file).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/cli/data")));
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let cli = CliConfig {
            port: Some(0),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let cli = CliConfig {
            host: Some("  ".to_string()),
            ..Default::default()
        };
        let err = AppConfig::resolve(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_load_missing_config_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/definitely/not/here/spanstore.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{ "server": { "port": 6123 }, "pricing": { "file": "/opt/pricing.json" } }"#,
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.port, 6123);
        assert_eq!(config.pricing.file, Some(PathBuf::from("/opt/pricing.json")));
    }

    #[test]
    fn test_load_malformed_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cli = CliConfig {
            config: Some(path),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}

//! Platform-aware data storage directory management
//!
//! ## Platform Paths
//!
//! | Type | Windows | macOS | Linux |
//! |------|---------|-------|-------|
//! | Data | `%APPDATA%\SpanStore\` | `~/Library/Application Support/SpanStore/` | `$XDG_DATA_HOME/spanstore/` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::config::AppConfig;
use super::constants::{APP_DOT_FOLDER, APP_NAME};

/// Data subdirectories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    Duckdb,
}

impl DataSubdir {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSubdir::Duckdb => "duckdb",
        }
    }

    /// Subdirectories created on startup
    pub const fn all() -> &'static [DataSubdir] {
        &[DataSubdir::Duckdb]
    }
}

/// Application storage manager
#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Initialize storage, creating the data directory and its subdirectories
    pub async fn init(config: &AppConfig) -> Result<Self> {
        let data_dir = Self::resolve_data_dir(config.storage.data_dir.as_deref());

        // Create directories first (canonicalize requires path to exist)
        Self::ensure_directories(&data_dir).await?;

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);
        tracing::debug!(data_dir = %data_dir.display(), "Storage initialized");

        Ok(Self { data_dir })
    }

    /// Resolve data directory from the configured override or platform default
    pub fn resolve_data_dir(configured: Option<&Path>) -> PathBuf {
        if let Some(dir) = configured {
            return dir.to_path_buf();
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            return proj_dirs.data_dir().to_path_buf();
        }

        // Fallback to local .spanstore
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(APP_DOT_FOLDER)
    }

    async fn ensure_directories(data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        for subdir in DataSubdir::all() {
            let path = data_dir.join(subdir.as_str());
            tokio::fs::create_dir_all(&path).await.with_context(|| {
                format!(
                    "Failed to create {} directory: {}",
                    subdir.as_str(),
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to a subdirectory (canonicalized)
    pub fn subdir(&self, subdir: DataSubdir) -> PathBuf {
        let path = self.data_dir.join(subdir.as_str());
        path.canonicalize().unwrap_or(path)
    }

    /// Create AppStorage for testing with a specific data directory
    #[cfg(test)]
    pub fn init_for_test(data_dir: PathBuf) -> Self {
        for subdir in DataSubdir::all() {
            std::fs::create_dir_all(data_dir.join(subdir.as_str()))
                .expect("Failed to create test subdirectory");
        }
        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AppConfig, PricingConfig, ServerConfig, StorageConfig};
    use tempfile::TempDir;

    #[test]
    fn test_data_subdir_as_str() {
        assert_eq!(DataSubdir::Duckdb.as_str(), "duckdb");
        assert_eq!(DataSubdir::all(), &[DataSubdir::Duckdb]);
    }

    #[test]
    fn test_resolve_data_dir_override() {
        let path = AppStorage::resolve_data_dir(Some(Path::new("/tmp/spans")));
        assert_eq!(path, PathBuf::from("/tmp/spans"));
    }

    #[test]
    fn test_resolve_data_dir_fallback() {
        let path = AppStorage::resolve_data_dir(None);
        assert!(!path.as_os_str().is_empty());
    }

    #[tokio::test]
    async fn test_init_creates_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("data");
        let config = AppConfig {
            server: ServerConfig::default(),
            storage: StorageConfig {
                data_dir: Some(root.clone()),
            },
            pricing: PricingConfig::default(),
        };

        let storage = AppStorage::init(&config).await.unwrap();
        assert!(root.join("duckdb").is_dir());
        assert_eq!(storage.data_dir(), root.canonicalize().unwrap());
        assert!(storage.subdir(DataSubdir::Duckdb).ends_with("duckdb"));
    }
}

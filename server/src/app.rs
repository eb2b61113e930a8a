//! Core application

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, DEFAULT_PRICING_FILENAME, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{DuckdbService, SpanRepository};
use crate::domain::pricing::FilePricingSource;
use crate::domain::traces::TraceIngestor;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub store: Arc<DuckdbService>,
    pub ingestor: Arc<TraceIngestor>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;

        let store = Arc::new(
            DuckdbService::init(&storage)
                .await
                .context("Failed to open span store")?,
        );

        let pricing_path = Self::pricing_path(&config, &storage);
        let pricing = FilePricingSource::new(pricing_path);
        tracing::debug!(path = %pricing.path().display(), "Pricing table source");

        let repo: Arc<dyn SpanRepository> = Arc::new(Arc::clone(&store));
        let ingestor = Arc::new(TraceIngestor::new(repo, Arc::new(pricing)));
        let shutdown = ShutdownService::new(Arc::clone(&store));

        Ok(Self {
            shutdown,
            config,
            storage,
            store,
            ingestor,
        })
    }

    /// Configured pricing file, else `pricing.json` in the data directory
    fn pricing_path(config: &AppConfig, storage: &AppStorage) -> PathBuf {
        config
            .pricing
            .file
            .clone()
            .unwrap_or_else(|| storage.data_dir().join(DEFAULT_PRICING_FILENAME))
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers before serving
        app.shutdown.install_signal_handlers();

        tracing::info!(
            data_dir = %app.storage.data_dir().display(),
            host = %app.config.server.host,
            port = app.config.server.port,
            "Starting span store"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PricingConfig, ServerConfig, StorageConfig};
    use tempfile::TempDir;

    fn config(pricing_file: Option<PathBuf>) -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            pricing: PricingConfig { file: pricing_file },
        }
    }

    #[test]
    fn test_pricing_path_defaults_to_data_dir() {
        let dir = TempDir::new().unwrap();
        let storage = AppStorage::init_for_test(dir.path().to_path_buf());

        assert_eq!(
            CoreApp::pricing_path(&config(None), &storage),
            dir.path().join(DEFAULT_PRICING_FILENAME)
        );
        assert_eq!(
            CoreApp::pricing_path(&config(Some(PathBuf::from("/etc/p.json"))), &storage),
            PathBuf::from("/etc/p.json")
        );
    }

    #[tokio::test]
    async fn test_init_opens_store_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            data_dir: Some(dir.path().join("data")),
            config: Some(write_empty_config(&dir)),
            ..Default::default()
        };

        let app = CoreApp::init(&cli).await.unwrap();
        assert!(app.storage.data_dir().join("duckdb").is_dir());

        let summary = app
            .ingestor
            .ingest(vec![
                serde_json::from_value(serde_json::json!({"traceId": "t", "spanId": "s"}))
                    .unwrap(),
            ])
            .await
            .unwrap();
        assert_eq!(summary.accepted, 1);

        app.shutdown.shutdown().await;
        assert!(app.shutdown.is_triggered());
    }

    fn write_empty_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("spanstore.json");
        std::fs::write(&path, "{}").unwrap();
        path
    }
}

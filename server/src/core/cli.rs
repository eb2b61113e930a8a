use clap::Parser;

use std::path::PathBuf;

use super::constants::{ENV_CONFIG, ENV_DATA_DIR, ENV_HOST, ENV_PORT, ENV_PRICING_FILE};

#[derive(Parser)]
#[command(name = "spanstore")]
#[command(version, about = "LLM telemetry span store and query engine", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Data directory (holds the DuckDB database)
    #[arg(long, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,

    /// Pricing table JSON file, re-read before every ingestion batch
    #[arg(long, env = ENV_PRICING_FILE)]
    pub pricing_file: Option<PathBuf>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub pricing_file: Option<PathBuf>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            data_dir: cli.data_dir,
            pricing_file: cli.pricing_file,
        }
    }
}

/// Parse CLI arguments
pub fn parse() -> CliConfig {
    Cli::parse().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "spanstore",
            "-H",
            "0.0.0.0",
            "-p",
            "8080",
            "--data-dir",
            "/tmp/data",
            "--pricing-file",
            "/tmp/pricing.json",
        ])
        .unwrap();
        let config = CliConfig::from(cli);

        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/data")));
        assert_eq!(config.pricing_file, Some(PathBuf::from("/tmp/pricing.json")));
    }

    #[test]
    fn test_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["spanstore", "--port", "not-a-port"]).is_err());
    }
}

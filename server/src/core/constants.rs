// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "SpanStore";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".spanstore";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "spanstore.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SPANSTORE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "SPANSTORE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "SPANSTORE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SPANSTORE_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default log filter when neither SPANSTORE_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,spanstore=info";

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "SPANSTORE_DATA_DIR";

/// Environment variable for the pricing table JSON file
pub const ENV_PRICING_FILE: &str = "SPANSTORE_PRICING_FILE";

/// DuckDB database file name (inside the `duckdb/` data subdirectory)
pub const DUCKDB_DB_FILENAME: &str = "spanstore.duckdb";

/// Pricing file name looked up in the data directory when none is configured
pub const DEFAULT_PRICING_FILENAME: &str = "pricing.json";

// =============================================================================
// API Limits
// =============================================================================

/// Maximum accepted length of trace/span/session/run ids in request paths
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum request body size for span ingestion (bytes)
pub const MAX_INGEST_BODY_BYTES: usize = 16 * 1024 * 1024;

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for converted blobs
    #[serde(default = "default_blob_path")]
    pub blob_path: String,
    /// Scratch directory for staged uploads and converter output
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    /// Raster images larger than this on either side are downsampled before vectorizing
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
    /// Upper bound on the inflated size of a DOCX document part
    #[serde(default = "default_max_docx_xml_bytes")]
    pub max_docx_xml_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_db_path() -> String {
    "data/docshift.db".to_string()
}

fn default_blob_path() -> String {
    "data/blobs".to_string()
}

fn default_work_dir() -> String {
    "data/work".to_string()
}

fn default_max_image_dimension() -> u32 {
    500
}

fn default_max_docx_xml_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_horizon_days() -> i64 {
    7
}

fn default_sweep_interval_secs() -> u64 {
    3600 // hourly
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_path: default_blob_path(),
            work_dir: default_work_dir(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: default_max_image_dimension(),
            max_docx_xml_bytes: default_max_docx_xml_bytes(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Longest accepted retention horizon (about a century)
pub const MAX_HORIZON_DAYS: i64 = 36_500;

impl RetentionConfig {
    /// Retention horizon, always between one day and `MAX_HORIZON_DAYS`
    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.horizon_days.clamp(1, MAX_HORIZON_DAYS))
    }

    /// Pull out-of-range values back into range, logging each correction
    fn normalize(&mut self) {
        let days = self.horizon_days.clamp(1, MAX_HORIZON_DAYS);
        if days != self.horizon_days {
            tracing::warn!(
                "retention.horizon_days={} is out of range, using {}",
                self.horizon_days,
                days
            );
            self.horizon_days = days;
        }
        if self.sweep_interval_secs == 0 {
            tracing::warn!("retention.sweep_interval_secs=0 is out of range, using 1");
            self.sweep_interval_secs = 1;
        }
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.retention.normalize();
        config.ensure_directories()?;
        tracing::info!(
            "Retention: horizon={}d, sweep every {}s",
            config.retention.horizon_days,
            config.retention.sweep_interval_secs
        );
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: DS_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("DS_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("DS_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("DS_CONF_SERVER_MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.server.max_upload_bytes = bytes;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("DS_CONF_DATABASE_PATH") {
            if !val.trim().is_empty() {
                self.database.path = val;
            }
        }

        // Storage overrides
        if let Ok(val) = env::var("DS_CONF_STORAGE_BLOB_PATH") {
            self.storage.blob_path = val;
        }
        if let Ok(val) = env::var("DS_CONF_STORAGE_WORK_DIR") {
            self.storage.work_dir = val;
        }

        // Conversion overrides
        if let Ok(val) = env::var("DS_CONF_CONVERSION_MAX_IMAGE_DIMENSION") {
            if let Ok(dim) = val.parse() {
                self.conversion.max_image_dimension = dim;
            }
        }

        if let Ok(val) = env::var("DS_CONF_CONVERSION_MAX_DOCX_XML_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.conversion.max_docx_xml_bytes = bytes;
            }
        }

        // Retention overrides
        if let Ok(val) = env::var("DS_CONF_RETENTION_HORIZON_DAYS") {
            if let Ok(days) = val.parse() {
                self.retention.horizon_days = days;
            }
        }
        if let Ok(val) = env::var("DS_CONF_RETENTION_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.retention.sweep_interval_secs = secs;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        fs::create_dir_all(&self.storage.blob_path)?;
        fs::create_dir_all(&self.storage.work_dir)?;

        Ok(())
    }
}

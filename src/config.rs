use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Which station this program scans for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Station number sent with every upsert
    pub station_no: String,
    /// Customer-side station whose daily count is also shown
    pub station_no_cus: Option<String>,
    /// Factory code used to scope the daily counts
    pub factory_code: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            station_no: "1".to_string(),
            station_no_cus: None,
            factory_code: String::new(),
        }
    }
}

/// Central database gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the procedure gateway (e.g., "http://db-gateway.local:8080")
    pub server_url: Option<String>,
    /// Bearer token, if the gateway requires one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Name of the upsert stored procedure
    pub procedure: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            procedure: "SP_UpsertEpcRecord".to_string(),
            request_timeout_ms: 20_000,
        }
    }
}

impl RemoteConfig {
    /// Returns true if a gateway URL is set
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Reachability probing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// URL probed on every tick; defaults to `<server_url>/health`
    pub probe_url: Option<String>,
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
    /// Wait after coming back online before draining the queue
    pub sync_delay_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: 2,
            probe_timeout_ms: 1_500,
            sync_delay_secs: 2,
        }
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn sync_delay(&self) -> Duration {
        Duration::from_secs(self.sync_delay_secs)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the local SQLite store (offline queue and scan logs)
    pub database_path: ConfigValue<PathBuf>,
    /// Directory holding the audit logs
    pub log_dir: ConfigValue<PathBuf>,
    /// Station number, tracked separately because it identifies every write
    pub station_no: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub station: StationConfig,
    pub remote: RemoteConfig,
    pub connectivity: ConnectivityConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    station: Option<StationConfig>,
    remote: Option<RemoteConfig>,
    connectivity: Option<ConnectivityConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut database_path =
            ConfigValue::new(data_dir.join("station.db"), ConfigSource::Default);
        let mut log_dir = ConfigValue::new(data_dir.join("log"), ConfigSource::Default);
        let mut config_file = None;
        let mut station = StationConfig::default();
        let mut station_source = ConfigSource::Default;
        let mut remote = RemoteConfig::default();
        let mut connectivity = ConnectivityConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.log_dir {
                log_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(station_config) = file_config.station {
                station = station_config;
                station_source = ConfigSource::File;
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(connectivity_config) = file_config.connectivity {
                connectivity = connectivity_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("EPCSCAN_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("EPCSCAN_LOG_DIR") {
            log_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(no) = std::env::var("EPCSCAN_STATION_NO") {
            station.station_no = no;
            station_source = ConfigSource::Environment;
        }
        if let Ok(no) = std::env::var("EPCSCAN_STATION_NO_CUS") {
            station.station_no_cus = Some(no);
        }
        if let Ok(code) = std::env::var("EPCSCAN_FACTORY_CODE") {
            station.factory_code = code;
        }
        if let Ok(url) = std::env::var("EPCSCAN_SERVER_URL") {
            remote.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("EPCSCAN_API_KEY") {
            remote.api_key = Some(key);
        }

        let station_no = ConfigValue::new(station.station_no.clone(), station_source);

        Ok(Self {
            database_path,
            log_dir,
            station_no,
            config_file,
            station,
            remote,
            connectivity,
        })
    }

    /// URL hit by the reachability probe, if any can be derived
    pub fn probe_url(&self) -> Option<String> {
        self.connectivity.probe_url.clone().or_else(|| {
            self.remote
                .server_url
                .as_ref()
                .map(|url| format!("{}/health", url.trim_end_matches('/')))
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/epcscan/
    /// - macOS: ~/Library/Application Support/epcscan/
    /// - Windows: %APPDATA%/epcscan/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("epcscan")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/epcscan/
    /// - macOS: ~/Library/Application Support/epcscan/
    /// - Windows: %APPDATA%/epcscan/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("epcscan")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Relative paths in the config file are relative to the file itself
fn resolve_relative(config_path: &std::path::Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

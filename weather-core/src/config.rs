use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// One entry of the static city table.
///
/// The table is loaded once at startup and injected into the refresh
/// engine; identity key is the city name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub timezone: String,
}

/// Application environment, controlling CORS strictness and how much
/// error detail leaks to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(anyhow::anyhow!(
                "Invalid environment '{s}'. Use 'development' or 'production'."
            )),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS in production; empty means allow-all
    /// (development behavior).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), allowed_origins: Vec::new() }
    }
}

/// Open-Meteo upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; a single attempt is made, no retries.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}

/// Persistence settings for the sled reading store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Top-level configuration, read from a TOML file at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Static API key expected in the `X-API-Key` header. When absent,
    /// authentication is disabled.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Minutes a cached reading stays fresh; 0 refreshes on every request.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: i64,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// City table; defaults to the fixed set of 6 tracked cities.
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig::default(),
            api_key: None,
            upstream: UpstreamConfig::default(),
            refresh_interval_minutes: default_refresh_interval(),
            database: DatabaseConfig::default(),
            cities: default_cities(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_db_path() -> PathBuf {
    PathBuf::from("weather_db")
}

const fn default_refresh_interval() -> i64 {
    1
}

/// The fixed set of tracked cities.
pub fn default_cities() -> Vec<CityConfig> {
    [
        ("Tokyo", 35.6895, 139.6917, "Asia/Tokyo"),
        ("San Diego", 32.7628, -117.1633, "America/Los_Angeles"),
        ("Las Vegas", 36.1699, -115.1398, "America/Los_Angeles"),
        ("London", 51.5074, -0.1278, "Europe/London"),
        ("Sydney", -33.8688, 151.2093, "Australia/Sydney"),
        ("New York", 40.7128, -74.0060, "America/New_York"),
    ]
    .into_iter()
    .map(|(name, lat, lng, timezone)| CityConfig {
        name: name.to_string(),
        lat,
        lng,
        timezone: timezone.to_string(),
    })
    .collect()
}

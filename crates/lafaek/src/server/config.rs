//! Service configuration
//!
//! Settings are read once at startup: an optional YAML file first, then
//! command-line flags and environment variables on top. The resulting
//! [`ServiceConfig`] is validated and never changes afterwards.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use tally::AnalyzerOptions;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const MAX_DISTANCE_CONCURRENCY: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse config file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("Invalid configuration: {message}")]
  Invalid { message: String },
}

impl ConfigError {
  fn invalid(message: impl Into<String>) -> Self {
    Self::Invalid { message: message.into() }
  }
}

/// Deployment environment
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  Development,
  #[default]
  Production,
}

impl Environment {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Development => "development",
      Self::Production => "production",
    }
  }

  pub fn is_development(&self) -> bool {
    matches!(self, Self::Development)
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Environment {
  type Err = ConfigError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "development" | "dev" => Ok(Self::Development),
      "production" | "prod" => Ok(Self::Production),
      other => Err(ConfigError::invalid(format!("unknown environment '{other}'"))),
    }
  }
}

/// Connection settings for the TiDB report store
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: String,
  pub name: String,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      host: "localhost".to_string(),
      port: 4000,
      user: "root".to_string(),
      password: String::new(),
      name: "db_ecolafaek".to_string(),
    }
  }
}

// Keep the password out of logs
impl fmt::Debug for DatabaseConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DatabaseConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("password", &"***")
      .field("name", &self.name)
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
  /// Maximum in-flight distance queries per request
  pub distance_concurrency: usize,
  pub request_timeout_secs: u64,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    let defaults = AnalyzerOptions::default();
    Self {
      distance_concurrency: defaults.distance_concurrency,
      request_timeout_secs: defaults.timeout.as_secs(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  pub environment: Environment,
  pub bind: SocketAddr,
  pub database: DatabaseConfig,
  pub analysis: AnalysisConfig,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      environment: Environment::default(),
      bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
      database: DatabaseConfig::default(),
      analysis: AnalysisConfig::default(),
    }
  }
}

/// Command-line and environment overrides, applied over the file
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
  /// Server bind address
  #[arg(long, env = "LAFAEK_BIND")]
  pub bind: Option<SocketAddr>,

  /// Deployment environment
  #[arg(long = "env", env = "LAFAEK_ENV", value_enum)]
  pub environment: Option<Environment>,

  /// TiDB host
  #[arg(long, env = "DB_HOST")]
  pub db_host: Option<String>,

  /// TiDB port
  #[arg(long, env = "DB_PORT")]
  pub db_port: Option<u16>,

  /// TiDB user
  #[arg(long, env = "DB_USER")]
  pub db_user: Option<String>,

  /// TiDB password
  #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
  pub db_password: Option<String>,

  /// TiDB database name
  #[arg(long, env = "DB_NAME")]
  pub db_name: Option<String>,

  /// Maximum in-flight distance queries per request
  #[arg(long)]
  pub distance_concurrency: Option<usize>,

  /// Per-request analysis budget in seconds
  #[arg(long)]
  pub request_timeout_secs: Option<u64>,
}

/// Default location of the server config file
pub fn default_config_path() -> Option<PathBuf> {
  dirs::home_dir().map(|home| home.join(".lafaek").join("server.yaml"))
}

impl ServiceConfig {
  /// Load from an explicit file, or from the default location when it exists
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::from_file(path),
      None => match default_config_path() {
        Some(path) if path.exists() => Self::from_file(&path),
        _ => Ok(Self::default()),
      },
    }
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    if text.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
    if let Some(bind) = overrides.bind {
      self.bind = bind;
    }
    if let Some(environment) = overrides.environment {
      self.environment = environment;
    }
    if let Some(host) = &overrides.db_host {
      self.database.host = host.clone();
    }
    if let Some(port) = overrides.db_port {
      self.database.port = port;
    }
    if let Some(user) = &overrides.db_user {
      self.database.user = user.clone();
    }
    if let Some(password) = &overrides.db_password {
      self.database.password = password.clone();
    }
    if let Some(name) = &overrides.db_name {
      self.database.name = name.clone();
    }
    if let Some(concurrency) = overrides.distance_concurrency {
      self.analysis.distance_concurrency = concurrency;
    }
    if let Some(secs) = overrides.request_timeout_secs {
      self.analysis.request_timeout_secs = secs;
    }
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.database.host.trim().is_empty() {
      return Err(ConfigError::invalid("database host must not be empty"));
    }
    if self.database.name.trim().is_empty() {
      return Err(ConfigError::invalid("database name must not be empty"));
    }
    if self.database.port == 0 {
      return Err(ConfigError::invalid("database port must not be 0"));
    }

    let concurrency = self.analysis.distance_concurrency;
    if !(1..=MAX_DISTANCE_CONCURRENCY).contains(&concurrency) {
      return Err(ConfigError::invalid(format!(
        "distance_concurrency must be between 1 and {MAX_DISTANCE_CONCURRENCY}, got {concurrency}"
      )));
    }
    if self.analysis.request_timeout_secs == 0 {
      return Err(ConfigError::invalid("request_timeout_secs must be at least 1"));
    }

    Ok(())
  }

  /// TLS to the store is verified in production only
  pub fn require_verified_tls(&self) -> bool {
    !self.environment.is_development()
  }

  pub fn analyzer_options(&self) -> AnalyzerOptions {
    AnalyzerOptions {
      distance_concurrency: self.analysis.distance_concurrency,
      timeout: Duration::from_secs(self.analysis.request_timeout_secs),
    }
  }
}

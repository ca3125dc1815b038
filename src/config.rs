use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "APP";

/// Connection string variable used by existing function-host deployments.
pub const LEGACY_CONNECTION_STRING_VAR: &str = "SqlConnectionString";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (required)
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Function key required on the order routes; open when unset
    #[serde(default)]
    pub function_key: Option<String>,

    /// CORS: comma-separated list of allowed origins, permissive when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            function_key: None,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Configured function key, ignoring blank values
    pub fn function_key(&self) -> Option<&str> {
        self.function_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Allowed CORS origins, empty when none are configured
    pub fn cors_origins(&self) -> Vec<&str> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.db_idle_timeout_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cakehaven_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from `config/` and the process environment
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. The legacy `SqlConnectionString` variable as the default database URL
/// 3. Default config (config/default.toml)
/// 4. Environment-specific config (config/{env}.toml)
/// 5. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR), None)
}

/// Loads configuration from `config_dir`.
///
/// When `vars` is given it replaces the process environment for every
/// variable lookup, which keeps tests independent of each other.
pub fn load_config_from(
    config_dir: &Path,
    vars: Option<HashMap<String, String>>,
) -> Result<AppConfig, AppConfigError> {
    let lookup = |key: &str| match &vars {
        Some(map) => map.get(key).cloned(),
        None => env::var(key).ok(),
    };

    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = lookup("RUN_ENV")
        .or_else(|| lookup("APP_ENV"))
        .unwrap_or_else(|| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let mut builder = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?;

    if let Some(legacy) = lookup(LEGACY_CONNECTION_STRING_VAR).filter(|v| !v.trim().is_empty()) {
        info!(
            "Using {} as the default database URL",
            LEGACY_CONNECTION_STRING_VAR
        );
        builder = builder.set_default("database_url", legacy)?;
    }

    let env_source = Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .source(vars.clone().map(|map| map.into_iter().collect::<Map<_, _>>()));

    let config = builder
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(env_source)
        .build()?;

    // The connection string has no default; refuse to start without one
    if config.get_string("database_url").is_err() {
        error!(
            "Database URL is not configured. Set APP__DATABASE_URL or {}.",
            LEGACY_CONNECTION_STRING_VAR
        );
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "database_url is required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn missing_database_url_fails_fast() {
        let dir = TempDir::new().unwrap();
        let result = load_config_from(dir.path(), vars(&[]));
        assert_matches!(result, Err(AppConfigError::Load(ConfigError::NotFound(_))));
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = load_config_from(dir.path(), vars(&[("APP__DATABASE_URL", "")]));
        assert_matches!(result, Err(AppConfigError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("database_url"));
        });
    }

    #[test]
    fn env_overrides_apply_with_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(
            dir.path(),
            vars(&[
                ("APP__DATABASE_URL", "sqlite::memory:"),
                ("APP__PORT", "9090"),
                ("APP__FUNCTION_KEY", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.database_url(), "sqlite::memory:");
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.function_key(), Some("secret"));
        assert!(!cfg.auto_migrate);
        assert_eq!(cfg.environment, DEFAULT_ENV);
    }

    #[test]
    fn legacy_connection_string_is_used_when_no_url_is_set() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(
            dir.path(),
            vars(&[(LEGACY_CONNECTION_STRING_VAR, "postgres://localhost/cakes")]),
        )
        .unwrap();
        assert_eq!(cfg.database_url(), "postgres://localhost/cakes");
    }

    #[test]
    fn app_variable_wins_over_legacy_connection_string() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(
            dir.path(),
            vars(&[
                (LEGACY_CONNECTION_STRING_VAR, "postgres://localhost/legacy"),
                ("APP__DATABASE_URL", "postgres://localhost/current"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.database_url(), "postgres://localhost/current");
    }

    #[test]
    fn profile_file_layers_over_default_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            "database_url = \"postgres://localhost/default\"\nport = 8081\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("production.toml"),
            "database_url = \"postgres://db/prod\"\nlog_json = true\n",
        )
        .unwrap();

        let cfg = load_config_from(dir.path(), vars(&[("RUN_ENV", "production")])).unwrap();

        assert_eq!(cfg.database_url(), "postgres://db/prod");
        assert_eq!(cfg.port, 8081);
        assert!(cfg.log_json);
        assert_eq!(cfg.environment, "production");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = load_config_from(
            dir.path(),
            vars(&[
                ("APP__DATABASE_URL", "sqlite::memory:"),
                ("APP__LOG_LEVEL", "loud"),
            ]),
        );
        assert_matches!(result, Err(AppConfigError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("log_level"));
        });
    }

    #[test]
    fn cors_origins_skip_blank_entries() {
        let mut cfg = AppConfig::new("sqlite::memory:");
        cfg.cors_allowed_origins = Some("https://cakehaven.example, ,https://admin.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://cakehaven.example", "https://admin.example"]
        );
    }

    #[test]
    fn blank_function_key_counts_as_unset() {
        let mut cfg = AppConfig::new("sqlite::memory:");
        cfg.function_key = Some("   ".into());
        assert_eq!(cfg.function_key(), None);
    }
}

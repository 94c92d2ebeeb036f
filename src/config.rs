use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_PROJECTION_WINDOW_DAYS: u32 = 90;
const DEFAULT_HISTORY_WINDOW_DAYS: u32 = 365;
const DEFAULT_SNAPSHOT_MONTHS: u32 = 12;
const DEFAULT_TOP_PRODUCTS_LIMIT: usize = 50;
const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;
const DEFAULT_INVESTMENT_DAYS_ANALYZED: u32 = 90;

/// Look-back windows and list sizes used by the profit analysis.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Trailing days of sales feeding the monthly projection and breakdown
    #[serde(default = "default_projection_window_days")]
    #[validate(range(min = 1, max = 366))]
    pub projection_window_days: u32,

    /// Trailing days of sales feeding the monthly and ROI history
    #[serde(default = "default_history_window_days")]
    #[validate(range(min = 28, max = 3660))]
    pub history_window_days: u32,

    /// How many monthly inventory snapshots to request
    #[serde(default = "default_snapshot_months")]
    #[validate(range(min = 1, max = 120))]
    pub snapshot_months: u32,

    /// Size of the most/least profitable product lists
    #[serde(default = "default_top_products_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub top_products_limit: usize,

    /// Number of investment recommendations returned
    #[serde(default = "default_recommendation_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub recommendation_limit: usize,

    /// Day count used to turn units sold into rotation speed
    #[serde(default = "default_investment_days_analyzed")]
    #[validate(range(min = 1, max = 3660))]
    pub investment_days_analyzed: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            projection_window_days: default_projection_window_days(),
            history_window_days: default_history_window_days(),
            snapshot_months: default_snapshot_months(),
            top_products_limit: default_top_products_limit(),
            recommendation_limit: default_recommendation_limit(),
            investment_days_analyzed: default_investment_days_analyzed(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Analysis windows and limits
    #[serde(default)]
    #[validate]
    pub analysis: AnalysisSettings,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with default pool and analysis settings
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            analysis: AnalysisSettings::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks that cannot be expressed as per-field validator attributes.
    pub fn validate_additional_constraints(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = validator::ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.analysis.history_window_days < self.analysis.projection_window_days {
            let mut err = ValidationError::new("history_window_days");
            err.message =
                Some("history window must be at least as long as the projection window".into());
            errors.add("analysis", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
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

fn default_projection_window_days() -> u32 {
    DEFAULT_PROJECTION_WINDOW_DAYS
}

fn default_history_window_days() -> u32 {
    DEFAULT_HISTORY_WINDOW_DAYS
}

fn default_snapshot_months() -> u32 {
    DEFAULT_SNAPSHOT_MONTHS
}

fn default_top_products_limit() -> usize {
    DEFAULT_TOP_PRODUCTS_LIMIT
}

fn default_recommendation_limit() -> usize {
    DEFAULT_RECOMMENDATION_LIMIT
}

fn default_investment_days_analyzed() -> u32 {
    DEFAULT_INVESTMENT_DAYS_ANALYZED
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
    use tracing_subscriber::fmt;

    let default_directive = format!("profit_analytics={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://profit_analytics.db?mode=rwc")?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub rating: RatingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub api_key: Option<SecretString>,
    pub cors_allow_any_origin: bool,
}

#[derive(Clone, Debug)]
pub struct HistoryConfig {
    pub enabled: bool,
}

/// Knobs of the rating engine. Read once at startup and never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    pub age_rate_per_year: f64,
    pub value_rate_per_10000: f64,
    pub value_bracket: f64,
    pub default_coverage_percentage: f64,
    pub enable_location_adjustment: bool,
    pub min_location_adjustment: f64,
    pub max_location_adjustment: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub api_key: Option<String>,
    pub history_enabled: Option<bool>,
    pub enable_location_adjustment: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Every environment variable consulted by [`AppConfig::load`].
pub const ENV_KEYS: &[&str] = &[
    "AUTOQUOTE_DATABASE_URL",
    "AUTOQUOTE_DATABASE_MAX_CONNECTIONS",
    "AUTOQUOTE_DATABASE_TIMEOUT_SECS",
    "AUTOQUOTE_SERVER_BIND_ADDRESS",
    "AUTOQUOTE_SERVER_PORT",
    "AUTOQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS",
    "AUTOQUOTE_SERVER_API_KEY",
    "AUTOQUOTE_SERVER_CORS_ALLOW_ANY_ORIGIN",
    "AUTOQUOTE_HISTORY_ENABLED",
    "AUTOQUOTE_RATING_AGE_RATE_PER_YEAR",
    "AUTOQUOTE_RATING_VALUE_RATE_PER_10000",
    "AUTOQUOTE_RATING_VALUE_BRACKET",
    "AUTOQUOTE_RATING_DEFAULT_COVERAGE_PERCENTAGE",
    "AUTOQUOTE_RATING_ENABLE_LOCATION_ADJUSTMENT",
    "AUTOQUOTE_RATING_MIN_LOCATION_ADJUSTMENT",
    "AUTOQUOTE_RATING_MAX_LOCATION_ADJUSTMENT",
    "AUTOQUOTE_LOGGING_LEVEL",
    "AUTOQUOTE_LOGGING_FORMAT",
    "AUTOQUOTE_LOG_LEVEL",
    "AUTOQUOTE_LOG_FORMAT",
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://autoquote.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                api_key: None,
                cors_allow_any_origin: true,
            },
            history: HistoryConfig { enabled: true },
            rating: RatingConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            age_rate_per_year: 0.005,
            value_rate_per_10000: 0.005,
            value_bracket: 10_000.0,
            default_coverage_percentage: 1.0,
            enable_location_adjustment: false,
            min_location_adjustment: -0.02,
            max_location_adjustment: 0.02,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("autoquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(api_key) = server.api_key {
                self.server.api_key = Some(api_key.into());
            }
            if let Some(cors_allow_any_origin) = server.cors_allow_any_origin {
                self.server.cors_allow_any_origin = cors_allow_any_origin;
            }
        }

        if let Some(history) = patch.history {
            if let Some(enabled) = history.enabled {
                self.history.enabled = enabled;
            }
        }

        if let Some(rating) = patch.rating {
            let current = &mut self.rating;
            if let Some(value) = rating.age_rate_per_year {
                current.age_rate_per_year = value;
            }
            if let Some(value) = rating.value_rate_per_10000 {
                current.value_rate_per_10000 = value;
            }
            if let Some(value) = rating.value_bracket {
                current.value_bracket = value;
            }
            if let Some(value) = rating.default_coverage_percentage {
                current.default_coverage_percentage = value;
            }
            if let Some(value) = rating.enable_location_adjustment {
                current.enable_location_adjustment = value;
            }
            if let Some(value) = rating.min_location_adjustment {
                current.min_location_adjustment = value;
            }
            if let Some(value) = rating.max_location_adjustment {
                current.max_location_adjustment = value;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AUTOQUOTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AUTOQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("AUTOQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("AUTOQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AUTOQUOTE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AUTOQUOTE_SERVER_PORT") {
            self.server.port = parse_env("AUTOQUOTE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("AUTOQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_SERVER_API_KEY") {
            self.server.api_key = Some(value.into());
        }
        if let Some(value) = read_env("AUTOQUOTE_SERVER_CORS_ALLOW_ANY_ORIGIN") {
            self.server.cors_allow_any_origin =
                parse_env("AUTOQUOTE_SERVER_CORS_ALLOW_ANY_ORIGIN", &value)?;
        }

        if let Some(value) = read_env("AUTOQUOTE_HISTORY_ENABLED") {
            self.history.enabled = parse_env("AUTOQUOTE_HISTORY_ENABLED", &value)?;
        }

        let rating = &mut self.rating;
        if let Some(value) = read_env("AUTOQUOTE_RATING_AGE_RATE_PER_YEAR") {
            rating.age_rate_per_year = parse_env("AUTOQUOTE_RATING_AGE_RATE_PER_YEAR", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_VALUE_RATE_PER_10000") {
            rating.value_rate_per_10000 =
                parse_env("AUTOQUOTE_RATING_VALUE_RATE_PER_10000", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_VALUE_BRACKET") {
            rating.value_bracket = parse_env("AUTOQUOTE_RATING_VALUE_BRACKET", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_DEFAULT_COVERAGE_PERCENTAGE") {
            rating.default_coverage_percentage =
                parse_env("AUTOQUOTE_RATING_DEFAULT_COVERAGE_PERCENTAGE", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_ENABLE_LOCATION_ADJUSTMENT") {
            rating.enable_location_adjustment =
                parse_env("AUTOQUOTE_RATING_ENABLE_LOCATION_ADJUSTMENT", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_MIN_LOCATION_ADJUSTMENT") {
            rating.min_location_adjustment =
                parse_env("AUTOQUOTE_RATING_MIN_LOCATION_ADJUSTMENT", &value)?;
        }
        if let Some(value) = read_env("AUTOQUOTE_RATING_MAX_LOCATION_ADJUSTMENT") {
            rating.max_location_adjustment =
                parse_env("AUTOQUOTE_RATING_MAX_LOCATION_ADJUSTMENT", &value)?;
        }

        let log_level =
            read_env("AUTOQUOTE_LOGGING_LEVEL").or_else(|| read_env("AUTOQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AUTOQUOTE_LOGGING_FORMAT").or_else(|| read_env("AUTOQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(api_key) = overrides.api_key {
            self.server.api_key = Some(api_key.into());
        }
        if let Some(enabled) = overrides.history_enabled {
            self.history.enabled = enabled;
        }
        if let Some(enabled) = overrides.enable_location_adjustment {
            self.rating.enable_location_adjustment = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_rating(&self.rating)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("autoquote.toml"), PathBuf::from("config/autoquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(api_key) = &server.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.api_key must not be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_rating(rating: &RatingConfig) -> Result<(), ConfigError> {
    let knobs = [
        ("rating.age_rate_per_year", rating.age_rate_per_year),
        ("rating.value_rate_per_10000", rating.value_rate_per_10000),
        ("rating.value_bracket", rating.value_bracket),
        ("rating.default_coverage_percentage", rating.default_coverage_percentage),
        ("rating.min_location_adjustment", rating.min_location_adjustment),
        ("rating.max_location_adjustment", rating.max_location_adjustment),
    ];
    if let Some((name, _)) = knobs.iter().find(|(_, value)| !value.is_finite()) {
        return Err(ConfigError::Validation(format!("{name} must be a finite number")));
    }

    if rating.age_rate_per_year < 0.0 || rating.value_rate_per_10000 < 0.0 {
        return Err(ConfigError::Validation(
            "rating.age_rate_per_year and rating.value_rate_per_10000 must not be negative"
                .to_string(),
        ));
    }

    if rating.value_bracket <= 0.0 {
        return Err(ConfigError::Validation(
            "rating.value_bracket must be greater than zero".to_string(),
        ));
    }

    if rating.default_coverage_percentage < 0.0 {
        return Err(ConfigError::Validation(
            "rating.default_coverage_percentage must not be negative".to_string(),
        ));
    }

    if rating.min_location_adjustment > rating.max_location_adjustment {
        return Err(ConfigError::Validation(
            "rating.min_location_adjustment must not exceed rating.max_location_adjustment"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    history: Option<HistoryPatch>,
    rating: Option<RatingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    api_key: Option<String>,
    cors_allow_any_origin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryPatch {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RatingPatch {
    age_rate_per_year: Option<f64>,
    value_rate_per_10000: Option<f64>,
    value_bracket: Option<f64>,
    default_coverage_percentage: Option<f64>,
    enable_location_adjustment: Option<bool>,
    min_location_adjustment: Option<f64>,
    max_location_adjustment: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use autoquote_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_key: &'static str,
    value: String,
}

impl ConfigField {
    fn new(key_path: &'static str, env_key: &'static str, value: impl ToString) -> Self {
        Self { key_path, env_key, value: value.to_string() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let database = &config.database;
    let server = &config.server;
    let rating = &config.rating;
    let api_key = if server.api_key.is_some() { "<redacted>" } else { "<unset>" };

    vec![
        ConfigField::new("database.url", "AUTOQUOTE_DATABASE_URL", &database.url),
        ConfigField::new(
            "database.max_connections",
            "AUTOQUOTE_DATABASE_MAX_CONNECTIONS",
            database.max_connections,
        ),
        ConfigField::new(
            "database.timeout_secs",
            "AUTOQUOTE_DATABASE_TIMEOUT_SECS",
            database.timeout_secs,
        ),
        ConfigField::new(
            "server.bind_address",
            "AUTOQUOTE_SERVER_BIND_ADDRESS",
            &server.bind_address,
        ),
        ConfigField::new("server.port", "AUTOQUOTE_SERVER_PORT", server.port),
        ConfigField::new(
            "server.graceful_shutdown_secs",
            "AUTOQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS",
            server.graceful_shutdown_secs,
        ),
        ConfigField::new("server.api_key", "AUTOQUOTE_SERVER_API_KEY", api_key),
        ConfigField::new(
            "server.cors_allow_any_origin",
            "AUTOQUOTE_SERVER_CORS_ALLOW_ANY_ORIGIN",
            server.cors_allow_any_origin,
        ),
        ConfigField::new("history.enabled", "AUTOQUOTE_HISTORY_ENABLED", config.history.enabled),
        ConfigField::new(
            "rating.age_rate_per_year",
            "AUTOQUOTE_RATING_AGE_RATE_PER_YEAR",
            rating.age_rate_per_year,
        ),
        ConfigField::new(
            "rating.value_rate_per_10000",
            "AUTOQUOTE_RATING_VALUE_RATE_PER_10000",
            rating.value_rate_per_10000,
        ),
        ConfigField::new(
            "rating.value_bracket",
            "AUTOQUOTE_RATING_VALUE_BRACKET",
            rating.value_bracket,
        ),
        ConfigField::new(
            "rating.default_coverage_percentage",
            "AUTOQUOTE_RATING_DEFAULT_COVERAGE_PERCENTAGE",
            rating.default_coverage_percentage,
        ),
        ConfigField::new(
            "rating.enable_location_adjustment",
            "AUTOQUOTE_RATING_ENABLE_LOCATION_ADJUSTMENT",
            rating.enable_location_adjustment,
        ),
        ConfigField::new(
            "rating.min_location_adjustment",
            "AUTOQUOTE_RATING_MIN_LOCATION_ADJUSTMENT",
            rating.min_location_adjustment,
        ),
        ConfigField::new(
            "rating.max_location_adjustment",
            "AUTOQUOTE_RATING_MAX_LOCATION_ADJUSTMENT",
            rating.max_location_adjustment,
        ),
        ConfigField::new("logging.level", "AUTOQUOTE_LOGGING_LEVEL", &config.logging.level),
        ConfigField::new(
            "logging.format",
            "AUTOQUOTE_LOGGING_FORMAT",
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("autoquote.toml"), PathBuf::from("config/autoquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, render_line};

    #[test]
    fn dotted_paths_resolve_through_tables() {
        let doc: toml::Value = "[server]\nport = 9000\n".parse().expect("toml");

        assert!(contains_path(&doc, "server.port"));
        assert!(!contains_path(&doc, "server.api_key"));
        assert!(!contains_path(&doc, "history.enabled"));
    }

    #[test]
    fn rendered_line_names_its_source() {
        assert_eq!(
            render_line("history.enabled", "true", "default".to_string()),
            "- history.enabled = true (source: default)"
        );
    }
}

use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use autoquote_cli::commands::history::{self, HistoryCommand};
use autoquote_cli::commands::quote::{self, QuoteArgs};
use autoquote_cli::commands::{config, doctor, migrate};
use autoquote_core::config::ENV_KEYS;
use autoquote_core::domain::vehicle::current_year;
use autoquote_core::quote::service::{PersistenceOutcome, QuoteService};
use autoquote_core::rating::RatingEngine;
use autoquote_db::{connect_with_settings, SqlQuoteStore};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn quote_returns_reference_premium_offline() {
    with_env(&[], || {
        let result = quote::run(&corolla_args());
        assert_eq!(result.exit_code, 0, "expected successful offline quote");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["car"]["make"], "Toyota");
        assert_close(&payload["applied_rate"], 0.10);
        assert_close(&payload["policy_limit"], 90_000.0);
        assert_close(&payload["deductible_value"], 10_000.0);
        assert_close(&payload["calculated_premium"], 9_050.0);
    });
}

#[test]
fn quote_rejects_zero_deductible_as_validation_failure() {
    with_env(&[], || {
        let args = QuoteArgs { deductible: 0.0, ..corolla_args() };
        let result = quote::run(&args);
        assert_eq!(result.exit_code, 6, "expected validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
    });
}

#[test]
fn quote_rejects_next_model_year_cheap_car_as_validation_failure() {
    with_env(&[], || {
        let args = QuoteArgs { year: current_year() + 1, value: 5_000.0, ..corolla_args() };
        let result = quote::run(&args);
        assert_eq!(result.exit_code, 6, "negative applied rate is caller-correctable");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("applied_rate"));
    });
}

#[test]
fn quote_trace_lists_rating_steps() {
    with_env(&[], || {
        let args = QuoteArgs { trace: true, ..corolla_args() };
        let result = quote::run(&args);
        assert_eq!(result.exit_code, 0, "expected traced quote");

        let payload = parse_payload(&result.output);
        assert_close(&payload["base_premium"], 10_000.0);
        assert_close(&payload["quote"]["calculated_premium"], 9_050.0);

        let stages: Vec<&str> = payload["trace"]["steps"]
            .as_array()
            .expect("trace steps")
            .iter()
            .filter_map(|step| step["stage"].as_str())
            .collect();
        assert_eq!(stages.first(), Some(&"age_rate"));
        assert!(stages.contains(&"base_rate"));
    });
}

#[test]
fn quote_location_flag_applies_postal_code_adjustment() {
    with_env(&[], || {
        let args = QuoteArgs {
            city: Some("Sao Paulo".to_string()),
            state: Some("SP".to_string()),
            postal_code: Some("01310-100".to_string()),
            location_adjustment: true,
            ..corolla_args()
        };
        let located = parse_payload(&quote::run(&args).output);
        let plain = parse_payload(&quote::run(&corolla_args()).output);

        let located_rate = located["applied_rate"].as_f64().expect("rate");
        let plain_rate = plain["applied_rate"].as_f64().expect("rate");
        assert!(located_rate < plain_rate, "postal code ending in 0 should discount the rate");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("AUTOQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("AUTOQUOTE_DATABASE_URL", "postgres://localhost/autoquote")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn history_reads_migrated_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_database_url(dir.path());

    with_env(&[("AUTOQUOTE_DATABASE_URL", url.as_str())], || {
        assert_eq!(migrate::run().exit_code, 0, "expected migrate to prepare the database");

        let listed = history::run(&HistoryCommand::List {
            skip: 0,
            limit: 20,
            car_make: None,
            car_model: None,
            min_value: None,
            max_value: None,
            state: None,
        });
        assert_eq!(listed.exit_code, 0, "expected list to succeed");
        assert_eq!(parse_payload(&listed.output), Value::Array(Vec::new()));

        let shown = history::run(&HistoryCommand::Show { id: "missing-id".to_string() });
        assert_eq!(shown.exit_code, 8, "expected not found code");

        let payload = parse_payload(&shown.output);
        assert_eq!(payload["command"], "history");
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn history_list_filters_by_vehicle_value() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_database_url(dir.path());

    with_env(&[("AUTOQUOTE_DATABASE_URL", url.as_str())], || {
        assert_eq!(migrate::run().exit_code, 0, "expected migrate to prepare the database");
        record_quotes(&url, &[40_000.0, 100_000.0, 250_000.0]);

        let listed = history::run(&HistoryCommand::List {
            skip: 0,
            limit: 20,
            car_make: None,
            car_model: None,
            min_value: Some(50_000.0),
            max_value: Some(200_000.0),
            state: None,
        });
        assert_eq!(listed.exit_code, 0, "expected filtered list to succeed");

        let payload = parse_payload(&listed.output);
        let records = payload.as_array().expect("record array");
        assert_eq!(records.len(), 1);
        assert_close(&records[0]["car_value"], 100_000.0);
    });
}

#[test]
fn history_without_schema_reports_storage_failure() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_database_url(dir.path());

    with_env(&[("AUTOQUOTE_DATABASE_URL", url.as_str())], || {
        let result = history::run(&HistoryCommand::Show { id: "any".to_string() });
        assert_eq!(result.exit_code, 9, "expected storage failure code");
        assert_eq!(parse_payload(&result.output)["error_class"], "storage");
    });
}

#[test]
fn doctor_flags_missing_history_schema() {
    with_env(&[("AUTOQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let (output, passed) = doctor::run(true);
        assert!(!passed, "fresh database has no history table");

        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "fail");
        let schema = check_named(&payload, "history_schema");
        assert_eq!(schema["status"], "fail");
        assert!(schema["details"].as_str().unwrap_or_default().contains("autoquote migrate"));
        assert_eq!(check_named(&payload, "database_connectivity")["status"], "pass");
    });
}

#[test]
fn doctor_passes_after_migration() {
    let dir = TempDir::new().expect("temp dir");
    let url = file_database_url(dir.path());

    with_env(&[("AUTOQUOTE_DATABASE_URL", url.as_str())], || {
        assert_eq!(migrate::run().exit_code, 0);

        let (output, passed) = doctor::run(false);
        assert!(passed, "expected all checks to pass: {output}");
        assert!(output.starts_with("doctor: all readiness checks passed"));
        assert!(output.contains("- [ok] history_schema"));
    });
}

#[test]
fn doctor_skips_database_checks_when_history_disabled() {
    with_env(&[("AUTOQUOTE_HISTORY_ENABLED", "false")], || {
        let (output, passed) = doctor::run(true);
        assert!(passed);

        let payload = parse_payload(&output);
        assert_eq!(check_named(&payload, "database_connectivity")["status"], "skipped");
        assert_eq!(check_named(&payload, "history_schema")["status"], "skipped");
    });
}

#[test]
fn config_redacts_api_key_and_names_sources() {
    with_env(
        &[("AUTOQUOTE_SERVER_API_KEY", "very-secret-key"), ("AUTOQUOTE_SERVER_PORT", "9100")],
        || {
            let output = config::run();

            assert!(!output.contains("very-secret-key"), "api key must never be printed");
            assert!(output.contains(
                "- server.api_key = <redacted> (source: env (AUTOQUOTE_SERVER_API_KEY))"
            ));
            assert!(output.contains("- server.port = 9100 (source: env (AUTOQUOTE_SERVER_PORT))"));
            assert!(output.contains("- rating.value_bracket = 10000 (source: default)"));
        },
    );
}

fn corolla_args() -> QuoteArgs {
    QuoteArgs {
        make: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: current_year() - 10,
        value: 100_000.0,
        deductible: 0.1,
        broker_fee: 50.0,
        city: None,
        state: None,
        postal_code: None,
        street: None,
        location_adjustment: false,
        trace: false,
    }
}

fn record_quotes(url: &str, values: &[f64]) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");
    runtime.block_on(async {
        let pool = connect_with_settings(url, 1, 5).await.expect("connect history db");
        let service = QuoteService::with_store(
            Arc::new(RatingEngine::default()),
            Arc::new(SqlQuoteStore::new(pool.clone())),
        );
        for value in values {
            let request = QuoteArgs { value: *value, ..corolla_args() }.to_request();
            let outcome = service.calculate(&request, "cli-test").await.expect("quote");
            assert!(matches!(outcome.persistence, PersistenceOutcome::Saved(_)));
        }
        pool.close().await;
    });
}

fn file_database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("history.db").display())
}

fn check_named<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .expect("checks array")
        .iter()
        .find(|check| check["name"] == name)
        .expect("named check present")
}

fn assert_close(actual: &Value, expected: f64) {
    let actual = actual.as_f64().expect("numeric field");
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let previous_values: Vec<(&str, Option<String>)> =
        ENV_KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in ENV_KEYS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

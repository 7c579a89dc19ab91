use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tilly_cli::commands::{config, counter, doctor, search};

#[test]
fn config_renders_env_sourced_values() {
    with_env(
        &[
            ("TILLY_DIRECTORY_ENDPOINT", "http://127.0.0.1:9/customer-search"),
            ("TILLY_PICKER_REQUEST_DELAY_MS", "100"),
        ],
        || {
            let output = config::run();

            assert!(output.starts_with("effective config"), "unexpected header: {output}");
            assert!(output.contains(
                "- directory.endpoint = http://127.0.0.1:9/customer-search (source: env (TILLY_DIRECTORY_ENDPOINT))"
            ));
            assert!(output.contains(
                "- picker.request_delay_ms = 100 (source: env (TILLY_PICKER_REQUEST_DELAY_MS))"
            ));
            assert!(output.contains(
                "- picker.placeholder = Search customer by name or phone... (source: default)"
            ));
        },
    );
}

#[test]
fn config_reports_invalid_env_values() {
    with_env(&[("TILLY_PICKER_REQUEST_DELAY_MS", "soon")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"), "unexpected output: {output}");
    });
}

#[test]
fn doctor_skips_directory_check_when_config_invalid() {
    with_env(&[("TILLY_DIRECTORY_ENDPOINT", "ftp://example.test/roster")], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["name"], "directory_reachability");
        assert_eq!(report["checks"][1]["status"], "skipped");
    });
}

#[test]
fn doctor_reports_unreachable_directory() {
    with_env(
        &[
            ("TILLY_DIRECTORY_ENDPOINT", "http://127.0.0.1:9/customer-search"),
            ("TILLY_DIRECTORY_TIMEOUT_SECS", "1"),
        ],
        || {
            let report = parse_payload(&doctor::run(true));

            assert_eq!(report["overall_status"], "fail");
            assert_eq!(report["checks"][0]["status"], "pass");
            assert_eq!(report["checks"][1]["name"], "directory_reachability");
            assert_eq!(report["checks"][1]["status"], "fail");
            let details = report["checks"][1]["details"].as_str().unwrap_or_default();
            assert!(details.contains("failed to query customer directory"), "details: {details}");
        },
    );
}

#[test]
fn search_returns_config_failure_code() {
    with_env(&[("TILLY_PICKER_REQUEST_DELAY_MS", "soon")], || {
        let result = search::run("jane", true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn search_returns_directory_failure_code_when_unreachable() {
    with_env(
        &[
            ("TILLY_DIRECTORY_ENDPOINT", "http://127.0.0.1:9/customer-search"),
            ("TILLY_DIRECTORY_TIMEOUT_SECS", "1"),
        ],
        || {
            let result = search::run("jane", false);
            assert_eq!(result.exit_code, 3, "expected directory failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "search");
            assert_eq!(payload["error_class"], "directory_search");
        },
    );
}

#[test]
fn counter_returns_config_failure_without_reading_input() {
    with_env(&[("TILLY_DIRECTORY_ENDPOINT", "not-a-url")], || {
        let result = counter::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "counter");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TILLY_DIRECTORY_ENDPOINT",
        "TILLY_DIRECTORY_TIMEOUT_SECS",
        "TILLY_PICKER_PLACEHOLDER",
        "TILLY_PICKER_ALLOW_CLEAR",
        "TILLY_PICKER_REQUEST_DELAY_MS",
        "TILLY_LOGGING_LEVEL",
        "TILLY_LOGGING_FORMAT",
        "TILLY_LOG_LEVEL",
        "TILLY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
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

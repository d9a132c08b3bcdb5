//! Integration tests for environment overrides of application settings.
//!
//! Precedence is env > yaml > defaults, with every variable prefixed by the
//! application (`JIRA_`, `CONFLUENCE_`).

use dc_loadtest::app::AppType;
use dc_loadtest::config::{AppSettings, ConfigError};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Clear all env vars that could affect settings.
/// Must be called at the start of every test to prevent leakage
/// from other tests (execution order is not guaranteed).
fn clean_env() {
    for prefix in ["JIRA_", "CONFLUENCE_"] {
        for name in ["CONCURRENCY", "TOTAL_ACTIONS_PER_HOUR", "TEST_DURATION", "VERBOSE"] {
            env::remove_var(format!("{}{}", prefix, name));
        }
    }
}

const YAML: &str = r#"
application_hostname: localhost
application_port: 2990
application_postfix: /jira
admin_login: admin
admin_password: admin
concurrency: 200
total_actions_per_hour: 54500
test_duration: 45m
verbose: false
env:
  view_dashboard: 10
"#;

fn yaml_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(YAML.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_no_env_override_uses_yaml_values() {
    clean_env();
    let file = yaml_file();

    let settings = AppSettings::load(file.path(), AppType::Jira).unwrap();

    assert_eq!(settings.concurrency, 200);
    assert_eq!(settings.total_actions_per_hour, 54500);
    assert_eq!(settings.test_duration().unwrap(), Duration::from_secs(45 * 60));
    assert!(!settings.verbose);
    assert_eq!(settings.server_url(), "http://localhost:2990/jira");
}

#[test]
#[serial]
fn test_app_prefixed_env_overrides_yaml() {
    clean_env();
    env::set_var("JIRA_CONCURRENCY", "20");
    env::set_var("JIRA_TOTAL_ACTIONS_PER_HOUR", "7200");
    env::set_var("JIRA_TEST_DURATION", "5m");
    env::set_var("JIRA_VERBOSE", "TRUE");
    let file = yaml_file();

    let settings = AppSettings::load(file.path(), AppType::Jira).unwrap();

    assert_eq!(settings.concurrency, 20);
    assert_eq!(settings.total_actions_per_hour, 7200);
    assert_eq!(settings.test_duration().unwrap(), Duration::from_secs(300));
    assert!(settings.verbose);

    let policy = settings.timing_policy(AppType::Jira).unwrap();
    assert!((policy.target_interval_secs() - 10.0).abs() < 1e-9);

    clean_env();
}

#[test]
#[serial]
fn test_other_application_env_is_ignored() {
    clean_env();
    env::set_var("CONFLUENCE_CONCURRENCY", "3");
    let file = yaml_file();

    let settings = AppSettings::load(file.path(), AppType::Jira).unwrap();
    assert_eq!(settings.concurrency, 200);

    let settings = AppSettings::load(file.path(), AppType::Confluence).unwrap();
    assert_eq!(settings.concurrency, 3);

    clean_env();
}

#[test]
#[serial]
fn test_empty_env_value_is_ignored() {
    clean_env();
    env::set_var("JIRA_CONCURRENCY", "  ");
    let file = yaml_file();

    let settings = AppSettings::load(file.path(), AppType::Jira).unwrap();
    assert_eq!(settings.concurrency, 200);

    clean_env();
}

#[test]
#[serial]
fn test_non_numeric_override_is_rejected() {
    clean_env();
    env::set_var("JIRA_CONCURRENCY", "lots");
    let file = yaml_file();

    let err = AppSettings::load(file.path(), AppType::Jira).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("JIRA_CONCURRENCY")));

    clean_env();
}

#[test]
#[serial]
fn test_zero_override_fails_validation() {
    clean_env();
    env::set_var("JIRA_TOTAL_ACTIONS_PER_HOUR", "0");
    let file = yaml_file();

    let err = AppSettings::load(file.path(), AppType::Jira).unwrap_err();
    assert!(err.to_string().contains("total_actions_per_hour"));

    clean_env();
}

#[test]
#[serial]
fn test_missing_file_is_a_read_error() {
    clean_env();
    let err = AppSettings::load("/nonexistent/jira.yml", AppType::Jira).unwrap_err();
    assert!(matches!(err, ConfigError::FileRead(_)));
}

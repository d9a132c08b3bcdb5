//! Per-application settings loaded from YAML, with environment overrides.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::AppType;
use crate::timing::ActionTimingPolicy;
use crate::utils::parse_duration_string;

/// Errors that can occur when loading or querying settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Action percentage for {0} is not set in yml configuration file")]
    MissingActionPercentage(String),
}

/// Settings for one application under test.
///
/// # Example YAML
/// ```yaml
/// application_hostname: jira.example.com
/// application_protocol: https
/// application_port: 443
/// application_postfix: /jira
/// admin_login: admin
/// admin_password: admin
/// concurrency: 200
/// total_actions_per_hour: 54500
/// test_duration: 45m
/// verbose: false
/// env:
///   view_dashboard: 10
///   browse_projects: 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub application_hostname: String,

    #[serde(default = "default_protocol")]
    pub application_protocol: String,

    #[serde(default = "default_port")]
    pub application_port: u16,

    #[serde(default)]
    pub application_postfix: String,

    pub admin_login: String,

    pub admin_password: String,

    pub concurrency: u64,

    pub total_actions_per_hour: u64,

    #[serde(default = "default_test_duration")]
    pub test_duration: String,

    #[serde(rename = "ramp-up", alias = "ramp_up", default = "default_ramp_up")]
    pub ramp_up: String,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Action name -> percentage weight.
    #[serde(default)]
    pub env: BTreeMap<String, u32>,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_test_duration() -> String {
    "45m".to_string()
}

fn default_ramp_up() -> String {
    "0s".to_string()
}

fn default_secure() -> bool {
    true
}

impl AppSettings {
    /// Parse settings from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: AppSettings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load, apply `<APP>_*` env overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P, app_type: AppType) -> Result<Self, ConfigError> {
        let mut settings = Self::from_yaml_file(path)?;
        settings.apply_env_overrides(app_type)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override values from the environment: env > yaml.
    ///
    /// Reads `CONCURRENCY`, `TOTAL_ACTIONS_PER_HOUR`, `TEST_DURATION` and
    /// `VERBOSE`, each prefixed with the application, e.g. `JIRA_CONCURRENCY`.
    pub fn apply_env_overrides(&mut self, app_type: AppType) -> Result<(), ConfigError> {
        let prefix = app_type.env_prefix();

        if let Some(value) = env_value(prefix, "CONCURRENCY") {
            self.concurrency = parse_number(prefix, "CONCURRENCY", &value)?;
        }
        if let Some(value) = env_value(prefix, "TOTAL_ACTIONS_PER_HOUR") {
            self.total_actions_per_hour = parse_number(prefix, "TOTAL_ACTIONS_PER_HOUR", &value)?;
        }
        if let Some(value) = env_value(prefix, "TEST_DURATION") {
            self.test_duration = value;
        }
        if let Some(value) = env_value(prefix, "VERBOSE") {
            self.verbose = value.to_lowercase() == "true";
        }

        Ok(())
    }

    /// Reject settings that would fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_hostname.trim().is_empty() {
            return Err(ConfigError::Validation(
                "application_hostname cannot be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Validation(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.total_actions_per_hour == 0 {
            return Err(ConfigError::Validation(
                "total_actions_per_hour must be greater than 0".to_string(),
            ));
        }
        let interval_secs = 3600.0 * self.concurrency as f64 / self.total_actions_per_hour as f64;
        if Duration::try_from_secs_f64(interval_secs).is_err() {
            return Err(ConfigError::Validation(format!(
                "concurrency {} at {} actions per hour gives an interval too large to sleep",
                self.concurrency, self.total_actions_per_hour
            )));
        }
        self.test_duration()?;
        self.ramp_up()?;
        Ok(())
    }

    /// Percentage weight configured for an action.
    pub fn percentage(&self, action_name: &str) -> Result<u32, ConfigError> {
        self.env
            .get(action_name)
            .copied()
            .ok_or_else(|| ConfigError::MissingActionPercentage(action_name.to_string()))
    }

    /// Base URL of the application, e.g. `https://jira.example.com:443/jira`.
    pub fn server_url(&self) -> String {
        let postfix = self.application_postfix.trim_end_matches('/');
        let postfix = if postfix.is_empty() || postfix.starts_with('/') {
            postfix.to_string()
        } else {
            format!("/{}", postfix)
        };
        format!(
            "{}://{}:{}{}",
            self.application_protocol, self.application_hostname, self.application_port, postfix
        )
    }

    pub fn test_duration(&self) -> Result<Duration, ConfigError> {
        parse_duration_string(&self.test_duration).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid test_duration '{}': {}",
                self.test_duration, e
            ))
        })
    }

    pub fn ramp_up(&self) -> Result<Duration, ConfigError> {
        parse_duration_string(&self.ramp_up).map_err(|e| {
            ConfigError::Validation(format!("Invalid ramp-up '{}': {}", self.ramp_up, e))
        })
    }

    /// Pacing policy derived from `total_actions_per_hour` and `concurrency`.
    pub fn timing_policy(&self, app_type: AppType) -> Result<ActionTimingPolicy, ConfigError> {
        ActionTimingPolicy::new(app_type, self.total_actions_per_hour, self.concurrency)
    }
}

fn env_value(prefix: &str, name: &str) -> Option<String> {
    env::var(format!("{}{}", prefix, name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_number(prefix: &str, name: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| {
        ConfigError::Validation(format!(
            "{}{} must be a valid number, got '{}'",
            prefix, name, value
        ))
    })
}

/// Weighted selection among a set of actions by their configured percentages.
#[derive(Debug, Clone)]
pub struct ActionMix {
    names: Vec<String>,
    index: WeightedIndex<u32>,
}

impl ActionMix {
    /// Build a mix for `actions`, looking each one up in the settings.
    ///
    /// Every action must have a percentage; at least one must be non-zero.
    pub fn from_settings(settings: &AppSettings, actions: &[&str]) -> Result<Self, ConfigError> {
        let mut names = Vec::with_capacity(actions.len());
        let mut weights = Vec::with_capacity(actions.len());
        for action in actions {
            weights.push(settings.percentage(action)?);
            names.push(action.to_string());
        }
        Self::new(names, weights)
    }

    pub fn new(names: Vec<String>, weights: Vec<u32>) -> Result<Self, ConfigError> {
        let index = WeightedIndex::new(&weights).map_err(|e| {
            ConfigError::Validation(format!("Invalid action percentages: {}", e))
        })?;
        Ok(Self { names, index })
    }

    /// Pick the next action name.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.names[self.index.sample(rng)]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SETTINGS_YAML: &str = r#"
application_hostname: jira.example.com
application_protocol: https
application_port: 443
application_postfix: jira
admin_login: admin
admin_password: secret
concurrency: 200
total_actions_per_hour: 54500
test_duration: 45m
ramp-up: 3m
env:
  view_dashboard: 10
  browse_projects: 0
"#;

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = r#"
application_hostname: localhost
admin_login: admin
admin_password: admin
concurrency: 1
total_actions_per_hour: 3600
"#;
        let settings = AppSettings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.application_protocol, "http");
        assert_eq!(settings.application_port, 80);
        assert!(!settings.verbose);
        assert!(settings.secure);
        assert!(settings.env.is_empty());
        assert_eq!(settings.test_duration().unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(settings.ramp_up().unwrap(), Duration::ZERO);
    }

    #[test]
    fn server_url_normalizes_postfix() {
        let settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        assert_eq!(settings.server_url(), "https://jira.example.com:443/jira");
        assert_eq!(settings.ramp_up().unwrap(), Duration::from_secs(180));
    }

    #[test]
    fn percentage_lookup() {
        let settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        assert_eq!(settings.percentage("view_dashboard").unwrap(), 10);

        let err = settings.percentage("create_issue").unwrap_err();
        assert!(matches!(err, ConfigError::MissingActionPercentage(ref k) if k == "create_issue"));
        assert!(err.to_string().contains("create_issue"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        settings.concurrency = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_bad_duration() {
        let mut settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        settings.test_duration = "forever".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_overflowing_duration() {
        let mut settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        settings.test_duration = "9999999999999999h".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));

        settings.test_duration = "45m".to_string();
        settings.ramp_up = "300000000000000d".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unsleepable_interval() {
        let mut settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        settings.concurrency = 10_000_000_000_000_000;
        settings.total_actions_per_hour = 1;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("too large"), "error was: {}", err);
    }

    #[test]
    fn timing_policy_from_settings() {
        let settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        let policy = settings.timing_policy(AppType::Jira).unwrap();
        let expected = 3600.0 * 200.0 / 54500.0;
        assert!((policy.target_interval_secs() - expected).abs() < 1e-9);
    }

    #[test]
    fn action_mix_skips_zero_weights() {
        let settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        let mix =
            ActionMix::from_settings(&settings, &["view_dashboard", "browse_projects"]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(mix.choose(&mut rng), "view_dashboard");
        }
    }

    #[test]
    fn action_mix_requires_every_percentage() {
        let settings = AppSettings::from_yaml_str(SETTINGS_YAML).unwrap();
        let err = ActionMix::from_settings(&settings, &["view_dashboard", "search_jql"]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingActionPercentage(_)));
    }

    #[test]
    fn action_mix_all_zero_is_invalid() {
        let err = ActionMix::new(vec!["a".to_string()], vec![0]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}

//! Per-application action pacing policy.

use std::time::Duration;

use crate::app::AppType;
use crate::config::ConfigError;

/// How often a single virtual user may start an action.
///
/// With `actions_per_hour` spread over `concurrency` users, each user gets
/// `actions_per_hour / concurrency` actions per hour, so one action every
/// `3600 * concurrency / actions_per_hour` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionTimingPolicy {
    app_type: AppType,
    actions_per_hour: u64,
    concurrency: u64,
}

impl ActionTimingPolicy {
    /// Build a policy. Both values must be non-zero.
    pub fn new(
        app_type: AppType,
        actions_per_hour: u64,
        concurrency: u64,
    ) -> Result<Self, ConfigError> {
        if actions_per_hour == 0 {
            return Err(ConfigError::Validation(format!(
                "{}: total_actions_per_hour must be greater than 0",
                app_type
            )));
        }
        if concurrency == 0 {
            return Err(ConfigError::Validation(format!(
                "{}: concurrency must be greater than 0",
                app_type
            )));
        }

        let policy = Self {
            app_type,
            actions_per_hour,
            concurrency,
        };
        if Duration::try_from_secs_f64(policy.target_interval_secs()).is_err() {
            return Err(ConfigError::Validation(format!(
                "{}: concurrency {} at {} actions per hour gives an interval too large to sleep",
                app_type, concurrency, actions_per_hour
            )));
        }

        Ok(policy)
    }

    pub fn app_type(&self) -> AppType {
        self.app_type
    }

    pub fn actions_per_hour(&self) -> u64 {
        self.actions_per_hour
    }

    pub fn concurrency(&self) -> u64 {
        self.concurrency
    }

    /// Target spacing between two actions of one virtual user, in seconds.
    pub fn target_interval_secs(&self) -> f64 {
        3600.0 * self.concurrency as f64 / self.actions_per_hour as f64
    }

    /// `new` only accepts policies whose interval fits in a `Duration`.
    pub fn target_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.target_interval_secs()).unwrap_or(Duration::MAX)
    }

    /// Remaining time to sleep after an action that took `elapsed`.
    ///
    /// `None` when the action already used up the interval.
    pub fn remaining_after(&self, elapsed: Duration) -> Option<Duration> {
        let interval = self.target_interval();
        if elapsed < interval {
            Some(interval - elapsed)
        } else {
            None
        }
    }
}

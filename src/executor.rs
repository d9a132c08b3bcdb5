//! Rate-paced action execution.
//!
//! Every simulated user action goes through [`ActionExecutor::measure`]: the
//! action is timed, its outcome is published to the event sink and logged,
//! and the calling session then sleeps out whatever is left of the target
//! interval so the aggregate rate approaches the configured actions per hour.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::time::{sleep, Instant};

use crate::events::{ActionResult, EventSink};
use crate::logging::ActionLogger;
use crate::metrics::THROTTLE_SLEEP_SECONDS;
use crate::timing::ActionTimingPolicy;

/// Times, reports and paces actions for one application type.
///
/// Cheap to clone; one executor can be shared by every virtual user of an
/// application. Pacing is per invocation: there is no shared budget across
/// sessions and no catch-up after a slow action.
#[derive(Clone)]
pub struct ActionExecutor {
    policy: ActionTimingPolicy,
    sink: Arc<dyn EventSink>,
    logger: ActionLogger,
}

impl ActionExecutor {
    pub fn new(policy: ActionTimingPolicy, sink: Arc<dyn EventSink>, logger: ActionLogger) -> Self {
        Self {
            policy,
            sink,
            logger,
        }
    }

    pub fn policy(&self) -> &ActionTimingPolicy {
        &self.policy
    }

    pub fn logger(&self) -> &ActionLogger {
        &self.logger
    }

    /// Run `action` once, report it, and throttle.
    ///
    /// Returns the action's value, or `None` if it failed. Errors never
    /// propagate out of here; they become a failure event and an error log.
    ///
    /// # Example
    /// ```rust,no_run
    /// # async fn demo(executor: dc_loadtest::executor::ActionExecutor, client: reqwest::Client) {
    /// let status = executor
    ///     .measure("view_dashboard", || async {
    ///         client.get("http://localhost/secure/Dashboard.jspa").send().await.map(|r| r.status())
    ///     })
    ///     .await;
    /// # }
    /// ```
    pub async fn measure<F, Fut, T, E>(&self, action_name: &str, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.measure_with_result(action_name, action).await.0
    }

    /// Same as [`measure`](Self::measure), also returning the published result.
    pub async fn measure_with_result<F, Fut, T, E>(
        &self,
        action_name: &str,
        action: F,
    ) -> (Option<T>, ActionResult)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = Instant::now();
        let outcome = action().await;
        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let (value, result) = match outcome {
            Ok(value) => {
                let result = ActionResult::success(action_name, elapsed_ms);
                self.sink.publish(&result);
                self.logger
                    .info(&format!("{} is finished successfully", action_name));
                (Some(value), result)
            }
            Err(e) => {
                let result = ActionResult::failure(action_name, elapsed_ms, e.to_string());
                self.sink.publish(&result);
                self.logger
                    .error(&format!("{} action failed. Reason: {}", action_name, e));
                (None, result)
            }
        };

        if let Some(remaining) = self.policy.remaining_after(elapsed) {
            self.logger.info(&format!(
                "action: {}, action_execution_time: {:.3}, sleep {:.3}",
                action_name,
                elapsed.as_secs_f64(),
                remaining.as_secs_f64()
            ));
            THROTTLE_SLEEP_SECONDS.observe(remaining.as_secs_f64());
            sleep(remaining).await;
        }

        (value, result)
    }
}

//! Minimal virtual-user runner.
//!
//! Starts one tokio task per configured user, spreads the starts over the
//! ramp-up period, and lets every user log in and then loop over weighted
//! page views until the test duration is over. Throughput comes from the
//! executor's pacing; this module does no scheduling of its own.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::actions::{self, LOGIN_ACTION};
use crate::app::AppType;
use crate::config::{ActionMix, AppSettings, ConfigError};
use crate::data_source::Dataset;
use crate::events::EventSink;
use crate::executor::ActionExecutor;
use crate::logging::ActionLogger;
use crate::metrics::{ACTIVE_USERS, STOPPED_USERS_TOTAL};
use crate::session::SessionError;
use crate::task_set::TaskSet;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("No actions to run: none of the configured actions has a page view for {0}")]
    NoActions(AppType),
}

/// Outcome of a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub users_started: usize,
    pub users_stopped_early: usize,
}

/// Build the action mix from the page views that have a configured percentage.
///
/// Configured actions without a built-in page view are skipped with a warning.
pub fn build_action_mix(app_type: AppType, settings: &AppSettings) -> Result<ActionMix, RunnerError> {
    let mut names = Vec::new();
    let mut weights = Vec::new();

    for (name, weight) in &settings.env {
        if actions::find_page_view(app_type, name).is_some() {
            names.push(name.clone());
            weights.push(*weight);
        } else if name != LOGIN_ACTION {
            warn!(app = %app_type, action = %name, "No built-in action with this name, skipping");
        }
    }

    if weights.iter().all(|w| *w == 0) {
        return Err(RunnerError::NoActions(app_type));
    }

    Ok(ActionMix::new(names, weights)?)
}

/// Username and password one virtual user logs in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Next user from a `username,password` dataset, falling back to the admin.
    pub fn pick(users: Option<&Dataset>, settings: &AppSettings) -> Self {
        if let Some(row) = users.map(Dataset::next_row) {
            if let (Some(username), Some(password)) = (row.first(), row.get(1)) {
                return Self {
                    username: username.clone(),
                    password: password.clone(),
                };
            }
        }
        Self {
            username: settings.admin_login.clone(),
            password: settings.admin_password.clone(),
        }
    }
}

/// One simulated user.
pub struct VirtualUser {
    id: usize,
    app_type: AppType,
    task_set: TaskSet,
    executor: ActionExecutor,
    mix: ActionMix,
    credentials: Credentials,
    rng: StdRng,
}

impl VirtualUser {
    pub fn new(
        id: usize,
        app_type: AppType,
        task_set: TaskSet,
        executor: ActionExecutor,
        mix: ActionMix,
        credentials: Credentials,
    ) -> Self {
        Self {
            id,
            app_type,
            task_set,
            executor,
            mix,
            credentials,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn task_set(&self) -> &TaskSet {
        &self.task_set
    }

    /// Log in; a failed login ends this user.
    pub async fn on_start(&mut self) -> Result<(), SessionError> {
        let executor = &self.executor;
        let task_set = &mut self.task_set;
        let app_type = self.app_type;
        let credentials = &self.credentials;

        let logged_in = executor
            .measure(LOGIN_ACTION, move || async move {
                actions::login_and_view_dashboard(
                    task_set,
                    app_type,
                    &credentials.username,
                    &credentials.password,
                )
                .await
            })
            .await;

        // A login rejected with a 200 page never trips the HTTP check
        if logged_in.is_none() {
            self.task_set.session_mut().mark_login_failed();
        }

        self.task_set.session().raise_if_login_failed(LOGIN_ACTION)
    }

    /// Pick one action from the mix and run it through the executor.
    pub async fn run_one(&mut self) {
        let name = self.mix.choose(&mut self.rng).to_string();
        let Some(view) = actions::find_page_view(self.app_type, &name) else {
            return;
        };

        let executor = &self.executor;
        let task_set = &mut self.task_set;
        executor
            .measure(view.name, move || async move { actions::view_page(task_set, view).await })
            .await;
    }

    /// Log in, then run actions until `deadline`.
    pub async fn run(&mut self, deadline: Instant) -> Result<(), SessionError> {
        self.on_start().await?;
        while Instant::now() < deadline {
            self.run_one().await;
        }
        debug!(user = self.id, "Virtual user finished");
        Ok(())
    }
}

/// `start + offset`, or a validation error naming `setting` when the clock can't reach it.
fn offset_instant(start: Instant, offset: Duration, setting: &str) -> Result<Instant, ConfigError> {
    start.checked_add(offset).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{} of {}s is too long for this clock",
            setting,
            offset.as_secs()
        ))
    })
}

/// Run `settings.concurrency` users against the application for the test duration.
pub async fn run_load(
    app_type: AppType,
    settings: &AppSettings,
    sink: Arc<dyn EventSink>,
    users: Option<Dataset>,
) -> Result<RunSummary, RunnerError> {
    let policy = settings.timing_policy(app_type)?;
    let mix = build_action_mix(app_type, settings)?;
    let test_duration = settings.test_duration()?;
    let ramp_up = settings.ramp_up()?;
    let executor = ActionExecutor::new(
        policy,
        sink.clone(),
        ActionLogger::for_app(app_type, settings.verbose),
    );
    let base_url = settings.server_url();
    let concurrency = settings.concurrency as usize;

    info!(
        app = %app_type,
        url = %base_url,
        users = concurrency,
        target_interval_secs = policy.target_interval_secs(),
        duration_secs = test_duration.as_secs(),
        "Starting load"
    );

    let start = Instant::now();
    let deadline = offset_instant(start, test_duration, "test_duration")?;
    let mut handles = Vec::with_capacity(concurrency);

    for id in 0..concurrency {
        // Each user gets its own client, so cookies stay per session
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.secure)
            .timeout(Duration::from_secs(60))
            .build()?;
        let task_set = TaskSet::new(client, base_url.clone(), sink.clone());
        let credentials = Credentials::pick(users.as_ref(), settings);
        let mut user = VirtualUser::new(
            id,
            app_type,
            task_set,
            executor.clone(),
            mix.clone(),
            credentials,
        );
        let stagger = Duration::try_from_secs_f64(
            ramp_up.as_secs_f64() * id as f64 / concurrency as f64,
        )
        .unwrap_or(ramp_up);
        let start_at = offset_instant(start, stagger, "ramp-up")?;

        handles.push(tokio::spawn(async move {
            sleep_until(start_at).await;
            ACTIVE_USERS.inc();
            let outcome = timeout_at(deadline, user.run(deadline)).await;
            ACTIVE_USERS.dec();
            match outcome {
                Ok(Err(SessionError::StopUser(reason))) => {
                    warn!(user = id, reason = %reason, "Virtual user stopped early");
                    STOPPED_USERS_TOTAL.with_label_values(&["login_failed"]).inc();
                    true
                }
                _ => false,
            }
        }));
    }

    let mut summary = RunSummary {
        users_started: handles.len(),
        users_stopped_early: 0,
    };
    for handle in handles {
        match handle.await {
            Ok(true) => summary.users_stopped_early += 1,
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Virtual user task panicked"),
        }
    }

    // Leave a moment for in-flight telemetry before returning
    sleep(Duration::from_millis(100)).await;

    info!(
        users_started = summary.users_started,
        users_stopped_early = summary.users_stopped_early,
        "Load finished"
    );

    Ok(summary)
}

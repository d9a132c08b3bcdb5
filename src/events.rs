//! Action results and the sinks they are reported to.
//!
//! The load engine's reporting layer is an external collaborator; this
//! module only defines the publish interface and a couple of local sinks.

use std::sync::Mutex;

/// Request type reported for executor-timed actions.
pub const ACTION_REQUEST_TYPE: &str = "Action";

/// Outcome of one action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure { error: String },
}

/// Result of invoking one action through the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub action_name: String,
    pub elapsed_ms: u64,
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn success(action_name: &str, elapsed_ms: u64) -> Self {
        Self {
            action_name: action_name.to_string(),
            elapsed_ms,
            outcome: ActionOutcome::Success,
        }
    }

    pub fn failure(action_name: &str, elapsed_ms: u64, error: String) -> Self {
        Self {
            action_name: action_name.to_string(),
            elapsed_ms,
            outcome: ActionOutcome::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ActionOutcome::Success => None,
            ActionOutcome::Failure { error } => Some(error),
        }
    }

    /// The event published for this result.
    pub fn to_event(&self) -> RequestEvent {
        RequestEvent {
            request_type: ACTION_REQUEST_TYPE.to_string(),
            name: self.action_name.clone(),
            response_time_ms: self.elapsed_ms,
            response_length: 0,
            exception: self.error().map(str::to_string),
        }
    }
}

/// Payload accepted by an [`EventSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    pub request_type: String,
    pub name: String,
    pub response_time_ms: u64,
    pub response_length: u64,
    pub exception: Option<String>,
}

/// Receives success and failure telemetry from every virtual user.
///
/// Shared process-wide, so implementations must be safe for concurrent use.
pub trait EventSink: Send + Sync {
    fn request_success(&self, event: &RequestEvent);

    fn request_failure(&self, event: &RequestEvent);

    /// Publish an executor result on the matching channel.
    fn publish(&self, result: &ActionResult) {
        let event = result.to_event();
        if result.is_success() {
            self.request_success(&event);
        } else {
            self.request_failure(&event);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn request_success(&self, _event: &RequestEvent) {}

    fn request_failure(&self, _event: &RequestEvent) {}
}

/// Which channel an event was published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Success,
    Failure,
}

/// Keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(EventKind, RequestEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(EventKind, RequestEvent)> {
        self.lock().clone()
    }

    pub fn successes(&self) -> Vec<RequestEvent> {
        self.of_kind(EventKind::Success)
    }

    pub fn failures(&self) -> Vec<RequestEvent> {
        self.of_kind(EventKind::Failure)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn of_kind(&self, kind: EventKind) -> Vec<RequestEvent> {
        self.lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn push(&self, kind: EventKind, event: &RequestEvent) {
        self.lock().push((kind, event.clone()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(EventKind, RequestEvent)>> {
        // A panicking test thread must not hide the events recorded so far
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for RecordingSink {
    fn request_success(&self, event: &RequestEvent) {
        self.push(EventKind::Success, event);
    }

    fn request_failure(&self, event: &RequestEvent) {
        self.push(EventKind::Failure, event);
    }
}

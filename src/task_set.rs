//! HTTP task wrapper that reports failed responses.
//!
//! Every request an action makes goes through a [`TaskSet`], which owns the
//! virtual user's HTTP client and [`SessionState`]. Failed responses are
//! published to the event sink and, for login actions, flip the session's
//! login-failed flag. The response is always handed back unchanged.

use std::sync::Arc;

use reqwest::{Body, Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::{http_failure_message, FailureCategory};
use crate::events::{EventSink, RequestEvent};
use crate::headers::HeaderProfile;
use crate::session::SessionState;

/// Why a request counts as failed, or `None` if it succeeded.
///
/// A request fails when no response came back at all or when the status is
/// 400 or above. The text is built from the status and URL directly, so
/// classifying can never itself fail.
pub fn failure_reason(response: &Result<Response, reqwest::Error>) -> Option<String> {
    match response {
        Ok(resp) => {
            FailureCategory::from_status_code(resp.status().as_u16())?;
            Some(http_failure_message(resp.status(), resp.url().as_str()))
        }
        Err(e) => Some(format!("{}: {}", FailureCategory::from_reqwest_error(e), e)),
    }
}

/// Per-session HTTP wrapper.
pub struct TaskSet {
    client: Client,
    base_url: String,
    sink: Arc<dyn EventSink>,
    session: SessionState,
}

impl TaskSet {
    /// Create a task set with a fresh session.
    ///
    /// Give each virtual user its own `client` built with `cookie_store(true)`
    /// so login cookies are not shared between sessions.
    pub fn new(client: Client, base_url: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sink,
            session: SessionState::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// Absolute URL for `path`; absolute URLs pass through unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(
        &mut self,
        action_name: &str,
        path: &str,
        profile: HeaderProfile,
    ) -> Result<Response, reqwest::Error> {
        let request = self
            .client
            .get(self.url(path))
            .headers(profile.header_map());
        self.send(action_name, request).await
    }

    pub async fn post<B: Into<Body>>(
        &mut self,
        action_name: &str,
        path: &str,
        body: B,
        profile: HeaderProfile,
    ) -> Result<Response, reqwest::Error> {
        let request = self
            .client
            .post(self.url(path))
            .headers(profile.header_map())
            .body(body);
        self.send(action_name, request).await
    }

    /// POST an urlencoded form.
    pub async fn post_form<T: Serialize + ?Sized>(
        &mut self,
        action_name: &str,
        path: &str,
        form: &T,
        profile: HeaderProfile,
    ) -> Result<Response, reqwest::Error> {
        let request = self
            .client
            .post(self.url(path))
            .headers(profile.header_map())
            .form(form);
        self.send(action_name, request).await
    }

    /// POST a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        action_name: &str,
        path: &str,
        json: &T,
        profile: HeaderProfile,
    ) -> Result<Response, reqwest::Error> {
        let request = self
            .client
            .post(self.url(path))
            .headers(profile.header_map())
            .json(json);
        self.send(action_name, request).await
    }

    /// Send any prepared request and check the outcome.
    pub async fn send(
        &mut self,
        action_name: &str,
        request: RequestBuilder,
    ) -> Result<Response, reqwest::Error> {
        let start = Instant::now();
        let (client, request) = request.build_split();
        let (request_type, response) = match request {
            Ok(request) => {
                let method = request.method().to_string();
                debug!(action = action_name, method = %method, url = %request.url(), "Sending request");
                (method, client.execute(request).await)
            }
            Err(e) => ("HTTP".to_string(), Err(e)),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        self.failure_check(action_name, &request_type, &response, elapsed_ms);
        response
    }

    /// Report `response` if it failed. Returns true on failure.
    ///
    /// Failures of actions whose name contains `login` also mark the
    /// session's login as failed.
    pub fn failure_check(
        &mut self,
        action_name: &str,
        request_type: &str,
        response: &Result<Response, reqwest::Error>,
        elapsed_ms: u64,
    ) -> bool {
        let Some(reason) = failure_reason(response) else {
            return false;
        };

        if action_name.contains("login") {
            self.session.mark_login_failed();
        }

        warn!(
            action = action_name,
            request_type = request_type,
            error = %reason,
            "Request failed"
        );

        self.sink.request_failure(&RequestEvent {
            request_type: request_type.to_string(),
            name: action_name.to_string(),
            response_time_ms: elapsed_ms,
            response_length: 0,
            exception: Some(reason),
        });

        true
    }
}

//! Error types for actions and classification of failed HTTP requests.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::data_source::DataSourceError;
use crate::extractor::ExtractionError;
use crate::session::SessionError;

/// Errors an action body can return to the executor.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    UnexpectedStatus(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Data(#[from] DataSourceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0}")]
    MissingValue(String),
}

impl ActionError {
    /// Error for a response whose status marks it as failed.
    pub fn unexpected_status(status: StatusCode, url: &str) -> Self {
        ActionError::UnexpectedStatus(http_failure_message(status, url))
    }
}

/// Categories of failed HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// HTTP 4xx
    ClientError,

    /// HTTP 5xx
    ServerError,

    /// No response: DNS, refused connection, broken body, etc.
    TransportError,

    TimeoutError,

    OtherError,
}

impl FailureCategory {
    /// Category for a status code, or `None` for anything below 400.
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            100..=399 => None,
            400..=499 => Some(FailureCategory::ClientError),
            500..=599 => Some(FailureCategory::ServerError),
            _ => Some(FailureCategory::OtherError),
        }
    }

    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            FailureCategory::TimeoutError
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16()).unwrap_or(FailureCategory::OtherError)
        } else if error.is_connect() || error.is_request() || error.is_body() || error.is_decode()
        {
            FailureCategory::TransportError
        } else {
            FailureCategory::OtherError
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureCategory::ClientError => "Client Error",
            FailureCategory::ServerError => "Server Error",
            FailureCategory::TransportError => "Transport Error",
            FailureCategory::TimeoutError => "Timeout Error",
            FailureCategory::OtherError => "Error",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Diagnostic for a failed status, e.g. `404 Client Error: Not Found for url: ...`.
///
/// Built straight from the status; nothing is raised to get it.
pub fn http_failure_message(status: StatusCode, url: &str) -> String {
    let category = FailureCategory::from_status_code(status.as_u16())
        .unwrap_or(FailureCategory::OtherError);
    format!(
        "{} {}: {} for url: {}",
        status.as_u16(),
        category,
        status.canonical_reason().unwrap_or("Unknown Status"),
        url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_redirect_are_not_failures() {
        assert_eq!(FailureCategory::from_status_code(200), None);
        assert_eq!(FailureCategory::from_status_code(302), None);
    }

    #[test]
    fn categorizes_error_statuses() {
        assert_eq!(
            FailureCategory::from_status_code(401),
            Some(FailureCategory::ClientError)
        );
        assert_eq!(
            FailureCategory::from_status_code(503),
            Some(FailureCategory::ServerError)
        );
        assert_eq!(
            FailureCategory::from_status_code(999),
            Some(FailureCategory::OtherError)
        );
    }

    #[test]
    fn failure_message_names_status_and_url() {
        let msg = http_failure_message(StatusCode::NOT_FOUND, "http://jira.local/browse/X-1");
        assert_eq!(
            msg,
            "404 Client Error: Not Found for url: http://jira.local/browse/X-1"
        );

        let msg = http_failure_message(StatusCode::BAD_GATEWAY, "http://wiki.local/");
        assert!(msg.starts_with("502 Server Error: Bad Gateway"), "msg: {}", msg);
    }

    #[test]
    fn unexpected_status_error_displays_message() {
        let err = ActionError::unexpected_status(StatusCode::FORBIDDEN, "http://x/login.jsp");
        assert_eq!(
            err.to_string(),
            "403 Client Error: Forbidden for url: http://x/login.jsp"
        );
    }

    #[test]
    fn missing_value_displays_message() {
        let err = ActionError::MissingValue("There are no projects".to_string());
        assert_eq!(err.to_string(), "There are no projects");
    }
}

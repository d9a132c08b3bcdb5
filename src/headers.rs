//! HTTP header presets used by the application actions.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

const TEXT_HEADERS: &[(&str, &str)] = &[
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Content-Type", "application/x-www-form-urlencoded"),
    ("Accept-Encoding", "gzip, deflate"),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
];

const RESOURCE_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json, text/javascript, */*; q=0.01"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Content-Type", "application/json"),
    ("X-Requested-With", "XMLHttpRequest"),
];

const ADMIN_HEADERS: &[(&str, &str)] = &[
    ("Accept-Language", "en-US,en;q=0.5"),
    ("X-AUSERNAME", "admin"),
    ("X-Requested-With", "XMLHttpRequest"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Accept", "*/*"),
];

const NO_TOKEN_HEADERS: &[(&str, &str)] = &[
    ("Accept-Language", "en-US,en;q=0.5"),
    ("X-Requested-With", "XMLHttpRequest"),
    ("__amdModuleName", "jira/issue/utils/xsrf-token-header"),
    (
        "Content-Type",
        "application/x-www-form-urlencoded; charset=UTF-8",
    ),
    ("Accept-Encoding", "gzip, deflate"),
    ("Accept", "application/json, text/javascript, */*; q=0.01"),
    ("X-Atlassian-Token", "no-check"),
];

const JSON_HEADERS: &[(&str, &str)] = &[
    ("Accept-Language", "en-US,en;q=0.5"),
    ("X-Requested-With", "XMLHttpRequest"),
    ("Content-Type", "application/json"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Accept", "application/json, text/javascript, */*; q=0.01"),
];

/// Named header presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderProfile {
    /// Browser page loads and form posts.
    Text,
    /// XHR requests for JSON resources.
    Resource,
    /// Admin XHR requests.
    Admin,
    /// Form posts that skip the XSRF token check.
    NoToken,
    /// Generic JSON XHR.
    Json,
}

impl HeaderProfile {
    /// Header name/value pairs in declaration order.
    pub fn pairs(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            HeaderProfile::Text => TEXT_HEADERS,
            HeaderProfile::Resource => RESOURCE_HEADERS,
            HeaderProfile::Admin => ADMIN_HEADERS,
            HeaderProfile::NoToken => NO_TOKEN_HEADERS,
            HeaderProfile::Json => JSON_HEADERS,
        }
    }

    /// Value of a header in this profile, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.pairs()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    /// Build a `HeaderMap` for use with reqwest.
    pub fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.pairs().len());
        for &(name, value) in self.pairs() {
            // from_bytes lowercases; from_static would reject the mixed-case names
            if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                headers.insert(name, HeaderValue::from_static(value));
            }
        }
        headers
    }

    pub fn all() -> [HeaderProfile; 5] {
        [
            HeaderProfile::Text,
            HeaderProfile::Resource,
            HeaderProfile::Admin,
            HeaderProfile::NoToken,
            HeaderProfile::Json,
        ]
    }
}

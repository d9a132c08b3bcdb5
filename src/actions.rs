//! Built-in actions for the demo runner.
//!
//! A login action per application plus a few read-only page views. Each
//! action returns `Result<_, ActionError>` and is meant to be run through
//! [`ActionExecutor::measure`](crate::executor::ActionExecutor::measure).

use tracing::debug;

use crate::app::AppType;
use crate::errors::ActionError;
use crate::extractor::fetch_by_re;
use crate::headers::HeaderProfile;
use crate::task_set::TaskSet;

/// Name of the login action; contains `login` so failures flag the session.
pub const LOGIN_ACTION: &str = "login_and_view_dashboard";

/// Session key holding the XSRF token scraped after login.
pub const TOKEN_KEY: &str = "token";

/// A read-only page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    pub name: &'static str,
    pub path: &'static str,
    pub profile: HeaderProfile,
}

const JIRA_PAGE_VIEWS: &[PageView] = &[
    PageView {
        name: "view_dashboard",
        path: "/secure/Dashboard.jspa",
        profile: HeaderProfile::Text,
    },
    PageView {
        name: "browse_projects",
        path: "/secure/BrowseProjects.jspa",
        profile: HeaderProfile::Text,
    },
    PageView {
        name: "search_jql",
        path: "/issues/?jql=order%20by%20created%20DESC",
        profile: HeaderProfile::Text,
    },
    PageView {
        name: "view_myself",
        path: "/rest/api/2/myself",
        profile: HeaderProfile::Json,
    },
];

const CONFLUENCE_PAGE_VIEWS: &[PageView] = &[
    PageView {
        name: "view_dashboard",
        path: "/index.action",
        profile: HeaderProfile::Text,
    },
    PageView {
        name: "view_spaces",
        path: "/spacedirectory/view.action",
        profile: HeaderProfile::Text,
    },
    PageView {
        name: "view_recently_viewed",
        path: "/rest/recentlyviewed/1.0/recent?limit=8",
        profile: HeaderProfile::Resource,
    },
    PageView {
        name: "view_myself",
        path: "/rest/api/user/current",
        profile: HeaderProfile::Json,
    },
];

/// Page views available for an application.
pub fn page_views(app_type: AppType) -> &'static [PageView] {
    match app_type {
        AppType::Jira => JIRA_PAGE_VIEWS,
        AppType::Confluence => CONFLUENCE_PAGE_VIEWS,
    }
}

pub fn find_page_view(app_type: AppType, name: &str) -> Option<&'static PageView> {
    page_views(app_type).iter().find(|view| view.name == name)
}

fn dashboard_path(app_type: AppType) -> &'static str {
    match app_type {
        AppType::Jira => "/secure/Dashboard.jspa",
        AppType::Confluence => "/index.action",
    }
}

fn token_pattern(app_type: AppType) -> &'static str {
    match app_type {
        AppType::Jira => r#"name="atlassian-token" content="(.+?)""#,
        AppType::Confluence => r#"name="ajs-atl-token" content="(.+?)""#,
    }
}

/// Log in with the given credentials, open the dashboard and keep the
/// XSRF token in the session for later actions.
pub async fn login_and_view_dashboard(
    task_set: &mut TaskSet,
    app_type: AppType,
    username: &str,
    password: &str,
) -> Result<(), ActionError> {
    let (login_path, form): (&str, Vec<(&str, &str)>) = match app_type {
        AppType::Jira => (
            "/login.jsp",
            vec![
                ("os_username", username),
                ("os_password", password),
                ("os_destination", ""),
                ("user_role", ""),
                ("atl_token", ""),
                ("login", "Log in"),
            ],
        ),
        AppType::Confluence => (
            "/dologin.action",
            vec![
                ("os_username", username),
                ("os_password", password),
                ("os_cookie", "true"),
                ("os_destination", ""),
                ("login", "Log in"),
            ],
        ),
    };

    let response = task_set
        .post_form(LOGIN_ACTION, login_path, &form, HeaderProfile::Text)
        .await?;
    ensure_success(&response)?;

    let response = task_set
        .get(LOGIN_ACTION, dashboard_path(app_type), HeaderProfile::Text)
        .await?;
    ensure_success(&response)?;
    let body = response.text().await?;

    let token = fetch_by_re(token_pattern(app_type), &body, 1)?.ok_or_else(|| {
        ActionError::MissingValue(format!(
            "{}: no XSRF token on the dashboard page, login was not accepted",
            LOGIN_ACTION
        ))
    })?;
    debug!(user = username, "Logged in");
    task_set.session_mut().set(TOKEN_KEY, token);

    Ok(())
}

/// Open a page and read its body. Returns the body length in bytes.
pub async fn view_page(task_set: &mut TaskSet, view: &PageView) -> Result<usize, ActionError> {
    let response = task_set.get(view.name, view.path, view.profile).await?;
    ensure_success(&response)?;
    let body = response.bytes().await?;
    Ok(body.len())
}

fn ensure_success(response: &reqwest::Response) -> Result<(), ActionError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ActionError::unexpected_status(status, response.url().as_str()));
    }
    Ok(())
}

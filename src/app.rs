use std::fmt;
use std::str::FromStr;

/// The application under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppType {
    Jira,
    Confluence,
}

impl AppType {
    /// Lowercase label used in metrics, env var prefixes and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            AppType::Jira => "jira",
            AppType::Confluence => "confluence",
        }
    }

    /// Prefix for environment variable overrides, e.g. `JIRA_`.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            AppType::Jira => "JIRA_",
            AppType::Confluence => "CONFLUENCE_",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for AppType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jira" => Ok(AppType::Jira),
            "confluence" => Ok(AppType::Confluence),
            other => Err(format!(
                "Unknown application type: '{}'. Use 'jira' or 'confluence'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Jira".parse::<AppType>().unwrap(), AppType::Jira);
        assert_eq!(" CONFLUENCE ".parse::<AppType>().unwrap(), AppType::Confluence);
    }

    #[test]
    fn rejects_unknown() {
        let err = "bitbucket".parse::<AppType>().unwrap_err();
        assert!(err.contains("bitbucket"), "error was: {}", err);
    }

    #[test]
    fn display_matches_label() {
        assert_eq!(AppType::Jira.to_string(), "jira");
        assert_eq!(AppType::Confluence.env_prefix(), "CONFLUENCE_");
    }
}

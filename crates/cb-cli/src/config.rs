//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use cb_core::TieBreak;
use cb_jira::report::{DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};
use cb_jira::{HttpTracker, JiraError, ReportOptions};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracker site, e.g. `https://example.atlassian.net`.
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    /// Records requested per page from paginated feeds.
    pub page_size: u64,
    /// Issues whose worklogs are fetched at once.
    pub concurrency: usize,
    /// Maximum issues considered by the worklog report.
    pub search_limit: u32,
    /// Dominant-assignee rule for equal time.
    pub tie_break: TieBreak,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("concurrency", &self.concurrency)
            .field("search_limit", &self.search_limit)
            .field("tie_break", &self.tie_break)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            email: None,
            api_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            tie_break: TieBreak::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // CB_BASE_URL, CB_API_TOKEN, ...
        figment = figment.merge(Env::prefixed("CB_"));

        figment.extract()
    }

    pub const fn report_options(&self) -> ReportOptions {
        ReportOptions {
            page_size: self.page_size,
            concurrency: self.concurrency,
            search_limit: self.search_limit,
            tie_break: self.tie_break,
        }
    }

    /// Builds the tracker client. Missing settings are reported here, not at
    /// load time, so commands that never reach the tracker work without them.
    pub fn tracker(&self) -> Result<HttpTracker, JiraError> {
        HttpTracker::new(
            self.base_url.clone().unwrap_or_default(),
            self.email.clone().unwrap_or_default(),
            self.api_token.clone().unwrap_or_default(),
        )
    }
}

/// Returns the platform-specific config directory for cb.
///
/// On Linux: `~/.config/chronoboard`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chronoboard"))
}

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cb_core::{AccountId, HistoryRecord, IssueKey, RawWorkLog};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::fetch::{paginate_tokens, paginate_up_to, with_fallback};
use crate::wire::{
    ChangelogPage, ISSUE_FIELDS, IssueResponse, SearchRequest, SearchResponse, UserResponse,
    WorklogPage, parse_api_error,
};
use crate::{Issue, IssueTracker, JiraError, JiraResult, Page, SearchHit};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const API_PREFIX: &str = "/rest/api/3";
/// Issues requested per search page.
const SEARCH_PAGE: u32 = 100;

/// Issue-tracker REST client using basic authentication.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct HttpTracker {
    http: reqwest::Client,
    api_base: Url,
    email: String,
    api_token: String,
}

impl fmt::Debug for HttpTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTracker")
            .field("api_base", &self.api_base.as_str())
            .field("email", &self.email)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpTracker {
    /// Creates a client for the tracker at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is blank, if `base_url` is not an
    /// http(s) URL, or if the HTTP client fails to build.
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, JiraError> {
        let base_url = base_url.into();
        let email = email.into();
        let api_token = api_token.into();

        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "base_url is not set",
            });
        }
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(JiraError::InvalidConfig {
                reason: "base_url must start with http:// or https://",
            });
        }
        let api_base = Url::parse(&format!("{base}{API_PREFIX}"))
            .ok()
            .filter(|url| !url.cannot_be_a_base() && url.query().is_none())
            .ok_or(JiraError::InvalidConfig {
                reason: "base_url is not a valid URL",
            })?;
        if email.trim().is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "email is not set",
            });
        }
        if api_token.trim().is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "api_token is not set",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(JiraError::ClientBuild)?;

        Ok(Self {
            http,
            api_base,
            email,
            api_token,
        })
    }

    /// API URL for `segments`; each segment is percent-encoded, so an issue
    /// key can never add path, query or fragment parts.
    fn endpoint(&self, segments: &[&str]) -> JiraResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| JiraError::InvalidConfig {
                reason: "base_url is not a valid URL",
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> JiraResult<T> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &SearchRequest<'_>,
    ) -> JiraResult<T> {
        let response = self
            .http
            .post(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// `/search/jql`, following `nextPageToken` until `limit` issues.
    async fn search_by_cursor(&self, jql: &str, limit: u32) -> JiraResult<Vec<IssueResponse>> {
        let url = self.endpoint(&["search", "jql"])?;
        let page_size = SEARCH_PAGE.min(limit.max(1));
        paginate_tokens(limit as usize, |token| {
            let url = url.clone();
            async move {
                let request = SearchRequest::cursor(jql, page_size, token.as_deref());
                let response: SearchResponse = self.post_json(url, &request).await?;
                Ok(response.into_token_page())
            }
        })
        .await
    }

    /// Legacy `/search` with offset pagination, capped at `limit` issues.
    async fn search_by_offset(&self, jql: &str, limit: u32) -> JiraResult<Vec<IssueResponse>> {
        let url = self.endpoint(&["search"])?;
        let page_size = SEARCH_PAGE.min(limit.max(1));
        paginate_up_to(u64::from(page_size), limit as usize, |start_at| {
            let url = url.clone();
            async move {
                let request = SearchRequest::offset(jql, page_size, start_at);
                let response: SearchResponse = self.post_json(url, &request).await?;
                Ok(response.into_page())
            }
        })
        .await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> JiraResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(parse_api_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|err| JiraError::InvalidResponse(err.to_string()))
}

fn paging(start_at: u64, max_results: u64) -> [(&'static str, String); 2] {
    [
        ("startAt", start_at.to_string()),
        ("maxResults", max_results.to_string()),
    ]
}

#[async_trait]
impl IssueTracker for HttpTracker {
    async fn issue(&self, key: &IssueKey) -> JiraResult<Issue> {
        let url = self.endpoint(&["issue", key.as_str()])?;
        let response: IssueResponse = self
            .get_json(url, &[("fields", ISSUE_FIELDS.to_string())])
            .await?;
        response.into_issue()
    }

    async fn changelog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<HistoryRecord>> {
        let url = self.endpoint(&["issue", key.as_str(), "changelog"])?;
        let page: ChangelogPage = self.get_json(url, &paging(start_at, max_results)).await?;
        Ok(page.into())
    }

    async fn worklog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<RawWorkLog>> {
        let url = self.endpoint(&["issue", key.as_str(), "worklog"])?;
        let page: WorklogPage = self.get_json(url, &paging(start_at, max_results)).await?;
        Ok(page.into())
    }

    async fn search(&self, jql: &str, limit: u32) -> JiraResult<Vec<SearchHit>> {
        let issues = with_fallback(
            "/search/jql",
            self.search_by_cursor(jql, limit),
            || self.search_by_offset(jql, limit),
        )
        .await?;
        issues.into_iter().map(IssueResponse::into_hit).collect()
    }

    async fn display_name(&self, account: &AccountId) -> JiraResult<Option<String>> {
        let url = self.endpoint(&["user"])?;
        let user: UserResponse = self
            .get_json(url, &[("accountId", account.to_string())])
            .await?;
        Ok(user.display_name.filter(|name| !name.is_empty()))
    }
}

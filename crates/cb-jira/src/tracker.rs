use async_trait::async_trait;
use cb_core::{AccountId, HistoryRecord, IssueKey, IssueRef, RawWorkLog};
use chrono::{DateTime, Utc};

use crate::JiraResult;

/// The fields of an issue the reports read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: IssueKey,
    pub summary: Option<String>,
    /// Present-day status name.
    pub status: Option<String>,
    /// Present-day assignee display name.
    pub assignee: Option<String>,
    pub created: DateTime<Utc>,
    /// Resolution time; `None` while the issue is open.
    pub resolved: Option<DateTime<Utc>>,
}

impl Issue {
    /// End of the issue's lifetime: resolution time, else `now`.
    pub fn end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.resolved.unwrap_or(now)
    }
}

/// An issue matched by a search, with the fields the reports read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub key: IssueKey,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    /// Project key.
    pub project: Option<String>,
}

impl From<SearchHit> for IssueRef {
    fn from(hit: SearchHit) -> Self {
        Self {
            key: hit.key,
            summary: hit.summary,
        }
    }
}

/// One page of a paginated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub values: Vec<T>,
    /// Total record count, when the tracker reports one.
    pub total: Option<u64>,
    pub is_last: Option<bool>,
}

impl<T> Page<T> {
    pub const fn new(values: Vec<T>, total: Option<u64>, is_last: Option<bool>) -> Self {
        Self {
            values,
            total,
            is_last,
        }
    }
}

/// Read access to an issue tracker.
///
/// Page methods take a zero-based `start_at` offset and a page size; callers
/// own the pagination loop.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn issue(&self, key: &IssueKey) -> JiraResult<Issue>;

    async fn changelog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<HistoryRecord>>;

    async fn worklog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<RawWorkLog>>;

    /// Issues matching `jql`, at most `limit` of them.
    async fn search(&self, jql: &str, limit: u32) -> JiraResult<Vec<SearchHit>>;

    /// Display name of a user, if the tracker knows one.
    async fn display_name(&self, account: &AccountId) -> JiraResult<Option<String>>;
}

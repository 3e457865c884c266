//! In-memory tracker for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use cb_core::{AccountId, HistoryRecord, IssueKey, RawWorkLog, parse_timestamp};
use serde_json::Value;

use crate::{Issue, IssueTracker, JiraError, JiraResult, Page, SearchHit};

/// Serves canned issues, histories and worklogs, slicing them into pages.
#[derive(Debug, Default)]
pub struct FakeTracker {
    issues: HashMap<String, Issue>,
    histories: HashMap<String, Vec<HistoryRecord>>,
    worklogs: HashMap<String, Vec<RawWorkLog>>,
    search_results: Vec<SearchHit>,
    names: HashMap<String, String>,
    failing_worklogs: HashSet<String>,
    failing_names: HashSet<String>,
    /// When set, pages omit `total`.
    pub hide_totals: bool,
    /// Every call, in order, e.g. `changelog TICK-1 @0`.
    calls: Mutex<Vec<String>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(
        mut self,
        key: &str,
        created: &str,
        resolved: Option<&str>,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Self {
        let issue = Issue {
            key: IssueKey::new(key).unwrap(),
            summary: Some(format!("Summary of {key}")),
            status: status.map(String::from),
            assignee: assignee.map(String::from),
            created: parse_timestamp(created).unwrap(),
            resolved: resolved.map(|r| parse_timestamp(r).unwrap()),
        };
        self.issues.insert(key.to_string(), issue);
        self
    }

    pub fn with_history(mut self, key: &str, histories: Value) -> Self {
        self.histories
            .insert(key.to_string(), serde_json::from_value(histories).unwrap());
        self
    }

    pub fn with_worklogs(mut self, key: &str, worklogs: Value) -> Self {
        self.worklogs
            .insert(key.to_string(), serde_json::from_value(worklogs).unwrap());
        self
    }

    pub fn with_search_result(self, key: &str, summary: Option<&str>) -> Self {
        self.with_search_hit(key, summary, None, None)
    }

    /// Adds a search result; every search returns the same results.
    pub fn with_search_hit(
        mut self,
        key: &str,
        summary: Option<&str>,
        status: Option<&str>,
        project: Option<&str>,
    ) -> Self {
        self.search_results.push(SearchHit {
            key: IssueKey::new(key).unwrap(),
            summary: summary.map(String::from),
            status: status.map(String::from),
            assignee: None,
            project: project.map(String::from),
        });
        self
    }

    pub fn with_name(mut self, account: &str, name: &str) -> Self {
        self.names.insert(account.to_string(), name.to_string());
        self
    }

    pub fn failing_worklogs_for(mut self, key: &str) -> Self {
        self.failing_worklogs.insert(key.to_string());
        self
    }

    pub fn failing_name_for(mut self, account: &str) -> Self {
        self.failing_names.insert(account.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page<T: Clone>(&self, all: &[T], start_at: u64, max_results: u64) -> Page<T> {
        let start = usize::try_from(start_at).unwrap().min(all.len());
        let end = (start + usize::try_from(max_results).unwrap()).min(all.len());
        let total = (!self.hide_totals).then_some(all.len() as u64);
        Page::new(all[start..end].to_vec(), total, None)
    }
}

fn not_found(key: &str) -> JiraError {
    JiraError::Api {
        status: 404,
        message: format!("Issue does not exist: {key}"),
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn issue(&self, key: &IssueKey) -> JiraResult<Issue> {
        self.record(format!("issue {key}"));
        self.issues
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| not_found(key.as_str()))
    }

    async fn changelog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<HistoryRecord>> {
        self.record(format!("changelog {key} @{start_at}"));
        let all = self.histories.get(key.as_str()).map_or(&[][..], Vec::as_slice);
        Ok(self.page(all, start_at, max_results))
    }

    async fn worklog_page(
        &self,
        key: &IssueKey,
        start_at: u64,
        max_results: u64,
    ) -> JiraResult<Page<RawWorkLog>> {
        self.record(format!("worklog {key} @{start_at}"));
        if self.failing_worklogs.contains(key.as_str()) {
            return Err(JiraError::Api {
                status: 500,
                message: "worklog feed unavailable".to_string(),
            });
        }
        let all = self.worklogs.get(key.as_str()).map_or(&[][..], Vec::as_slice);
        Ok(self.page(all, start_at, max_results))
    }

    async fn search(&self, jql: &str, limit: u32) -> JiraResult<Vec<SearchHit>> {
        self.record(format!("search {jql}"));
        Ok(self
            .search_results
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn display_name(&self, account: &AccountId) -> JiraResult<Option<String>> {
        self.record(format!("user {account}"));
        if self.failing_names.contains(account.as_str()) {
            return Err(JiraError::Api {
                status: 429,
                message: "rate limited".to_string(),
            });
        }
        Ok(self.names.get(account.as_str()).cloned())
    }
}

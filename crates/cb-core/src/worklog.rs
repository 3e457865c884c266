//! Date-windowed work-time aggregation across issues and users.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::seconds_to_days;
use crate::timestamp::{Window, parse_timestamp};
use crate::types::{AccountId, IssueKey, IssueRef, ValidationError};

/// Placeholder for absent summaries and status-change columns.
pub const PLACEHOLDER: &str = "-";

/// A cross-ticket worklog request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogQuery {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// A [`WorkLogQuery`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    /// Requested users in first-mention order, duplicates removed.
    pub users: Vec<AccountId>,
    pub window: Window,
}

impl WorkLogQuery {
    pub fn new(users: Vec<String>, start_date: Option<String>, end_date: Option<String>) -> Self {
        Self {
            users,
            start_date,
            end_date,
        }
    }

    /// Checks the request before any upstream call is made.
    ///
    /// Blank user entries are ignored; at least one real user and both dates
    /// are required.
    pub fn validate(&self) -> Result<ValidatedQuery, ValidationError> {
        let mut users: Vec<AccountId> = Vec::new();
        for raw in &self.users {
            let Ok(id) = AccountId::new(raw.trim()) else {
                continue;
            };
            if !users.contains(&id) {
                users.push(id);
            }
        }
        if users.is_empty() {
            return Err(ValidationError::MissingUsers);
        }
        let window = Window::parse(self.start_date.as_deref(), self.end_date.as_deref())?;
        Ok(ValidatedQuery { users, window })
    }
}

/// A person reference inside a worklog record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogUser {
    #[serde(default)]
    pub account_id: Option<String>,
    /// Legacy identifier used by older tracker deployments.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A worklog record as delivered by the tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkLog {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub author: Option<WorkLogUser>,
    #[serde(default)]
    pub update_author: Option<WorkLogUser>,
    /// Start instant, usually with a colon-less offset.
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub time_spent_seconds: Option<i64>,
}

/// A validated worklog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLogEntry {
    pub author_id: AccountId,
    pub started_at: DateTime<Utc>,
    pub time_spent_seconds: u64,
}

/// Why a worklog record was left out of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// No author, update author or legacy key.
    #[error("missing author")]
    MissingAuthor,
    #[error("missing started timestamp")]
    MissingStarted,
    /// `started` did not parse even after offset normalization.
    #[error("unparsable started timestamp: {0}")]
    InvalidStarted(String),
}

impl RawWorkLog {
    /// Author identity: author account, then update author account, then the
    /// author's legacy key. First non-empty value wins.
    pub fn author_id(&self) -> Option<&str> {
        fn account(user: Option<&WorkLogUser>) -> Option<&str> {
            user.and_then(|u| u.account_id.as_deref())
                .filter(|id| !id.is_empty())
        }

        account(self.author.as_ref())
            .or_else(|| account(self.update_author.as_ref()))
            .or_else(|| {
                self.author
                    .as_ref()
                    .and_then(|u| u.key.as_deref())
                    .filter(|key| !key.is_empty())
            })
    }

    /// Validates the record into an entry.
    pub fn to_entry(&self) -> Result<WorkLogEntry, SkipReason> {
        let author_id = self
            .author_id()
            .and_then(|id| AccountId::new(id).ok())
            .ok_or(SkipReason::MissingAuthor)?;
        let raw = self
            .started
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingStarted)?;
        let started_at =
            parse_timestamp(raw).ok_or_else(|| SkipReason::InvalidStarted(raw.to_string()))?;
        let time_spent_seconds = self
            .time_spent_seconds
            .and_then(|s| u64::try_from(s).ok())
            .unwrap_or(0);
        Ok(WorkLogEntry {
            author_id,
            started_at,
            time_spent_seconds,
        })
    }
}

/// Logged time for one `(author, issue)` pair inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLogAggregateRow {
    pub author_id: AccountId,
    pub issue_key: IssueKey,
    pub summary: Option<String>,
    pub total_seconds: u64,
}

impl WorkLogAggregateRow {
    /// Total time in 8-hour days, rounded to two decimals.
    pub fn sum_spent_days(&self) -> f64 {
        seconds_to_days(self.total_seconds)
    }

    /// Summary text, or `-` when the issue has none.
    pub fn work_description(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER)
    }
}

/// Counters describing what an aggregation kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub considered: usize,
    pub accepted: usize,
    pub other_author: usize,
    pub outside_window: usize,
    pub malformed: usize,
}

/// Folds worklogs of many issues into per-`(author, issue)` totals.
#[derive(Debug)]
pub struct WorkLogAggregator {
    users: HashSet<AccountId>,
    window: Window,
    buckets: HashMap<(AccountId, IssueKey), WorkLogAggregateRow>,
    stats: AggregationStats,
}

impl WorkLogAggregator {
    pub fn new(users: impl IntoIterator<Item = AccountId>, window: Window) -> Self {
        Self {
            users: users.into_iter().collect(),
            window,
            buckets: HashMap::new(),
            stats: AggregationStats::default(),
        }
    }

    /// Adds one issue's worklogs. Returns how many entries were counted.
    pub fn add_issue(&mut self, issue: &IssueRef, worklogs: &[RawWorkLog]) -> usize {
        let mut accepted = 0;
        for raw in worklogs {
            self.stats.considered += 1;
            let entry = match raw.to_entry() {
                Ok(entry) => entry,
                Err(SkipReason::MissingAuthor) => {
                    self.stats.other_author += 1;
                    continue;
                }
                Err(reason) => {
                    // Unknown authors are dropped silently; only log records
                    // that would otherwise have counted.
                    if raw.author_id().is_some_and(|id| self.is_requested(id)) {
                        tracing::debug!(
                            issue = %issue.key,
                            worklog = raw.id.as_deref().unwrap_or("-"),
                            %reason,
                            "skipping worklog"
                        );
                        self.stats.malformed += 1;
                    } else {
                        self.stats.other_author += 1;
                    }
                    continue;
                }
            };

            if !self.users.contains(&entry.author_id) {
                self.stats.other_author += 1;
                continue;
            }
            if !self.window.contains(entry.started_at) {
                self.stats.outside_window += 1;
                continue;
            }

            let row = self
                .buckets
                .entry((entry.author_id.clone(), issue.key.clone()))
                .or_insert_with(|| WorkLogAggregateRow {
                    author_id: entry.author_id.clone(),
                    issue_key: issue.key.clone(),
                    summary: issue.summary.clone(),
                    total_seconds: 0,
                });
            row.total_seconds += entry.time_spent_seconds;
            accepted += 1;
        }
        self.stats.accepted += accepted;
        accepted
    }

    fn is_requested(&self, id: &str) -> bool {
        self.users.iter().any(|u| u.as_str() == id)
    }

    pub const fn stats(&self) -> AggregationStats {
        self.stats
    }

    /// Finishes the fold. Rows are ordered by author id, then issue key.
    pub fn finish(self) -> Vec<WorkLogAggregateRow> {
        let mut rows: Vec<_> = self.buckets.into_values().collect();
        rows.sort_by(|a, b| {
            a.author_id
                .cmp(&b.author_id)
                .then_with(|| a.issue_key.cmp(&b.issue_key))
        });
        rows
    }
}

/// One line of the cross-ticket worklog report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogItem {
    pub display_name: String,
    pub ticket_key: String,
    pub work_description: String,
    pub status_changed: String,
    pub sum_spent_days: f64,
}

/// Maps rows to report items and orders them by display name, then ticket.
///
/// Authors missing from `names` are shown by account id.
pub fn into_items(
    rows: Vec<WorkLogAggregateRow>,
    names: &HashMap<AccountId, String>,
) -> Vec<WorkLogItem> {
    let mut items: Vec<WorkLogItem> = rows
        .into_iter()
        .map(|row| WorkLogItem {
            display_name: names
                .get(&row.author_id)
                .cloned()
                .unwrap_or_else(|| row.author_id.to_string()),
            work_description: row.work_description().to_string(),
            status_changed: PLACEHOLDER.to_string(),
            sum_spent_days: row.sum_spent_days(),
            ticket_key: row.issue_key.into(),
        })
        .collect();
    items.sort_by(|a, b| {
        human_order(&a.display_name, &b.display_name)
            .then_with(|| human_order(&a.ticket_key, &b.ticket_key))
    });
    items
}

/// Case-insensitive ordering with a byte-wise tie-break so output is total.
fn human_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users(ids: &[&str]) -> Vec<AccountId> {
        ids.iter().map(|id| AccountId::new(*id).unwrap()).collect()
    }

    fn march() -> Window {
        Window::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap()
    }

    fn issue(key: &str, summary: Option<&str>) -> IssueRef {
        IssueRef {
            key: IssueKey::new(key).unwrap(),
            summary: summary.map(String::from),
        }
    }

    fn worklog(author: &str, started: &str, seconds: i64) -> RawWorkLog {
        serde_json::from_value(json!({
            "author": {"accountId": author},
            "started": started,
            "timeSpentSeconds": seconds
        }))
        .unwrap()
    }

    #[test]
    fn query_requires_users_and_dates() {
        let query = WorkLogQuery::new(
            vec![" ".to_string()],
            Some("2024-03-01".to_string()),
            Some("2024-03-31".to_string()),
        );
        assert_eq!(query.validate(), Err(ValidationError::MissingUsers));

        let query = WorkLogQuery::new(vec!["u1".to_string()], None, Some("2024-03-31".to_string()));
        assert_eq!(
            query.validate(),
            Err(ValidationError::MissingDate { field: "start date" })
        );
    }

    #[test]
    fn query_dedups_users_in_order() {
        let query: WorkLogQuery = serde_json::from_value(json!({
            "users": ["u2", "u1", "u2"],
            "startDate": "2024-03-01",
            "endDate": "2024-03-31"
        }))
        .unwrap();

        let valid = query.validate().unwrap();
        assert_eq!(valid.users, users(&["u2", "u1"]));
        assert_eq!(valid.window, march());
    }

    #[test]
    fn author_fallback_chain() {
        let primary: RawWorkLog = serde_json::from_value(json!({
            "author": {"accountId": "a", "key": "legacy"},
            "updateAuthor": {"accountId": "b"}
        }))
        .unwrap();
        assert_eq!(primary.author_id(), Some("a"));

        let update: RawWorkLog = serde_json::from_value(json!({
            "author": {"key": "legacy"},
            "updateAuthor": {"accountId": "b"}
        }))
        .unwrap();
        assert_eq!(update.author_id(), Some("b"));

        let legacy: RawWorkLog = serde_json::from_value(json!({
            "author": {"accountId": "", "key": "legacy"}
        }))
        .unwrap();
        assert_eq!(legacy.author_id(), Some("legacy"));

        assert_eq!(RawWorkLog::default().author_id(), None);
    }

    #[test]
    fn to_entry_reports_skip_reasons() {
        assert_eq!(
            RawWorkLog::default().to_entry(),
            Err(SkipReason::MissingAuthor)
        );

        let no_start: RawWorkLog =
            serde_json::from_value(json!({"author": {"accountId": "u1"}})).unwrap();
        assert_eq!(no_start.to_entry(), Err(SkipReason::MissingStarted));

        let bad = worklog("u1", "03/05/2024 10:00", 60);
        assert_eq!(
            bad.to_entry(),
            Err(SkipReason::InvalidStarted("03/05/2024 10:00".to_string()))
        );
        assert_eq!(
            bad.to_entry().unwrap_err().to_string(),
            "unparsable started timestamp: 03/05/2024 10:00"
        );
    }

    #[test]
    fn author_is_borrowed_from_the_record() {
        let record = worklog("u1", "2024-03-01T00:00:00.000+0000", 60);
        let author: &str = record.author_id().unwrap();
        assert_eq!(author, "u1");
        assert_eq!(SkipReason::MissingAuthor.to_string(), "missing author");
    }

    #[test]
    fn in_window_seconds_accumulate_and_outside_is_dropped() {
        let mut agg = WorkLogAggregator::new(users(&["u1", "u2"]), march());
        let tick = issue("TICK-1", Some("Fix login"));

        let counted = agg.add_issue(
            &tick,
            &[
                worklog("u1", "2024-03-10T09:00:00.000+0000", 3600),
                worklog("u1", "2024-04-02T09:00:00.000+0000", 7200),
            ],
        );

        assert_eq!(counted, 1);
        let rows = agg.finish();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_seconds, 3600);
        assert!((rows[0].sum_spent_days() - 0.13).abs() < f64::EPSILON);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let mut agg = WorkLogAggregator::new(users(&["u1"]), march());
        let tick = issue("TICK-1", None);

        agg.add_issue(
            &tick,
            &[
                worklog("u1", "2024-03-01T00:00:00.000+0000", 1),
                worklog("u1", "2024-02-29T23:59:59.999+0000", 10),
                worklog("u1", "2024-03-31T23:59:59.999+0000", 100),
                worklog("u1", "2024-04-01T00:00:00.000+0000", 1000),
            ],
        );

        let stats = agg.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.outside_window, 2);
        assert_eq!(agg.finish()[0].total_seconds, 101);
    }

    #[test]
    fn offsets_are_respected_before_window_check() {
        let mut agg = WorkLogAggregator::new(users(&["u1"]), march());
        // 2024-03-01 02:00 at +0300 is still February in UTC.
        agg.add_issue(
            &issue("TICK-1", None),
            &[worklog("u1", "2024-03-01T02:00:00.000+0300", 60)],
        );
        assert!(agg.finish().is_empty());
    }

    #[test]
    fn other_authors_and_malformed_records_are_skipped() {
        let mut agg = WorkLogAggregator::new(users(&["u1"]), march());
        let tick = issue("TICK-1", None);

        agg.add_issue(
            &tick,
            &[
                worklog("u3", "2024-03-10T09:00:00.000+0000", 60),
                worklog("u1", "not-a-date", 60),
                RawWorkLog::default(),
                worklog("u1", "2024-03-10T09:00:00.000+0000", 60),
            ],
        );

        let stats = agg.stats();
        assert_eq!(stats.considered, 4);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.other_author, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(agg.finish()[0].total_seconds, 60);
    }

    #[test]
    fn buckets_are_per_author_and_issue() {
        let mut agg = WorkLogAggregator::new(users(&["u1", "u2"]), march());
        let a = issue("TICK-2", Some("A"));
        let b = issue("TICK-1", Some("B"));

        agg.add_issue(
            &a,
            &[
                worklog("u2", "2024-03-02T09:00:00.000+0000", 1800),
                worklog("u1", "2024-03-02T10:00:00.000+0000", 3600),
                worklog("u2", "2024-03-03T09:00:00.000+0000", 1800),
            ],
        );
        agg.add_issue(&b, &[worklog("u1", "2024-03-04T09:00:00.000+0000", 28800)]);

        let rows = agg.finish();
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.author_id.as_str(), r.issue_key.as_str(), r.total_seconds))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("u1", "TICK-1", 28800),
                ("u1", "TICK-2", 3600),
                ("u2", "TICK-2", 3600),
            ]
        );
    }

    #[test]
    fn negative_time_spent_counts_as_zero() {
        let mut agg = WorkLogAggregator::new(users(&["u1"]), march());
        agg.add_issue(
            &issue("TICK-1", None),
            &[worklog("u1", "2024-03-10T09:00:00.000+0000", -50)],
        );
        assert_eq!(agg.finish()[0].total_seconds, 0);
    }

    #[test]
    fn items_use_display_names_and_placeholders() {
        let rows = vec![
            WorkLogAggregateRow {
                author_id: AccountId::new("u2").unwrap(),
                issue_key: IssueKey::new("TICK-9").unwrap(),
                summary: Some(String::new()),
                total_seconds: 8 * 3600,
            },
            WorkLogAggregateRow {
                author_id: AccountId::new("u1").unwrap(),
                issue_key: IssueKey::new("TICK-3").unwrap(),
                summary: Some("Write docs".to_string()),
                total_seconds: 3600,
            },
            WorkLogAggregateRow {
                author_id: AccountId::new("u1").unwrap(),
                issue_key: IssueKey::new("TICK-1").unwrap(),
                summary: None,
                total_seconds: 1800,
            },
        ];
        let names = HashMap::from([(AccountId::new("u1").unwrap(), "zoe".to_string())]);

        let items = into_items(rows, &names);

        let order: Vec<_> = items
            .iter()
            .map(|i| (i.display_name.as_str(), i.ticket_key.as_str()))
            .collect();
        assert_eq!(order, vec![("u2", "TICK-9"), ("zoe", "TICK-1"), ("zoe", "TICK-3")]);
        assert_eq!(items[0].work_description, "-");
        assert_eq!(items[1].work_description, "-");
        assert_eq!(items[2].work_description, "Write docs");
        assert_eq!(items[0].status_changed, "-");
        assert!((items[0].sum_spent_days - 1.0).abs() < f64::EPSILON);
        assert!((items[1].sum_spent_days - 0.06).abs() < f64::EPSILON);
    }

    #[test]
    fn display_names_sort_case_insensitively() {
        assert_eq!(human_order("alice", "Bob"), Ordering::Less);
        assert_eq!(human_order("Bob", "alice"), Ordering::Greater);
        assert_eq!(human_order("Ann", "ann"), Ordering::Less);
    }

    #[test]
    fn item_serializes_camel_case() {
        let item = WorkLogItem {
            display_name: "Ana".to_string(),
            ticket_key: "TICK-1".to_string(),
            work_description: "-".to_string(),
            status_changed: "-".to_string(),
            sum_spent_days: 0.13,
        };
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"displayName":"Ana","ticketKey":"TICK-1","workDescription":"-","statusChanged":"-","sumSpentDays":0.13}"#
        );
    }
}

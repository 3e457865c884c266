//! The three report operations: issue summary, stage breakdown and the
//! cross-ticket worklog query.

use std::collections::HashMap;

use cb_core::{
    AccountId, CurrentFieldDefaults, IssueKey, IssueRef, Segment, TieBreak, Timeline, Window,
    WorkLogAggregateRow, WorkLogAggregator, WorkLogItem, WorkLogQuery, aggregate_by_status_with,
    format_duration, into_items, stage_breakdown, total_duration_ms,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::fetch::{fetch_change_history, fetch_work_logs};
use crate::jql::worklog_query;
use crate::{Issue, IssueTracker, JiraResult};

/// Records requested per page from paginated feeds.
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// Issues fetched at once during worklog aggregation.
pub const DEFAULT_CONCURRENCY: usize = 1;
/// Maximum issues returned by the worklog issue search.
pub const DEFAULT_SEARCH_LIMIT: u32 = 1000;

/// Tuning shared by all report operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub page_size: u64,
    /// Upper bound on issues whose worklogs are in flight. Values below one
    /// are treated as one.
    pub concurrency: usize,
    pub search_limit: u32,
    pub tie_break: TieBreak,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            tie_break: TieBreak::default(),
        }
    }
}

/// One status row of an issue summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub ticket: String,
    pub status: String,
    /// Dominant assignee for the status.
    pub assignee: String,
    pub time_ms: i64,
    pub time_human: String,
}

/// Time per status for one issue, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub key: String,
    pub summary: Option<String>,
    pub current_status: Option<String>,
    pub total_time_ms: i64,
    pub rows: Vec<SummaryRow>,
}

/// One segment of the stage breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEntry {
    pub stage: String,
    /// Segment start, ISO-8601 in UTC with milliseconds.
    pub from: String,
    pub assignee: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBreakdown {
    pub ticket_id: String,
    pub summary: Option<String>,
    pub worklog: Vec<StageEntry>,
}

/// Result of a cross-ticket worklog query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkLogReport {
    /// The search used to select issues.
    pub jql: String,
    pub items: Vec<WorkLogItem>,
}

async fn load_segments<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> JiraResult<(Issue, Vec<Segment>)> {
    let issue = tracker.issue(key).await?;
    let events = fetch_change_history(tracker, key, options.page_size).await?;
    let defaults = CurrentFieldDefaults::new(issue.status.as_deref(), issue.assignee.as_deref());
    let segments = Timeline::new(issue.created, issue.end(now), events).segments(&defaults);
    tracing::debug!(issue = %key, segments = segments.len(), "segmented timeline");
    Ok((issue, segments))
}

/// Summarizes time per status for an issue. Open issues run until now.
pub async fn summarize_issue<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    options: &ReportOptions,
) -> JiraResult<IssueSummary> {
    summarize_issue_at(tracker, key, options, Utc::now()).await
}

/// Like [`summarize_issue`], with open issues ending at `now`.
pub async fn summarize_issue_at<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> JiraResult<IssueSummary> {
    let (issue, segments) = load_segments(tracker, key, options, now).await?;
    let ticket = issue.key.to_string();
    let rows = aggregate_by_status_with(&segments, options.tie_break)
        .into_iter()
        .map(|row| SummaryRow {
            ticket: ticket.clone(),
            time_human: format_duration(row.total_duration_ms),
            status: row.status,
            assignee: row.dominant_assignee,
            time_ms: row.total_duration_ms,
        })
        .collect();
    Ok(IssueSummary {
        key: ticket,
        summary: issue.summary,
        current_status: issue.status,
        total_time_ms: total_duration_ms(&segments),
        rows,
    })
}

/// Lists every status/assignee segment of an issue in time order.
pub async fn issue_stage_breakdown<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    options: &ReportOptions,
) -> JiraResult<StageBreakdown> {
    issue_stage_breakdown_at(tracker, key, options, Utc::now()).await
}

/// Like [`issue_stage_breakdown`], with open issues ending at `now`.
pub async fn issue_stage_breakdown_at<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> JiraResult<StageBreakdown> {
    let (issue, segments) = load_segments(tracker, key, options, now).await?;
    let worklog = stage_breakdown(&segments)
        .into_iter()
        .map(|row| StageEntry {
            from: row.from.to_rfc3339_opts(SecondsFormat::Millis, true),
            hours: row.hours(),
            stage: row.status,
            assignee: row.assignee,
        })
        .collect();
    Ok(StageBreakdown {
        ticket_id: issue.key.to_string(),
        summary: issue.summary,
        worklog,
    })
}

/// Sums in-window worklogs of `users` across `issues`.
///
/// Worklogs are fetched with at most `options.concurrency` issues in flight
/// and folded in issue order, so the result does not depend on the pool
/// size. The first failed fetch aborts the aggregation.
pub async fn aggregate_work_logs<T: IssueTracker + ?Sized>(
    tracker: &T,
    issues: &[IssueRef],
    users: &[AccountId],
    window: Window,
    options: &ReportOptions,
) -> JiraResult<Vec<WorkLogAggregateRow>> {
    let page_size = options.page_size;
    let mut aggregator = WorkLogAggregator::new(users.iter().cloned(), window);

    let mut fetched = std::pin::pin!(
        stream::iter(issues)
            .map(move |issue| async move {
                fetch_work_logs(tracker, &issue.key, page_size)
                    .await
                    .map(|worklogs| (issue, worklogs))
            })
            .buffered(options.concurrency.max(1))
    );
    while let Some(result) = fetched.next().await {
        let (issue, worklogs) = result?;
        aggregator.add_issue(issue, &worklogs);
    }

    let stats = aggregator.stats();
    tracing::info!(
        issues = issues.len(),
        considered = stats.considered,
        accepted = stats.accepted,
        other_author = stats.other_author,
        outside_window = stats.outside_window,
        malformed = stats.malformed,
        "aggregated worklogs"
    );
    Ok(aggregator.finish())
}

/// Resolves display names one user at a time, falling back to the id.
async fn resolve_display_names<T: IssueTracker + ?Sized>(
    tracker: &T,
    users: &[AccountId],
) -> HashMap<AccountId, String> {
    let mut names = HashMap::with_capacity(users.len());
    for user in users {
        let name = match tracker.display_name(user).await {
            Ok(Some(name)) => name,
            Ok(None) => user.to_string(),
            Err(err) => {
                tracing::warn!(account = %user, error = %err, "user lookup failed, using account id");
                user.to_string()
            }
        };
        names.insert(user.clone(), name);
    }
    names
}

/// Runs the cross-ticket worklog report.
///
/// The query is validated before any request is made.
pub async fn query_work_logs<T: IssueTracker + ?Sized>(
    tracker: &T,
    query: &WorkLogQuery,
    options: &ReportOptions,
) -> JiraResult<WorkLogReport> {
    let valid = query.validate()?;
    let names = resolve_display_names(tracker, &valid.users).await;
    let jql = worklog_query(&valid.users, &valid.window);
    let issues: Vec<IssueRef> = tracker
        .search(&jql, options.search_limit)
        .await?
        .into_iter()
        .map(IssueRef::from)
        .collect();
    tracing::debug!(%jql, issues = issues.len(), "found issues with worklogs");

    let rows = aggregate_work_logs(tracker, &issues, &valid.users, valid.window, options).await?;
    Ok(WorkLogReport {
        jql,
        items: into_items(rows, &names),
    })
}

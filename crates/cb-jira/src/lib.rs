//! Issue-tracker integration for chronoboard.
//!
//! Provides:
//! - The [`IssueTracker`] seam and its HTTP implementation, [`HttpTracker`]
//! - Paginated history and worklog fetching
//! - The report operations: issue summary, stage breakdown, the
//!   cross-ticket worklog query and the status-bucket counts

pub mod buckets;
mod client;
mod fetch;
pub mod jql;
pub mod report;
mod tracker;
mod wire;

#[cfg(test)]
mod testing;

use cb_core::ValidationError;
use thiserror::Error;

pub use buckets::{
    BucketIssue, BucketIssueList, BucketReport, bucket_issues, bucket_summary,
};
pub use client::HttpTracker;
pub use fetch::{fetch_change_history, fetch_work_logs};
pub use report::{
    IssueSummary, ReportOptions, StageBreakdown, StageEntry, SummaryRow, WorkLogReport,
    aggregate_work_logs, issue_stage_breakdown, query_work_logs, summarize_issue,
};
pub use tracker::{Issue, IssueTracker, Page, SearchHit};

/// Issue-tracker errors.
#[derive(Debug, Error)]
pub enum JiraError {
    /// Connection settings are missing or malformed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The tracker answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The request was rejected before reaching the tracker.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type JiraResult<T> = Result<T, JiraError>;

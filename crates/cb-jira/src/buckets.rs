//! Status-bucket report: unique issues that received work in a window,
//! counted as Open, UAT or Closed.

use std::collections::HashSet;

use cb_core::{
    AccountId, BucketCount, BucketTally, ProjectBuckets, StatusBucket, Window, WorkLogQuery,
};
use serde::Serialize;

use crate::jql::bucket_query;
use crate::report::ReportOptions;
use crate::{IssueTracker, JiraResult, SearchHit};

/// Authors per search, keeping each query's author list short.
pub const AUTHOR_CHUNK: usize = 20;

/// Unique issue counts per bucket, overall and per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReport {
    /// One search per author chunk.
    pub jql: Vec<String>,
    pub unique_issues: usize,
    pub buckets: Vec<BucketCount>,
    pub clients: Vec<ProjectBuckets>,
}

/// An issue listed under a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketIssue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
    /// Project key.
    pub client: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketIssueList {
    pub bucket: StatusBucket,
    pub issues: Vec<BucketIssue>,
}

/// Searches each author chunk in turn; an issue found twice is kept once.
async fn search_worked_issues<T: IssueTracker + ?Sized>(
    tracker: &T,
    users: &[AccountId],
    window: &Window,
    projects: &[String],
    limit: u32,
) -> JiraResult<(Vec<String>, Vec<SearchHit>)> {
    let mut queries = Vec::new();
    let mut hits = Vec::new();
    let mut seen = HashSet::new();
    for chunk in users.chunks(AUTHOR_CHUNK) {
        let jql = bucket_query(chunk, window, projects);
        let batch = tracker.search(&jql, limit).await?;
        tracing::debug!(%jql, issues = batch.len(), "searched author chunk");
        hits.extend(batch.into_iter().filter(|hit| seen.insert(hit.key.clone())));
        queries.push(jql);
    }
    Ok((queries, hits))
}

/// Counts unique issues with worklogs by the query's users, per bucket and
/// per project. `projects` narrows the search when non-empty.
pub async fn bucket_summary<T: IssueTracker + ?Sized>(
    tracker: &T,
    query: &WorkLogQuery,
    projects: &[String],
    options: &ReportOptions,
) -> JiraResult<BucketReport> {
    let valid = query.validate()?;
    let (jql, hits) =
        search_worked_issues(tracker, &valid.users, &valid.window, projects, options.search_limit)
            .await?;

    let mut tally = BucketTally::new();
    for hit in &hits {
        tally.add(&hit.key, hit.status.as_deref(), hit.project.as_deref());
    }
    let unique_issues = tally.unique_issues();
    let (buckets, clients) = tally.finish();
    tracing::info!(
        searches = jql.len(),
        unique_issues,
        projects = clients.len(),
        "counted status buckets"
    );
    Ok(BucketReport {
        jql,
        unique_issues,
        buckets,
        clients,
    })
}

/// Lists the unique issues of one bucket, in search order.
pub async fn bucket_issues<T: IssueTracker + ?Sized>(
    tracker: &T,
    query: &WorkLogQuery,
    projects: &[String],
    bucket: StatusBucket,
    options: &ReportOptions,
) -> JiraResult<BucketIssueList> {
    let valid = query.validate()?;
    let (_, hits) =
        search_worked_issues(tracker, &valid.users, &valid.window, projects, options.search_limit)
            .await?;

    let issues = hits
        .into_iter()
        .filter(|hit| StatusBucket::classify(hit.status.as_deref()) == bucket)
        .map(|hit| BucketIssue {
            key: hit.key.into(),
            summary: hit.summary.unwrap_or_default(),
            status: hit.status.unwrap_or_default(),
            assignee: hit.assignee.unwrap_or_default(),
            client: hit.project.unwrap_or_default(),
        })
        .collect();
    Ok(BucketIssueList { bucket, issues })
}

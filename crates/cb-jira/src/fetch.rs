//! Paginated retrieval of change histories and worklogs.

use std::future::Future;

use cb_core::{ChangeEvent, IssueKey, RawWorkLog, extract_events};

use crate::{IssueTracker, JiraError, JiraResult, Page};

/// Pages through a feed until it is exhausted.
///
/// Stops on an empty page, once the reported total has been reached, or when
/// the tracker flags the last page. Without a total, only an empty page or
/// the last-page flag ends the loop. Errors from any page propagate.
pub(crate) async fn paginate<T, F, Fut>(page_size: u64, fetch: F) -> JiraResult<Vec<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = JiraResult<Page<T>>>,
{
    paginate_up_to(page_size, usize::MAX, fetch).await
}

/// Like [`paginate`], but stops once `limit` values are collected.
pub(crate) async fn paginate_up_to<T, F, Fut>(
    page_size: u64,
    limit: usize,
    mut fetch: F,
) -> JiraResult<Vec<T>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = JiraResult<Page<T>>>,
{
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut start_at = 0;
    while all.len() < limit {
        let page = fetch(start_at).await?;
        let received = page.values.len();
        all.extend(page.values);
        let fetched = all.len() as u64;
        tracing::debug!(start_at, received, fetched, total = ?page.total, "fetched page");

        if received == 0
            || page.total.is_some_and(|total| fetched >= total)
            || page.is_last == Some(true)
        {
            break;
        }
        start_at += page_size;
    }
    all.truncate(limit);
    Ok(all)
}

/// One page of a cursor-paginated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenPage<T> {
    pub values: Vec<T>,
    pub next_page_token: Option<String>,
    pub is_last: Option<bool>,
}

/// Follows `nextPageToken` cursors, collecting at most `limit` values.
///
/// `fetch` receives the cursor to resume from, `None` for the first page.
/// Stops on an empty page, the last-page flag, or a missing or repeated
/// cursor.
pub(crate) async fn paginate_tokens<T, F, Fut>(limit: usize, mut fetch: F) -> JiraResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = JiraResult<TokenPage<T>>>,
{
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    while all.len() < limit {
        let page = fetch(token.clone()).await?;
        let received = page.values.len();
        all.extend(page.values);
        tracing::debug!(received, fetched = all.len(), is_last = ?page.is_last, "fetched cursor page");

        if received == 0 || page.is_last == Some(true) {
            break;
        }
        match page.next_page_token {
            Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
            _ => break,
        }
    }
    all.truncate(limit);
    Ok(all)
}

/// Awaits `preferred`; when the tracker rejects it with an API error, runs
/// `fallback` instead. Any other error propagates.
pub(crate) async fn with_fallback<T, P, F, Fut>(
    endpoint: &str,
    preferred: P,
    fallback: F,
) -> JiraResult<T>
where
    P: Future<Output = JiraResult<T>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = JiraResult<T>>,
{
    match preferred.await {
        Err(JiraError::Api { status, message }) => {
            tracing::warn!(endpoint, status, %message, "endpoint rejected the request, falling back");
            fallback().await
        }
        other => other,
    }
}

/// Fetches an issue's full change history as time-ordered events.
pub async fn fetch_change_history<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    page_size: u64,
) -> JiraResult<Vec<ChangeEvent>> {
    let histories = paginate(page_size, |start_at| {
        tracker.changelog_page(key, start_at, page_size.max(1))
    })
    .await?;
    let mut events = extract_events(&histories);
    events.sort_by_key(|e| e.timestamp);
    tracing::debug!(issue = %key, records = histories.len(), events = events.len(), "loaded change history");
    Ok(events)
}

/// Fetches every worklog record of an issue.
pub async fn fetch_work_logs<T: IssueTracker + ?Sized>(
    tracker: &T,
    key: &IssueKey,
    page_size: u64,
) -> JiraResult<Vec<RawWorkLog>> {
    let worklogs = paginate(page_size, |start_at| {
        tracker.worklog_page(key, start_at, page_size.max(1))
    })
    .await?;
    tracing::debug!(issue = %key, worklogs = worklogs.len(), "loaded worklogs");
    Ok(worklogs)
}

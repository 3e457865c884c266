//! JSON shapes of the tracker's REST responses.

use cb_core::{HistoryRecord, IssueKey, RawWorkLog, parse_timestamp};
use serde::{Deserialize, Serialize};

use crate::fetch::TokenPage;
use crate::{Issue, JiraError, JiraResult, Page, SearchHit};

/// Fields requested for the summary and stage reports.
pub const ISSUE_FIELDS: &str = "summary,status,assignee,created,resolutiondate";
/// Fields requested from both search endpoints.
pub const SEARCH_FIELDS: [&str; 4] = ["summary", "status", "assignee", "project"];

#[derive(Debug, Deserialize)]
pub struct IssueResponse {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<NamedValue>,
    #[serde(default)]
    pub assignee: Option<UserResponse>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub resolutiondate: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectField>,
}

#[derive(Debug, Deserialize)]
pub struct NamedValue {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectField {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(default)]
    pub display_name: Option<String>,
    /// Server-hosted deployments without display names.
    #[serde(default)]
    pub name: Option<String>,
}

impl IssueResponse {
    fn key(&self) -> JiraResult<IssueKey> {
        IssueKey::new(self.key.as_str())
            .map_err(|err| JiraError::InvalidResponse(format!("issue key: {err}")))
    }

    pub fn into_issue(self) -> JiraResult<Issue> {
        let key = self.key()?;
        let raw_created = self.fields.created.as_deref().unwrap_or_default();
        let created = parse_timestamp(raw_created).ok_or_else(|| {
            JiraError::InvalidResponse(format!("{key}: unparsable created timestamp {raw_created:?}"))
        })?;
        let resolved = self.fields.resolutiondate.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(issue = %key, resolutiondate = raw, "ignoring unparsable resolution date");
            }
            parsed
        });
        Ok(Issue {
            key,
            summary: self.fields.summary,
            status: self.fields.status.and_then(|s| s.name),
            assignee: self.fields.assignee.and_then(|a| a.display_name),
            created,
            resolved,
        })
    }

    pub fn into_hit(self) -> JiraResult<SearchHit> {
        let key = self.key()?;
        let fields = self.fields;
        Ok(SearchHit {
            key,
            summary: fields.summary,
            status: fields.status.and_then(|s| s.name),
            assignee: fields.assignee.and_then(|a| a.display_name.or(a.name)),
            project: fields.project.and_then(|p| p.key),
        })
    }
}

/// `/issue/{key}/changelog`. Older deployments send `histories`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogPage {
    #[serde(default)]
    values: Option<Vec<HistoryRecord>>,
    #[serde(default)]
    histories: Option<Vec<HistoryRecord>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    is_last: Option<bool>,
}

impl From<ChangelogPage> for Page<HistoryRecord> {
    fn from(page: ChangelogPage) -> Self {
        Self::new(
            page.values.or(page.histories).unwrap_or_default(),
            page.total,
            page.is_last,
        )
    }
}

/// `/issue/{key}/worklog`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogPage {
    #[serde(default)]
    worklogs: Option<Vec<RawWorkLog>>,
    #[serde(default)]
    values: Option<Vec<RawWorkLog>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    is_last: Option<bool>,
}

impl From<WorklogPage> for Page<RawWorkLog> {
    fn from(page: WorklogPage) -> Self {
        Self::new(
            page.worklogs.or(page.values).unwrap_or_default(),
            page.total,
            page.is_last,
        )
    }
}

/// Body for both search endpoints.
///
/// `/search/jql` pages with `nextPageToken`; the legacy `/search` with
/// `startAt`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub jql: &'a str,
    pub fields: [&'static str; 4],
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u64>,
}

impl<'a> SearchRequest<'a> {
    pub const fn cursor(jql: &'a str, max_results: u32, next_page_token: Option<&'a str>) -> Self {
        Self {
            jql,
            fields: SEARCH_FIELDS,
            max_results,
            next_page_token,
            start_at: None,
        }
    }

    pub const fn offset(jql: &'a str, max_results: u32, start_at: u64) -> Self {
        Self {
            jql,
            fields: SEARCH_FIELDS,
            max_results,
            next_page_token: None,
            start_at: Some(start_at),
        }
    }
}

/// Search results; the newer endpoint may nest issues under `results`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    issues: Option<Vec<IssueResponse>>,
    #[serde(default)]
    results: Option<Vec<SearchResponse>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: Option<bool>,
}

impl SearchResponse {
    /// The flat response, or the first nested result.
    fn flatten(self) -> Self {
        if self.issues.is_some() {
            return self;
        }
        self.results
            .and_then(|results| results.into_iter().next())
            .filter(|first| first.issues.is_some())
            .unwrap_or_default()
    }

    pub fn into_token_page(self) -> TokenPage<IssueResponse> {
        let flat = self.flatten();
        TokenPage {
            values: flat.issues.unwrap_or_default(),
            next_page_token: flat.next_page_token.filter(|t| !t.is_empty()),
            is_last: flat.is_last,
        }
    }

    pub fn into_page(self) -> Page<IssueResponse> {
        let flat = self.flatten();
        Page::new(flat.issues.unwrap_or_default(), flat.total, flat.is_last)
    }
}

/// Tracker error payload: `{"errorMessages": [...], "errors": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorPayload {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

/// Builds an API error from a non-success response body.
pub fn parse_api_error(status: u16, body: &str) -> JiraError {
    let parsed = serde_json::from_str::<ErrorPayload>(body).ok().and_then(|payload| {
        let mut messages = payload.error_messages;
        messages.extend(
            payload
                .errors
                .into_iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );
        (!messages.is_empty()).then(|| messages.join("; "))
    });
    let message = parsed.unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            "empty response body".to_string()
        } else {
            body.to_string()
        }
    });
    JiraError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn issue_response_maps_present_day_fields() {
        let response: IssueResponse = serde_json::from_value(json!({
            "key": "TICK-1",
            "fields": {
                "summary": "Fix login",
                "status": {"name": "In Progress"},
                "assignee": {"displayName": "Ana", "accountId": "u1"},
                "created": "2024-01-01T00:00:00.000+0000",
                "resolutiondate": null
            }
        }))
        .unwrap();

        let issue = response.into_issue().unwrap();
        assert_eq!(issue.key.as_str(), "TICK-1");
        assert_eq!(issue.status.as_deref(), Some("In Progress"));
        assert_eq!(issue.assignee.as_deref(), Some("Ana"));
        assert_eq!(issue.created, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(issue.resolved, None);
    }

    #[test]
    fn issue_without_created_is_invalid() {
        let response: IssueResponse =
            serde_json::from_value(json!({"key": "TICK-1", "fields": {}})).unwrap();
        assert!(matches!(
            response.into_issue(),
            Err(JiraError::InvalidResponse(_))
        ));
    }

    #[test]
    fn unparsable_resolution_means_open() {
        let response: IssueResponse = serde_json::from_value(json!({
            "key": "TICK-1",
            "fields": {"created": "2024-01-01T00:00:00.000+0000", "resolutiondate": "soon"}
        }))
        .unwrap();
        assert_eq!(response.into_issue().unwrap().resolved, None);
    }

    #[test]
    fn changelog_page_accepts_values_or_histories() {
        let modern: ChangelogPage = serde_json::from_value(json!({
            "values": [{"created": "2024-01-01T00:00:00.000+0000", "items": []}],
            "total": 1,
            "isLast": true
        }))
        .unwrap();
        let page = Page::from(modern);
        assert_eq!(page.values.len(), 1);
        assert_eq!(page.total, Some(1));
        assert_eq!(page.is_last, Some(true));

        let legacy: ChangelogPage = serde_json::from_value(json!({
            "histories": [{"items": []}, {"items": []}]
        }))
        .unwrap();
        let page = Page::from(legacy);
        assert_eq!(page.values.len(), 2);
        assert_eq!(page.total, None);
    }

    #[test]
    fn worklog_page_accepts_worklogs_or_values() {
        let page: WorklogPage = serde_json::from_value(json!({
            "worklogs": [{"timeSpentSeconds": 60}],
            "total": 1
        }))
        .unwrap();
        assert_eq!(Page::from(page).values.len(), 1);

        let page: WorklogPage =
            serde_json::from_value(json!({"values": [{}, {}]})).unwrap();
        assert_eq!(Page::from(page).values.len(), 2);
    }

    #[test]
    fn search_response_handles_both_shapes() {
        let flat: SearchResponse =
            serde_json::from_value(json!({"issues": [{"key": "A-1"}, {"key": "A-2"}]})).unwrap();
        assert_eq!(flat.into_token_page().values.len(), 2);

        let nested: SearchResponse = serde_json::from_value(json!({
            "results": [{"issues": [{"key": "A-1", "fields": {"summary": "x"}}]}]
        }))
        .unwrap();
        let issues = nested.into_token_page().values;
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues.into_iter().next().unwrap().into_hit().unwrap().summary.as_deref(),
            Some("x")
        );

        assert!(SearchResponse::default().into_token_page().values.is_empty());
    }

    #[test]
    fn search_request_bodies() {
        let first = serde_json::to_value(SearchRequest::cursor("project = A", 50, None)).unwrap();
        assert_eq!(
            first,
            json!({
                "jql": "project = A",
                "fields": ["summary", "status", "assignee", "project"],
                "maxResults": 50
            })
        );

        let next = serde_json::to_value(SearchRequest::cursor("project = A", 50, Some("tok"))).unwrap();
        assert_eq!(next["nextPageToken"], "tok");
        assert!(next.get("startAt").is_none());

        let legacy = serde_json::to_value(SearchRequest::offset("project = A", 100, 200)).unwrap();
        assert_eq!(legacy["startAt"], 200);
        assert!(legacy.get("nextPageToken").is_none());
    }

    #[test]
    fn search_response_exposes_the_next_cursor() {
        let issues: Vec<_> = (0..100).map(|i| json!({"key": format!("A-{i}")})).collect();
        let response: SearchResponse = serde_json::from_value(json!({
            "issues": issues,
            "nextPageToken": "tok",
            "isLast": false
        }))
        .unwrap();

        let page = response.into_token_page();
        assert_eq!(page.values.len(), 100);
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert_eq!(page.is_last, Some(false));

        let nested: SearchResponse = serde_json::from_value(json!({
            "results": [{"issues": [{"key": "A-1"}], "isLast": true}]
        }))
        .unwrap();
        let page = nested.into_token_page();
        assert_eq!(page.values.len(), 1);
        assert_eq!(page.is_last, Some(true));
    }

    #[test]
    fn legacy_search_response_reports_total() {
        let response: SearchResponse = serde_json::from_value(json!({
            "issues": [{"key": "A-1"}],
            "total": 7
        }))
        .unwrap();
        let page = response.into_page();
        assert_eq!(page.values.len(), 1);
        assert_eq!(page.total, Some(7));
    }

    #[test]
    fn search_hit_carries_status_and_project() {
        let response: IssueResponse = serde_json::from_value(json!({
            "key": "ABC-9",
            "fields": {
                "summary": "Export",
                "status": {"name": "In UAT"},
                "assignee": {"name": "bea"},
                "project": {"key": "ABC"}
            }
        }))
        .unwrap();

        let hit = response.into_hit().unwrap();
        assert_eq!(hit.status.as_deref(), Some("In UAT"));
        assert_eq!(hit.assignee.as_deref(), Some("bea"));
        assert_eq!(hit.project.as_deref(), Some("ABC"));
    }

    #[test]
    fn api_errors_prefer_tracker_messages() {
        let err = parse_api_error(
            400,
            r#"{"errorMessages":["The value 'X' does not exist."],"errors":{"jql":"bad"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "API error (400): The value 'X' does not exist.; jql: bad"
        );

        let err = parse_api_error(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "API error (502): <html>Bad Gateway</html>");

        let err = parse_api_error(401, "");
        assert_eq!(err.to_string(), "API error (401): empty response body");
    }
}

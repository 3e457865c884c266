//! Query strings for the cross-ticket worklog and status-bucket reports.

use cb_core::{AccountId, Window};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Finds issues with worklogs by any of `users` inside `window`.
///
/// `(worklogAuthor = u1 OR worklogAuthor = u2) AND worklogDate >= "start"
/// AND worklogDate <= "end"`.
pub fn worklog_query(users: &[AccountId], window: &Window) -> String {
    let dates = format!(
        "worklogDate >= \"{}\" AND worklogDate <= \"{}\"",
        window.start_date().format(DATE_FORMAT),
        window.end_date().format(DATE_FORMAT),
    );
    if users.is_empty() {
        return dates;
    }
    let authors = users
        .iter()
        .map(|u| format!("worklogAuthor = {}", value(u.as_str())))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({authors}) AND {dates}")
}

/// Finds issues with worklogs by any of `users` inside `window`, optionally
/// limited to `projects`.
///
/// `worklogDate >= "start" AND worklogDate <= "end" AND worklogAuthor in
/// (u1, u2) AND project in (A, B)`.
pub fn bucket_query(users: &[AccountId], window: &Window, projects: &[String]) -> String {
    let mut parts = vec![format!(
        "worklogDate >= \"{}\" AND worklogDate <= \"{}\"",
        window.start_date().format(DATE_FORMAT),
        window.end_date().format(DATE_FORMAT),
    )];
    if !users.is_empty() {
        parts.push(format!(
            "worklogAuthor in ({})",
            list(users.iter().map(AccountId::as_str))
        ));
    }
    match projects {
        [] => {}
        [project] => parts.push(format!("project = {}", value(project))),
        _ => parts.push(format!(
            "project in ({})",
            list(projects.iter().map(String::as_str))
        )),
    }
    parts.join(" AND ")
}

fn list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.map(value).collect::<Vec<_>>().join(", ")
}

/// Bare value when it is a plain token, otherwise a quoted string.
fn value(raw: &str) -> String {
    if raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        raw.to_string()
    } else {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

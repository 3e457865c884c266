//! `cb buckets`: unique issues worked on in a date range, as Open/UAT/Closed.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use cb_core::{StatusBucket, WorkLogQuery};
use cb_jira::{BucketIssueList, BucketReport, bucket_issues, bucket_summary};
use clap::Args;

use super::util::{OutputArgs, OutputFormat, block_on, render_csv, render_table};
use crate::Config;

const SUMMARY_CSV_HEADERS: [&str; 4] = ["Client", "Open", "UAT", "Closed"];
const ISSUES_CSV_HEADERS: [&str; 5] = ["Key", "Summary", "Status", "Assignee", "Client"];

#[derive(Debug, Args)]
pub struct BucketsArgs {
    /// Account id to include. Repeat or comma-separate for several users.
    #[arg(long = "user", value_name = "ACCOUNT_ID", value_delimiter = ',')]
    pub users: Vec<String>,

    /// First day of the range (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the range (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub end: Option<String>,

    /// Project key to search in. Repeat or comma-separate for several.
    #[arg(long = "project", value_name = "KEY", value_delimiter = ',')]
    pub projects: Vec<String>,

    /// List the issues of one bucket (open, uat or closed) instead of counts.
    #[arg(long, value_name = "BUCKET")]
    pub status: Option<StatusBucket>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl BucketsArgs {
    pub fn query(&self) -> WorkLogQuery {
        WorkLogQuery::new(self.users.clone(), self.start.clone(), self.end.clone())
    }
}

pub fn run<W: Write>(writer: &mut W, args: &BucketsArgs, config: &Config) -> Result<()> {
    let query = args.query();
    query.validate().context("invalid buckets request")?;

    let tracker = config
        .tracker()
        .context("failed to create issue-tracker client")?;
    let options = config.report_options();
    let format = args.output.format();

    let rendered = if let Some(bucket) = args.status {
        let list = block_on(bucket_issues(&tracker, &query, &args.projects, bucket, &options))?
            .with_context(|| format!("failed to list {bucket} issues"))?;
        match format {
            OutputFormat::Text => format_bucket_issues(&list),
            OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&list)?),
            OutputFormat::Csv => format_bucket_issues_csv(&list),
        }
    } else {
        let report = block_on(bucket_summary(&tracker, &query, &args.projects, &options))?
            .context("failed to count status buckets")?;
        match format {
            OutputFormat::Text => format_bucket_report(&report),
            OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
            OutputFormat::Csv => format_bucket_report_csv(&report),
        }
    };
    write!(writer, "{rendered}")?;
    Ok(())
}

pub fn format_bucket_report(report: &BucketReport) -> String {
    let mut output = String::new();
    writeln!(output, "Unique issues: {}", report.unique_issues).unwrap();
    writeln!(output).unwrap();

    let buckets: Vec<Vec<String>> = report
        .buckets
        .iter()
        .map(|b| vec![b.name.to_string(), b.count.to_string()])
        .collect();
    output.push_str(&render_table(&["BUCKET", "ISSUES"], &buckets));

    if report.clients.is_empty() {
        return output;
    }
    writeln!(output).unwrap();
    let clients: Vec<Vec<String>> = report
        .clients
        .iter()
        .map(|c| {
            vec![
                c.client.clone(),
                c.open.to_string(),
                c.uat.to_string(),
                c.closed.to_string(),
                c.total().to_string(),
            ]
        })
        .collect();
    output.push_str(&render_table(
        &["PROJECT", "OPEN", "UAT", "CLOSED", "TOTAL"],
        &clients,
    ));
    output
}

pub fn format_bucket_report_csv(report: &BucketReport) -> String {
    let rows: Vec<Vec<String>> = report
        .clients
        .iter()
        .map(|c| {
            vec![
                c.client.clone(),
                c.open.to_string(),
                c.uat.to_string(),
                c.closed.to_string(),
            ]
        })
        .collect();
    render_csv(&SUMMARY_CSV_HEADERS, &rows)
}

pub fn format_bucket_issues(list: &BucketIssueList) -> String {
    let mut output = String::new();
    writeln!(output, "{} issues: {}", list.bucket, list.issues.len()).unwrap();
    if list.issues.is_empty() {
        return output;
    }
    writeln!(output).unwrap();

    let rows: Vec<Vec<String>> = list
        .issues
        .iter()
        .map(|i| {
            vec![
                i.key.clone(),
                i.status.clone(),
                i.assignee.clone(),
                i.client.clone(),
                i.summary.clone(),
            ]
        })
        .collect();
    output.push_str(&render_table(
        &["KEY", "STATUS", "ASSIGNEE", "PROJECT", "SUMMARY"],
        &rows,
    ));
    output
}

pub fn format_bucket_issues_csv(list: &BucketIssueList) -> String {
    let rows: Vec<Vec<String>> = list
        .issues
        .iter()
        .map(|i| {
            vec![
                i.key.clone(),
                i.summary.clone(),
                i.status.clone(),
                i.assignee.clone(),
                i.client.clone(),
            ]
        })
        .collect();
    render_csv(&ISSUES_CSV_HEADERS, &rows)
}

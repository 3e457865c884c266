//! `cb worklog`: logged days per user and ticket inside a date range.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use cb_core::WorkLogQuery;
use cb_jira::{WorkLogReport, query_work_logs};
use clap::Args;

use super::util::{OutputArgs, OutputFormat, block_on, render_csv, render_table};
use crate::Config;

const CSV_HEADERS: [&str; 5] = [
    "Display Name",
    "Ticket Key",
    "Work Description",
    "Status Category Changed",
    "Sum of Time Spent (days)",
];

#[derive(Debug, Args)]
pub struct WorklogArgs {
    /// Account id to include. Repeat or comma-separate for several users.
    #[arg(long = "user", value_name = "ACCOUNT_ID", value_delimiter = ',')]
    pub users: Vec<String>,

    /// First day of the range (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the range (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub end: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl WorklogArgs {
    pub fn query(&self) -> WorkLogQuery {
        WorkLogQuery::new(self.users.clone(), self.start.clone(), self.end.clone())
    }
}

pub fn run<W: Write>(writer: &mut W, args: &WorklogArgs, config: &Config) -> Result<()> {
    let query = args.query();
    // Reject bad requests before touching credentials or the network.
    query.validate().context("invalid worklog request")?;

    let tracker = config
        .tracker()
        .context("failed to create issue-tracker client")?;
    let options = config.report_options();

    let report = block_on(query_work_logs(&tracker, &query, &options))?
        .context("failed to query worklogs")?;

    let rendered = match args.output.format() {
        OutputFormat::Text => format_worklog(&report),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&report)?),
        OutputFormat::Csv => format_worklog_csv(&report),
    };
    write!(writer, "{rendered}")?;
    Ok(())
}

pub fn format_worklog(report: &WorkLogReport) -> String {
    let mut output = String::new();
    writeln!(output, "JQL: {}", report.jql).unwrap();
    writeln!(output).unwrap();

    if report.items.is_empty() {
        writeln!(output, "No worklogs found in this range.").unwrap();
        return output;
    }

    let rows: Vec<Vec<String>> = report
        .items
        .iter()
        .map(|item| {
            vec![
                item.display_name.clone(),
                item.ticket_key.clone(),
                format!("{:.2}", item.sum_spent_days),
                item.work_description.clone(),
            ]
        })
        .collect();
    output.push_str(&render_table(&["USER", "TICKET", "DAYS", "DESCRIPTION"], &rows));

    let total: f64 = report.items.iter().map(|item| item.sum_spent_days).sum();
    writeln!(output).unwrap();
    writeln!(output, "Total: {total:.2} days").unwrap();
    output
}

pub fn format_worklog_csv(report: &WorkLogReport) -> String {
    let rows: Vec<Vec<String>> = report
        .items
        .iter()
        .map(|item| {
            vec![
                item.display_name.clone(),
                item.ticket_key.clone(),
                item.work_description.clone(),
                item.status_changed.clone(),
                item.sum_spent_days.to_string(),
            ]
        })
        .collect();
    render_csv(&CSV_HEADERS, &rows)
}

//! `cb summary`: time per status for one issue.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use cb_core::format_duration;
use cb_jira::{IssueSummary, summarize_issue};
use clap::Args;

use super::util::{OutputArgs, OutputFormat, block_on, parse_issue_key, render_csv, render_table};
use crate::Config;

const CSV_HEADERS: [&str; 4] = ["Ticket No", "Status of Application", "Assignee", "Time Spent"];

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Issue key (e.g. TICK-1).
    pub key: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run<W: Write>(writer: &mut W, args: &SummaryArgs, config: &Config) -> Result<()> {
    let key = parse_issue_key(&args.key)?;
    let tracker = config
        .tracker()
        .context("failed to create issue-tracker client")?;
    let options = config.report_options();

    let summary = block_on(summarize_issue(&tracker, &key, &options))?
        .with_context(|| format!("failed to summarize {key}"))?;

    let rendered = match args.output.format() {
        OutputFormat::Text => format_summary(&summary),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Csv => format_summary_csv(&summary),
    };
    write!(writer, "{rendered}")?;
    Ok(())
}

/// Formats the human-readable summary.
pub fn format_summary(summary: &IssueSummary) -> String {
    let mut output = String::new();
    match summary.summary.as_deref().filter(|s| !s.is_empty()) {
        Some(title) => writeln!(output, "{}  {title}", summary.key).unwrap(),
        None => writeln!(output, "{}", summary.key).unwrap(),
    }
    writeln!(
        output,
        "Current status: {}",
        summary.current_status.as_deref().unwrap_or("-")
    )
    .unwrap();
    writeln!(output, "Total time: {}", format_duration(summary.total_time_ms)).unwrap();
    writeln!(output).unwrap();

    if summary.rows.is_empty() {
        writeln!(output, "No time recorded for this issue.").unwrap();
        return output;
    }

    let rows: Vec<Vec<String>> = summary
        .rows
        .iter()
        .map(|row| {
            vec![
                row.status.clone(),
                row.assignee.clone(),
                row.time_human.clone(),
            ]
        })
        .collect();
    output.push_str(&render_table(&["STATUS", "ASSIGNEE", "TIME"], &rows));
    output
}

pub fn format_summary_csv(summary: &IssueSummary) -> String {
    let rows: Vec<Vec<String>> = summary
        .rows
        .iter()
        .map(|row| {
            vec![
                row.ticket.clone(),
                row.status.clone(),
                row.assignee.clone(),
                row.time_human.clone(),
            ]
        })
        .collect();
    render_csv(&CSV_HEADERS, &rows)
}

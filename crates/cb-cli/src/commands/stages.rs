//! `cb stages`: the stage-by-stage breakdown of one issue.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use cb_jira::{StageBreakdown, issue_stage_breakdown};
use clap::Args;

use super::util::{OutputArgs, OutputFormat, block_on, parse_issue_key, render_csv, render_table};
use crate::Config;

const CSV_HEADERS: [&str; 4] = ["Stage", "From", "Assignee", "Hours"];

#[derive(Debug, Args)]
pub struct StagesArgs {
    /// Issue key (e.g. TICK-1).
    pub key: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run<W: Write>(writer: &mut W, args: &StagesArgs, config: &Config) -> Result<()> {
    let key = parse_issue_key(&args.key)?;
    let tracker = config
        .tracker()
        .context("failed to create issue-tracker client")?;
    let options = config.report_options();

    let breakdown = block_on(issue_stage_breakdown(&tracker, &key, &options))?
        .with_context(|| format!("failed to load stages of {key}"))?;

    let rendered = match args.output.format() {
        OutputFormat::Text => format_stages(&breakdown),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&breakdown)?),
        OutputFormat::Csv => format_stages_csv(&breakdown),
    };
    write!(writer, "{rendered}")?;
    Ok(())
}

pub fn format_stages(breakdown: &StageBreakdown) -> String {
    let mut output = String::new();
    match breakdown.summary.as_deref().filter(|s| !s.is_empty()) {
        Some(title) => writeln!(output, "{}  {title}", breakdown.ticket_id).unwrap(),
        None => writeln!(output, "{}", breakdown.ticket_id).unwrap(),
    }
    writeln!(output).unwrap();

    if breakdown.worklog.is_empty() {
        writeln!(output, "No stages recorded for this issue.").unwrap();
        return output;
    }

    let rows: Vec<Vec<String>> = breakdown
        .worklog
        .iter()
        .map(|entry| {
            vec![
                entry.from.clone(),
                entry.stage.clone(),
                entry.assignee.clone(),
                format!("{:.2}", entry.hours),
            ]
        })
        .collect();
    output.push_str(&render_table(&["FROM", "STAGE", "ASSIGNEE", "HOURS"], &rows));
    output
}

pub fn format_stages_csv(breakdown: &StageBreakdown) -> String {
    let rows: Vec<Vec<String>> = breakdown
        .worklog
        .iter()
        .map(|entry| {
            vec![
                entry.stage.clone(),
                entry.from.clone(),
                entry.assignee.clone(),
                entry.hours.to_string(),
            ]
        })
        .collect();
    render_csv(&CSV_HEADERS, &rows)
}

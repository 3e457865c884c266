//! Shared utilities for CLI commands.

use std::borrow::Cow;
use std::fmt::Write;
use std::future::Future;

use anyhow::{Context, Result};
use cb_core::IssueKey;
use clap::Args;

/// How a command renders its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Output selection shared by every report command.
#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Output as JSON.
    #[arg(long, conflicts_with = "csv")]
    pub json: bool,

    /// Output as CSV.
    #[arg(long)]
    pub csv: bool,
}

impl OutputArgs {
    pub const fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.csv {
            OutputFormat::Csv
        } else {
            OutputFormat::Text
        }
    }
}

/// Runs a future to completion on a fresh runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    Ok(runtime.block_on(future))
}

pub fn parse_issue_key(raw: &str) -> Result<IssueKey> {
    IssueKey::new(raw.trim()).with_context(|| format!("invalid issue key {raw:?}"))
}

/// Quotes a CSV field if it contains a comma, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders header plus rows as CSV, one record per line.
pub fn render_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut output = String::new();
    let header: Vec<_> = headers.iter().map(|h| csv_field(h)).collect();
    writeln!(output, "{}", header.join(",")).unwrap();
    for row in rows {
        let fields: Vec<_> = row.iter().map(|f| csv_field(f)).collect();
        writeln!(output, "{}", fields.join(",")).unwrap();
    }
    output
}

/// Renders a left-aligned table; every column but the last is padded.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for line in std::iter::once(&header).chain(rows) {
        let last = line.len().saturating_sub(1);
        for (i, cell) in line.iter().enumerate() {
            if i == last {
                output.push_str(cell);
            } else {
                write!(output, "{cell:<width$}  ", width = widths[i]).unwrap();
            }
        }
        output.push('\n');
    }
    output
}

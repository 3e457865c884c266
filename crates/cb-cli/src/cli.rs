//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::buckets::BucketsArgs;
use crate::commands::stages::StagesArgs;
use crate::commands::summary::SummaryArgs;
use crate::commands::worklog::WorklogArgs;

/// Issue timeline and worklog reports.
///
/// Reconstructs how long tickets spent in each status, who held them, and how
/// much time a set of users logged across tickets in a date range.
#[derive(Debug, Parser)]
#[command(name = "cb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Time per status for an issue, with the dominant assignee of each.
    Summary(SummaryArgs),

    /// Every status/assignee interval of an issue in time order.
    Stages(StagesArgs),

    /// Logged days per user and ticket inside a date range.
    Worklog(WorklogArgs),

    /// Unique issues worked on in a date range, counted as Open, UAT or Closed.
    Buckets(BucketsArgs),
}

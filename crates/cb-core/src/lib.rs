//! Core engine for issue timelines and logged work-time.
//!
//! This crate contains the pure, synchronous logic for:
//! - Changelog extraction: turning raw history records into status and
//!   assignee transitions
//! - Timeline segmentation: slicing an issue's lifetime into intervals of
//!   constant status and assignee
//! - Aggregation: time per status with a dominant assignee, plus the flat
//!   stage breakdown
//! - Worklog windows: per-user, per-issue totals inside an inclusive date range
//! - Status buckets: unique issues counted as Open, UAT or Closed
//!
//! Nothing here performs I/O; fetching lives in `cb-jira`.

mod aggregate;
pub mod bucket;
pub mod changelog;
pub mod format;
mod timeline;
pub mod timestamp;
pub mod types;
pub mod worklog;

pub use aggregate::{
    StageRow, StatusAggregate, TieBreak, aggregate_by_status, aggregate_by_status_with,
    stage_breakdown, total_duration_ms,
};
pub use bucket::{BucketCount, BucketTally, ProjectBuckets, StatusBucket};
pub use changelog::{ChangeEvent, HistoryItem, HistoryRecord, TrackedField, extract_events};
pub use format::{format_duration, ms_to_hours, seconds_to_days};
pub use timeline::{
    CurrentFieldDefaults, DefaultResolution, Segment, Timeline, UNASSIGNED, UNKNOWN_STATUS,
    segment_timeline,
};
pub use timestamp::{Window, normalize_offset, parse_timestamp};
pub use types::{AccountId, IssueKey, IssueRef, ValidationError};
pub use worklog::{
    RawWorkLog, SkipReason, ValidatedQuery, WorkLogAggregateRow, WorkLogAggregator, WorkLogEntry,
    WorkLogItem, WorkLogQuery, into_items,
};

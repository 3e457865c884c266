//! Per-status aggregation and the stage-by-stage breakdown.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::ms_to_hours;
use crate::timeline::{Segment, UNASSIGNED};

/// How to choose between assignees with identical time in a status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The assignee encountered first in segment order wins.
    #[default]
    FirstSeen,
    /// The alphabetically smallest assignee wins.
    Alphabetical,
}

/// Time spent in one status and who held it longest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAggregate {
    pub status: String,
    pub total_duration_ms: i64,
    pub dominant_assignee: String,
}

/// One timeline segment flattened for display or export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRow {
    pub status: String,
    pub assignee: String,
    pub from: DateTime<Utc>,
    pub duration_ms: i64,
}

impl StageRow {
    /// Duration in hours, rounded to two decimals.
    pub fn hours(&self) -> f64 {
        ms_to_hours(self.duration_ms)
    }
}

/// Running totals for one status, in first-seen order of assignees.
#[derive(Debug, Default)]
struct StatusBucket {
    total_ms: i64,
    assignees: Vec<(String, i64)>,
}

impl StatusBucket {
    fn add(&mut self, assignee: &str, ms: i64) {
        self.total_ms += ms;
        if let Some((_, total)) = self.assignees.iter_mut().find(|(name, _)| name == assignee) {
            *total += ms;
        } else {
            self.assignees.push((assignee.to_string(), ms));
        }
    }

    fn dominant(&self, tie_break: TieBreak) -> String {
        let mut chosen: Option<&(String, i64)> = None;
        for candidate in &self.assignees {
            let better = match chosen {
                None => true,
                Some((name, ms)) => {
                    candidate.1 > *ms
                        || (candidate.1 == *ms
                            && tie_break == TieBreak::Alphabetical
                            && candidate.0 < *name)
                }
            };
            if better {
                chosen = Some(candidate);
            }
        }
        chosen.map_or_else(|| UNASSIGNED.to_string(), |(name, _)| name.clone())
    }
}

/// Groups segments by status with first-seen tie-breaking.
///
/// See [`aggregate_by_status_with`].
pub fn aggregate_by_status(segments: &[Segment]) -> Vec<StatusAggregate> {
    aggregate_by_status_with(segments, TieBreak::FirstSeen)
}

/// Groups segments by status, summing durations and picking the assignee with
/// the most time in each status.
///
/// Rows are ordered by total duration descending; equal totals keep the order
/// in which their status first appeared.
pub fn aggregate_by_status_with(segments: &[Segment], tie_break: TieBreak) -> Vec<StatusAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, StatusBucket)> = Vec::new();

    for segment in segments {
        let slot = *index.entry(segment.status.as_str()).or_insert_with(|| {
            buckets.push((segment.status.as_str(), StatusBucket::default()));
            buckets.len() - 1
        });
        buckets[slot]
            .1
            .add(&segment.assignee, segment.duration_ms().max(0));
    }

    let mut rows: Vec<StatusAggregate> = buckets
        .into_iter()
        .map(|(status, bucket)| StatusAggregate {
            status: status.to_string(),
            total_duration_ms: bucket.total_ms,
            dominant_assignee: bucket.dominant(tie_break),
        })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r.total_duration_ms));
    rows
}

/// Flattens segments into rows in ascending start order.
pub fn stage_breakdown(segments: &[Segment]) -> Vec<StageRow> {
    let mut rows: Vec<StageRow> = segments
        .iter()
        .map(|s| StageRow {
            status: s.status.clone(),
            assignee: s.assignee.clone(),
            from: s.from,
            duration_ms: s.duration_ms(),
        })
        .collect();
    rows.sort_by_key(|r| r.from);
    rows
}

/// Sum of all segment durations.
pub fn total_duration_ms(segments: &[Segment]) -> i64 {
    segments.iter().map(Segment::duration_ms).sum()
}

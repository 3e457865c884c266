//! Open/UAT/Closed bucketing of issues that received work in a window.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::types::{IssueKey, ValidationError};

/// Project label for issues whose project is unknown.
pub const UNKNOWN_PROJECT: &str = "Unknown";

/// Coarse lifecycle bucket of an issue status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusBucket {
    Open,
    #[serde(rename = "UAT")]
    Uat,
    Closed,
}

impl StatusBucket {
    pub const ALL: [Self; 3] = [Self::Open, Self::Uat, Self::Closed];

    /// Classifies a status name by substring, case-insensitively.
    ///
    /// Anything mentioning `uat` is UAT; then `done`, `closed` or `resolved`
    /// is Closed; everything else, including a missing status, is Open.
    pub fn classify(status: Option<&str>) -> Self {
        let status = status.unwrap_or_default().to_lowercase();
        if status.contains("uat") {
            Self::Uat
        } else if ["done", "closed", "resolved"]
            .iter()
            .any(|word| status.contains(word))
        {
            Self::Closed
        } else {
            Self::Open
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Uat => "UAT",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusBucket {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidBucket {
                value: s.to_string(),
            })
    }
}

/// Issue count of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub name: StatusBucket,
    pub count: usize,
}

/// Per-project issue counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectBuckets {
    /// Project key, or `Unknown`.
    pub client: String,
    pub open: usize,
    pub uat: usize,
    pub closed: usize,
}

impl ProjectBuckets {
    fn new(client: &str) -> Self {
        Self {
            client: client.to_string(),
            open: 0,
            uat: 0,
            closed: 0,
        }
    }

    fn bump(&mut self, bucket: StatusBucket) {
        match bucket {
            StatusBucket::Open => self.open += 1,
            StatusBucket::Uat => self.uat += 1,
            StatusBucket::Closed => self.closed += 1,
        }
    }

    pub const fn total(&self) -> usize {
        self.open + self.uat + self.closed
    }
}

/// Counts unique issues per bucket, overall and per project.
///
/// Projects keep first-seen order. An issue seen twice counts once, with the
/// status and project it was first seen with.
#[derive(Debug, Default)]
pub struct BucketTally {
    seen: HashSet<IssueKey>,
    totals: [usize; 3],
    projects: Vec<ProjectBuckets>,
}

impl BucketTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue. Returns `false` if it was already counted.
    pub fn add(&mut self, key: &IssueKey, status: Option<&str>, project: Option<&str>) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        let bucket = StatusBucket::classify(status);
        self.totals[bucket as usize] += 1;

        let client = project.filter(|p| !p.is_empty()).unwrap_or(UNKNOWN_PROJECT);
        let index = match self.projects.iter().position(|row| row.client == client) {
            Some(index) => index,
            None => {
                self.projects.push(ProjectBuckets::new(client));
                self.projects.len() - 1
            }
        };
        self.projects[index].bump(bucket);
        true
    }

    pub fn unique_issues(&self) -> usize {
        self.seen.len()
    }

    /// Bucket totals in Open, UAT, Closed order, plus the project rows.
    pub fn finish(self) -> (Vec<BucketCount>, Vec<ProjectBuckets>) {
        let counts = StatusBucket::ALL
            .into_iter()
            .map(|name| BucketCount {
                name,
                count: self.totals[name as usize],
            })
            .collect();
        (counts, self.projects)
    }
}

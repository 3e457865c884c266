//! Timeline segmentation.
//!
//! # Algorithm Summary
//!
//! 1. Sort change events by timestamp (pages may interleave boundary events)
//! 2. Seed status and assignee with the value in force before the first
//!    recorded transition
//! 3. Walk the events, emitting a segment whenever time advances past the
//!    cursor, then applying the event's new value
//! 4. Close the last segment at the issue's end time

use chrono::{DateTime, Utc};

use crate::changelog::{ChangeEvent, TrackedField};

/// Placeholder status when nothing better is known.
pub const UNKNOWN_STATUS: &str = "Unknown";
/// Placeholder assignee when nothing better is known.
pub const UNASSIGNED: &str = "Unassigned";

/// Decides field values the history itself does not carry.
pub trait DefaultResolution {
    /// Value in force before the first transition of `field`.
    ///
    /// `earliest_from` is the replaced value of the earliest transition that
    /// recorded one.
    fn prior_value(&self, field: TrackedField, earliest_from: Option<&str>) -> String;

    /// Value applied when a transition of `field` carries no new value.
    fn missing_value(&self, field: TrackedField) -> String;
}

/// Resolves defaults from the issue's present-day status and assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentFieldDefaults {
    pub status: Option<String>,
    pub assignee: Option<String>,
}

impl CurrentFieldDefaults {
    pub fn new(status: Option<&str>, assignee: Option<&str>) -> Self {
        Self {
            status: status.filter(|s| !s.is_empty()).map(String::from),
            assignee: assignee.filter(|s| !s.is_empty()).map(String::from),
        }
    }

    fn current(&self, field: TrackedField) -> Option<&str> {
        match field {
            TrackedField::Status => self.status.as_deref(),
            TrackedField::Assignee => self.assignee.as_deref(),
        }
    }
}

impl DefaultResolution for CurrentFieldDefaults {
    fn prior_value(&self, field: TrackedField, earliest_from: Option<&str>) -> String {
        earliest_from
            .or_else(|| self.current(field))
            .unwrap_or_else(|| placeholder(field))
            .to_string()
    }

    fn missing_value(&self, field: TrackedField) -> String {
        match field {
            TrackedField::Status => UNKNOWN_STATUS.to_string(),
            TrackedField::Assignee => self
                .assignee
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string()),
        }
    }
}

const fn placeholder(field: TrackedField) -> &'static str {
    match field {
        TrackedField::Status => UNKNOWN_STATUS,
        TrackedField::Assignee => UNASSIGNED,
    }
}

/// A half-open interval `[from, to)` with constant status and assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub status: String,
    pub assignee: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Segment {
    pub fn duration_ms(&self) -> i64 {
        (self.to - self.from).num_milliseconds()
    }
}

/// An issue's lifetime plus its status/assignee transitions in time order.
#[derive(Debug, Clone)]
pub struct Timeline {
    created: DateTime<Utc>,
    end: DateTime<Utc>,
    events: Vec<ChangeEvent>,
}

impl Timeline {
    /// Builds a timeline, sorting `events` by timestamp.
    ///
    /// The sort is stable, so events sharing a timestamp keep feed order.
    pub fn new(created: DateTime<Utc>, end: DateTime<Utc>, mut events: Vec<ChangeEvent>) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self {
            created,
            end,
            events,
        }
    }

    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Resolution time, or the instant the timeline was built for open issues.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Replaced value of the earliest transition of `field` that has one.
    pub fn earliest_prior(&self, field: TrackedField) -> Option<&str> {
        self.events
            .iter()
            .filter(|e| e.field == field)
            .find_map(|e| e.previous.as_deref().filter(|p| !p.is_empty()))
    }

    /// Slices the timeline into segments.
    ///
    /// A lifetime that ends at or before creation yields no segments. Events
    /// outside `[created, end]` are folded in order without clamping.
    pub fn segments<R: DefaultResolution + ?Sized>(&self, resolver: &R) -> Vec<Segment> {
        if self.end <= self.created {
            return Vec::new();
        }

        let outside = self
            .events
            .iter()
            .filter(|e| e.timestamp < self.created || e.timestamp > self.end)
            .count();
        if outside > 0 {
            tracing::warn!(
                outside,
                created = %self.created,
                end = %self.end,
                "change events fall outside the issue lifetime"
            );
        }

        let mut status =
            resolver.prior_value(TrackedField::Status, self.earliest_prior(TrackedField::Status));
        let mut assignee = resolver
            .prior_value(TrackedField::Assignee, self.earliest_prior(TrackedField::Assignee));
        let mut cursor = self.created;
        let mut segments = Vec::with_capacity(self.events.len() + 1);

        for event in &self.events {
            if event.timestamp > cursor {
                segments.push(Segment {
                    status: status.clone(),
                    assignee: assignee.clone(),
                    from: cursor,
                    to: event.timestamp,
                });
                cursor = event.timestamp;
            }

            let next = event
                .value
                .clone()
                .unwrap_or_else(|| resolver.missing_value(event.field));
            match event.field {
                TrackedField::Status => status = next,
                TrackedField::Assignee => assignee = next,
            }
        }

        if self.end > cursor {
            segments.push(Segment {
                status,
                assignee,
                from: cursor,
                to: self.end,
            });
        }

        segments
    }
}

/// Sorts `events` and slices `[created, end)` into segments.
pub fn segment_timeline<R: DefaultResolution + ?Sized>(
    created: DateTime<Utc>,
    end: DateTime<Utc>,
    events: &[ChangeEvent],
    resolver: &R,
) -> Vec<Segment> {
    Timeline::new(created, end, events.to_vec()).segments(resolver)
}

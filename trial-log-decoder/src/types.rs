//! Core types for the trial log decoder library
//!
//! This module defines the typed events the classifier produces from log lines,
//! the fatal error taxonomy for a trial and the recoverable warnings that are
//! attached to a trial's report instead of aborting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute timestamp type (trial start, as recorded by the experiment)
pub type Timestamp = DateTime<Utc>;

/// Result type for trial interpretation
pub type Result<T> = std::result::Result<T, TrialError>;

/// A screen position in experiment pixel units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other`; `t` is not clamped
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Outcome field of a `MouseDown` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    Hit,
    Miss,
    /// Outcome missing or not one of the known markers
    Unknown,
}

impl ShotOutcome {
    pub fn from_marker(marker: &str) -> Self {
        match marker.trim().to_ascii_uppercase().as_str() {
            "HIT" => ShotOutcome::Hit,
            "MISS" => ShotOutcome::Miss,
            _ => ShotOutcome::Unknown,
        }
    }
}

/// A typed event parsed from one log line
///
/// All times are seconds relative to the trial start once the log has been
/// normalized. Target identifiers are only unique within their active window.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TrialStart {
        time: f64,
    },
    TargetStart {
        time: f64,
        position: Point,
        id: i64,
    },
    TargetHit {
        time: f64,
        position: Point,
        id: i64,
        /// Explicit friend marker on the line
        friend: bool,
    },
    FriendHit {
        time: f64,
        position: Point,
        id: i64,
    },
    TargetTimeout {
        time: f64,
        position: Point,
        id: i64,
        /// Explicit friend marker on the line
        friend: bool,
    },
    TargetComplete {
        time: f64,
    },
    TasksComplete {
        time: f64,
    },
    AdditionStart {
        time: f64,
        operand1: i64,
        operand2: i64,
    },
    AdditionCorrect {
        time: f64,
    },
    MouseDown {
        time: f64,
        position: Point,
        outcome: ShotOutcome,
    },
    MouseMove {
        time: f64,
        position: Point,
    },
    IterationEnd {
        time: f64,
    },
    Unrecognized,
}

impl Event {
    /// Get the time of this event (None for unrecognized lines)
    pub fn time(&self) -> Option<f64> {
        match self {
            Event::TrialStart { time }
            | Event::TargetStart { time, .. }
            | Event::TargetHit { time, .. }
            | Event::FriendHit { time, .. }
            | Event::TargetTimeout { time, .. }
            | Event::TargetComplete { time }
            | Event::TasksComplete { time }
            | Event::AdditionStart { time, .. }
            | Event::AdditionCorrect { time }
            | Event::MouseDown { time, .. }
            | Event::MouseMove { time, .. }
            | Event::IterationEnd { time } => Some(*time),
            Event::Unrecognized => None,
        }
    }

    /// Keyword of the log line this event was parsed from
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TrialStart { .. } => "TrialStart",
            Event::TargetStart { .. } => "TargetStart",
            Event::TargetHit { .. } => "TargetHit",
            Event::FriendHit { .. } => "FriendHit",
            Event::TargetTimeout { .. } => "TargetTimeout",
            Event::TargetComplete { .. } => "TargetComplete",
            Event::TasksComplete { .. } => "TasksComplete",
            Event::AdditionStart { .. } => "AdditionStart",
            Event::AdditionCorrect { .. } => "AdditionCorrect",
            Event::MouseDown { .. } => "MouseDown",
            Event::MouseMove { .. } => "MouseMove",
            Event::IterationEnd { .. } => "IterationEnd",
            Event::Unrecognized => "Unrecognized",
        }
    }

    /// True for events that close a target window and reseed the tracker
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            Event::IterationEnd { .. } | Event::TargetComplete { .. }
        )
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Event::Unrecognized)
    }
}

/// A classified event together with its 1-based line number in the trial log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub line: usize,
    pub event: Event,
}

/// Fatal errors: each aborts the current trial only
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("No TrialStart event found in trial log")]
    MissingTrialStart,

    #[error("Unbalanced metric lengths (unbalanced event stream): {}", format_lengths(.lengths))]
    UnbalancedMetricLengths { lengths: Vec<(String, usize)> },

    #[error("Expected {expected} iteration records but produced {actual}")]
    IterationCountMismatch { expected: usize, actual: usize },

    #[error("Line {line}: unparsable {field} value {value:?}")]
    UnparsableNumericField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Invalid trial configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_lengths(lengths: &[(String, usize)]) -> String {
    lengths
        .iter()
        .map(|(key, len)| format!("{}={}", key, len))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Recoverable data-quality issues, attached to the trial report
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrialWarning {
    #[error("Line {line}: duplicate {event} ignored")]
    DuplicateCompletionEvent { line: usize, event: &'static str },

    #[error("Line {line}: unparsable {field} value {value:?}, defaulted to 0")]
    UnparsableNumericField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: target {target_id} has no termination event, treated as open")]
    MissingTerminationEvent { line: usize, target_id: i64 },

    #[error("Line {line}: {event} before TrialStart ignored")]
    EventBeforeTrialStart { line: usize, event: &'static str },

    #[error("Line {line}: repeated TrialStart ignored")]
    DuplicateTrialStart { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lerp_extrapolates() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.5), Point::new(5.0, 10.0));
        assert_eq!(a.lerp(b, 1.5), Point::new(15.0, 30.0));
        assert_eq!(a.lerp(b, -0.5), Point::new(-5.0, -10.0));
    }

    #[test]
    fn test_shot_outcome_markers() {
        assert_eq!(ShotOutcome::from_marker(" MISS"), ShotOutcome::Miss);
        assert_eq!(ShotOutcome::from_marker("hit"), ShotOutcome::Hit);
        assert_eq!(ShotOutcome::from_marker(""), ShotOutcome::Unknown);
    }

    #[test]
    fn test_event_accessors() {
        let event = Event::IterationEnd { time: 5.0 };
        assert_eq!(event.time(), Some(5.0));
        assert_eq!(event.kind(), "IterationEnd");
        assert!(event.is_boundary());
        assert_eq!(Event::Unrecognized.time(), None);
        assert!(!Event::Unrecognized.is_recognized());
    }

    #[test]
    fn test_unbalanced_error_display() {
        let err = TrialError::UnbalancedMetricLengths {
            lengths: vec![("addition".to_string(), 12), ("hits".to_string(), 11)],
        };
        assert_eq!(
            err.to_string(),
            "Unbalanced metric lengths (unbalanced event stream): addition=12, hits=11"
        );
    }
}

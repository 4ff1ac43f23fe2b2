//! Timestamp normalization
//!
//! The experiment writes absolute 13-digit epoch-millisecond stamps. Every such
//! token is rewritten as seconds elapsed since the trial's `TrialStart` stamp,
//! with six fractional digits. Text that has already been normalized (no
//! absolute stamps left, relative `TrialStart`) passes through unchanged.

use crate::types::{Result, Timestamp, TrialError};
use chrono::DateTime;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn trial_start_re() -> &'static Regex {
    static TRIAL_START_RE: OnceLock<Regex> = OnceLock::new();
    TRIAL_START_RE.get_or_init(|| {
        Regex::new(r"TrialStart,?\s+(\d{13})\b").expect("valid trial start regex")
    })
}

fn relative_trial_start_re() -> &'static Regex {
    static RELATIVE_START_RE: OnceLock<Regex> = OnceLock::new();
    RELATIVE_START_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*TrialStart,?\s+-?\d+(\.\d+)?\s*$")
            .expect("valid relative trial start regex")
    })
}

fn stamp_re() -> &'static Regex {
    static STAMP_RE: OnceLock<Regex> = OnceLock::new();
    STAMP_RE.get_or_init(|| Regex::new(r" (\d{13})\b").expect("valid stamp regex"))
}

/// A trial log with all absolute stamps replaced by trial-relative seconds
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLog {
    /// Absolute trial start, `None` if the input was already normalized
    pub trial_start: Option<Timestamp>,
    pub text: String,
}

impl NormalizedLog {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Convert an epoch-millisecond stamp into a timestamp
pub fn timestamp_from_millis(stamp: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(stamp)
}

/// Find the absolute `TrialStart` stamp (epoch milliseconds) in raw log text
pub fn trial_start_millis(raw: &str) -> Option<i64> {
    trial_start_re()
        .captures(raw)
        .and_then(|caps| caps[1].parse::<i64>().ok())
}

/// Replace every 13-digit millisecond stamp with seconds since `TrialStart`
///
/// # Errors
/// * `TrialError::MissingTrialStart` if the text has no `TrialStart` line,
///   absolute or already normalized.
pub fn normalize_timestamps(raw: &str) -> Result<NormalizedLog> {
    let start_ms = match trial_start_millis(raw) {
        Some(ms) => ms,
        None => {
            if !stamp_re().is_match(raw) && relative_trial_start_re().is_match(raw) {
                log::debug!("Log already normalized, leaving text unchanged");
                return Ok(NormalizedLog {
                    trial_start: None,
                    text: raw.to_string(),
                });
            }
            return Err(TrialError::MissingTrialStart);
        }
    };

    let trial_start = timestamp_from_millis(start_ms);
    log::debug!("Trial start stamp {} ({:?})", start_ms, trial_start);

    let text = stamp_re()
        .replace_all(raw, |caps: &Captures| {
            // A 13-digit run always fits in i64
            let stamp: i64 = caps[1].parse().unwrap_or(start_ms);
            format!(" {:.6}", (stamp - start_ms) as f64 / 1000.0)
        })
        .into_owned();

    Ok(NormalizedLog { trial_start, text })
}

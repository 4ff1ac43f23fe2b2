//! Per-iteration metric records
//!
//! Finalized iterations are stored column-wise, one sequence per metric key,
//! which is the shape downstream statistics consume. Every key must end up
//! with the same number of entries; anything else means the event stream was
//! unbalanced and the trial is rejected.

use crate::types::{Result, TrialError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric keys, in historical column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKey {
    Addition,
    Target,
    Complete,
    Hits,
    FriendHits,
    Shots,
    Hovers,
    Operand1,
    Operand2,
    MeanHitInterval,
}

impl MetricKey {
    pub const ALL: [MetricKey; 10] = [
        MetricKey::Addition,
        MetricKey::Target,
        MetricKey::Complete,
        MetricKey::Hits,
        MetricKey::FriendHits,
        MetricKey::Shots,
        MetricKey::Hovers,
        MetricKey::Operand1,
        MetricKey::Operand2,
        MetricKey::MeanHitInterval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKey::Addition => "addition",
            MetricKey::Target => "target",
            MetricKey::Complete => "complete",
            MetricKey::Hits => "hits",
            MetricKey::FriendHits => "friendHits",
            MetricKey::Shots => "shots",
            MetricKey::Hovers => "hovers",
            MetricKey::Operand1 => "operand1",
            MetricKey::Operand2 => "operand2",
            MetricKey::MeanHitInterval => "meanHitInterval",
        }
    }
}

/// One finalized iteration (or sub-task)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    /// Seconds from addition start to `AdditionCorrect`
    pub addition_latency: f64,
    /// Seconds from window start to the last required enemy hit
    pub target_latency: f64,
    /// Seconds from window start to `TasksComplete`
    pub completion_latency: f64,
    pub targets_hit: i64,
    pub friend_hits: i64,
    pub shots: i64,
    pub hovers: i64,
    pub operand1: i64,
    pub operand2: i64,
    /// Time from window start (or previous hit) to each hit
    pub hit_intervals: Vec<f64>,
}

impl IterationMetrics {
    /// Mean of the inter-hit intervals, 0 without hits
    pub fn mean_hit_interval(&self) -> f64 {
        if self.hit_intervals.is_empty() {
            0.0
        } else {
            self.hit_intervals.iter().sum::<f64>() / self.hit_intervals.len() as f64
        }
    }

    /// Value of one metric as a float
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Addition => self.addition_latency,
            MetricKey::Target => self.target_latency,
            MetricKey::Complete => self.completion_latency,
            MetricKey::Hits => self.targets_hit as f64,
            MetricKey::FriendHits => self.friend_hits as f64,
            MetricKey::Shots => self.shots as f64,
            MetricKey::Hovers => self.hovers as f64,
            MetricKey::Operand1 => self.operand1 as f64,
            MetricKey::Operand2 => self.operand2 as f64,
            MetricKey::MeanHitInterval => self.mean_hit_interval(),
        }
    }
}

/// Column store of finalized metrics, keyed by [`MetricKey`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricColumns {
    columns: BTreeMap<MetricKey, Vec<f64>>,
    hit_intervals: Vec<Vec<f64>>,
}

impl MetricColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single value to one key
    pub fn push(&mut self, key: MetricKey, value: f64) {
        self.columns.entry(key).or_default().push(value);
    }

    /// Append every key of a finalized record
    pub fn push_record(&mut self, record: IterationMetrics) {
        for key in MetricKey::ALL {
            self.push(key, record.get(key));
        }
        self.hit_intervals.push(record.hit_intervals);
    }

    /// Sequence recorded for `key`
    pub fn column(&self, key: MetricKey) -> &[f64] {
        self.columns.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Length of every key sequence, in key order
    pub fn lengths(&self) -> Vec<(String, usize)> {
        let mut lengths: Vec<(String, usize)> = MetricKey::ALL
            .iter()
            .map(|key| (key.name().to_string(), self.column(*key).len()))
            .collect();
        lengths.push(("hitIntervals".to_string(), self.hit_intervals.len()));
        lengths
    }

    /// Number of records, if all key sequences agree
    ///
    /// # Errors
    /// * `TrialError::UnbalancedMetricLengths` when any two keys differ
    pub fn record_count(&self) -> Result<usize> {
        let lengths = self.lengths();
        let first = lengths.first().map_or(0, |(_, len)| *len);
        if lengths.iter().any(|(_, len)| *len != first) {
            return Err(TrialError::UnbalancedMetricLengths { lengths });
        }
        Ok(first)
    }

    /// Turn the columns back into row records after the balance check
    pub fn into_records(self) -> Result<Vec<IterationMetrics>> {
        let count = self.record_count()?;
        let col = |key: MetricKey| self.column(key);

        let records = (0..count)
            .map(|i| IterationMetrics {
                addition_latency: col(MetricKey::Addition)[i],
                target_latency: col(MetricKey::Target)[i],
                completion_latency: col(MetricKey::Complete)[i],
                targets_hit: col(MetricKey::Hits)[i] as i64,
                friend_hits: col(MetricKey::FriendHits)[i] as i64,
                shots: col(MetricKey::Shots)[i] as i64,
                hovers: col(MetricKey::Hovers)[i] as i64,
                operand1: col(MetricKey::Operand1)[i] as i64,
                operand2: col(MetricKey::Operand2)[i] as i64,
                hit_intervals: self.hit_intervals[i].clone(),
            })
            .collect();
        Ok(records)
    }
}

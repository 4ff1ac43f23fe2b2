//! Trial interpretation
//!
//! The [`Interpreter`] is the entry point of the library. It normalizes a trial
//! log, classifies every line, and drives a single pass over the events that
//! accumulates per-iteration metrics. One [`IterationAccumulator`] holds the
//! running state of the current iteration and is reset at each boundary.

use crate::classifier::EventClassifier;
use crate::config::{DesignProfile, KeyingMode, NumericPolicy, TrialConfig};
use crate::metrics::{IterationMetrics, MetricColumns};
use crate::normalize::normalize_timestamps;
use crate::tracker::{Overlap, TargetTracker};
use crate::types::{Event, LogRecord, Result, ShotOutcome, Timestamp, TrialError, TrialWarning};
use std::collections::HashSet;

/// Click accuracy over a whole trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShotAccuracy {
    pub clicks: usize,
    pub misses: usize,
    pub hits: usize,
}

/// Everything produced for one trial
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    /// Absolute trial start (None if the log was already normalized)
    pub trial_start: Option<Timestamp>,
    /// One record per finalized iteration or sub-task
    pub records: Vec<IterationMetrics>,
    /// Recoverable issues found while interpreting
    pub warnings: Vec<TrialWarning>,
    pub accuracy: ShotAccuracy,
}

/// The arithmetic sub-task currently on screen
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingAddition {
    start_time: f64,
    operands: (i64, i64),
}

/// Running state of the current iteration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationAccumulator {
    window_start: f64,
    last_hit_time: f64,
    /// A `TargetStart` was seen since the last boundary
    window_open: bool,
    targets_hit: u32,
    friend_hits: u32,
    shots: u32,
    hovers: u32,
    over_friend: bool,
    pending_addition: Option<PendingAddition>,
    completed_operands: Option<(i64, i64)>,
    addition_latency: Option<f64>,
    target_latency: Option<f64>,
    completion_latency: Option<f64>,
    target_complete_seen: bool,
    hit_intervals: Vec<f64>,
}

impl IterationAccumulator {
    /// Fresh accumulator for an iteration starting at `time`
    pub fn new(time: f64) -> Self {
        Self {
            window_start: time,
            last_hit_time: time,
            ..Self::default()
        }
    }

    /// Opens the target window on the first `TargetStart`; returns true if it did
    pub fn on_target_start(&mut self, time: f64) -> bool {
        if self.window_open {
            return false;
        }
        self.window_open = true;
        self.window_start = time;
        self.last_hit_time = time;
        true
    }

    /// Counts an enemy hit; records the target latency on the `required`-th hit
    pub fn on_target_hit(&mut self, time: f64, required: u32) {
        self.hit_intervals.push(time - self.last_hit_time);
        self.last_hit_time = time;
        self.targets_hit += 1;
        if self.targets_hit == required && self.target_latency.is_none() {
            self.target_latency = Some(time - self.window_start);
        }
    }

    pub fn on_friend_hit(&mut self) {
        self.friend_hits += 1;
    }

    pub fn on_shot(&mut self) {
        self.shots += 1;
    }

    /// Edge-triggered hover counting for one cursor sample
    ///
    /// An enemy under the cursor suppresses the sample and clears the hover
    /// flag; a friend counts once per continuous dwell.
    pub fn on_cursor_sample(&mut self, overlap: Overlap) {
        if overlap.enemy {
            self.over_friend = false;
        } else if overlap.friend {
            if !self.over_friend {
                self.hovers += 1;
                self.over_friend = true;
            }
        } else {
            self.over_friend = false;
        }
    }

    /// Sets the pending addition; a later start overwrites an earlier one
    pub fn on_addition_start(&mut self, time: f64, operand1: i64, operand2: i64) {
        self.pending_addition = Some(PendingAddition {
            start_time: time,
            operands: (operand1, operand2),
        });
    }

    /// Records the addition latency; returns false for a duplicate completion
    pub fn on_addition_correct(&mut self, time: f64) -> bool {
        if self.addition_latency.is_some() {
            return false;
        }
        let start = self
            .pending_addition
            .map_or(self.window_start, |p| p.start_time);
        self.addition_latency = Some(time - start);
        self.completed_operands = self.pending_addition.map(|p| p.operands);
        true
    }

    /// Records the combined task latency; returns false for a duplicate
    pub fn on_tasks_complete(&mut self, time: f64) -> bool {
        if self.completion_latency.is_some() {
            return false;
        }
        self.completion_latency = Some(time - self.window_start);
        true
    }

    /// Closes the target task within the iteration and zeroes the counters;
    /// returns false for a duplicate
    pub fn on_target_complete(&mut self, time: f64) -> bool {
        if self.target_complete_seen {
            return false;
        }
        self.target_complete_seen = true;
        if self.target_latency.is_none() {
            self.target_latency = Some(time - self.window_start);
        }
        self.reset_counters(time);
        true
    }

    /// Zero the hit, friend-hit, shot and hover counters; latencies and the
    /// pending addition are kept
    fn reset_counters(&mut self, time: f64) {
        self.targets_hit = 0;
        self.friend_hits = 0;
        self.shots = 0;
        self.hovers = 0;
        self.over_friend = false;
        self.hit_intervals.clear();
        self.last_hit_time = time;
    }

    pub fn targets_hit(&self) -> u32 {
        self.targets_hit
    }

    pub fn hovers(&self) -> u32 {
        self.hovers
    }

    /// True once anything was recorded since the last reset
    pub fn has_activity(&self) -> bool {
        self.window_open
            || self.targets_hit > 0
            || self.friend_hits > 0
            || self.shots > 0
            || self.pending_addition.is_some()
            || self.addition_latency.is_some()
            || self.completion_latency.is_some()
    }

    /// Record for a combined iteration; unfinished latencies get the timeout sentinel
    pub fn finalize_iteration(&self, profile: &DesignProfile) -> IterationMetrics {
        let timeout = profile.timeout_sentinel;
        let na = profile.not_applicable_sentinel as i64;
        let (operand1, operand2) = self
            .completed_operands
            .or(self.pending_addition.map(|p| p.operands))
            .unwrap_or((na, na));

        IterationMetrics {
            addition_latency: self.addition_latency.unwrap_or(timeout),
            target_latency: self.target_latency.unwrap_or(timeout),
            completion_latency: self.completion_latency.unwrap_or(timeout),
            targets_hit: self.targets_hit as i64,
            friend_hits: self.friend_hits as i64,
            shots: self.shots as i64,
            hovers: self.hovers as i64,
            operand1,
            operand2,
            hit_intervals: self.hit_intervals.clone(),
        }
    }

    /// Record for a finished target sub-task ending at `time`
    fn finalize_target_task(&self, time: f64, profile: &DesignProfile) -> IterationMetrics {
        let na = profile.not_applicable_sentinel;
        IterationMetrics {
            addition_latency: na,
            target_latency: self.target_latency.unwrap_or(time - self.window_start),
            completion_latency: na,
            targets_hit: self.targets_hit as i64,
            friend_hits: self.friend_hits as i64,
            shots: self.shots as i64,
            hovers: self.hovers as i64,
            operand1: na as i64,
            operand2: na as i64,
            hit_intervals: self.hit_intervals.clone(),
        }
    }

    /// Record for a finished addition sub-task, consuming the pending addition
    fn take_addition_task(&mut self, time: f64, profile: &DesignProfile) -> Option<IterationMetrics> {
        let pending = self.pending_addition.take()?;
        let na = profile.not_applicable_sentinel;
        Some(IterationMetrics {
            addition_latency: time - pending.start_time,
            target_latency: na,
            completion_latency: na,
            targets_hit: na as i64,
            friend_hits: na as i64,
            shots: na as i64,
            hovers: na as i64,
            operand1: pending.operands.0,
            operand2: pending.operands.1,
            hit_intervals: Vec::new(),
        })
    }

    /// Start a new iteration at `time`, keeping only the pending addition
    fn reset_keep_addition(&mut self, time: f64) {
        let pending = self.pending_addition.take();
        *self = Self::new(time);
        self.pending_addition = pending;
    }
}

/// The main interpreter - entry point for turning trial logs into metrics
#[derive(Debug, Clone)]
pub struct Interpreter {
    profile: DesignProfile,
}

impl Interpreter {
    /// Create an interpreter for one trial design
    ///
    /// # Errors
    /// * `TrialError::InvalidConfig` if the profile cannot drive interpretation
    pub fn new(profile: DesignProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile })
    }

    pub fn profile(&self) -> &DesignProfile {
        &self.profile
    }

    /// Interpret one raw trial log (absolute or already normalized stamps)
    ///
    /// # Example
    /// ```
    /// use trial_log_decoder::{DesignProfile, Interpreter, TrialConfig};
    ///
    /// let log = "TrialStart, 1000000000000\n\
    ///            TargetStart, 1.0, 10, 10, 7\n\
    ///            TargetHit, 2.5, 10, 10, 7\n\
    ///            IterationEnd, 5.0\n";
    /// let profile = DesignProfile::default().with_expected_iterations(None);
    /// let interpreter = Interpreter::new(profile).unwrap();
    /// let report = interpreter.interpret(log, &TrialConfig::new(1)).unwrap();
    ///
    /// assert_eq!(report.records.len(), 1);
    /// assert_eq!(report.records[0].target_latency, 1.5);
    /// ```
    pub fn interpret(&self, raw: &str, trial: &TrialConfig) -> Result<TrialReport> {
        let normalized = normalize_timestamps(raw)?;
        let lines: Vec<&str> = normalized.lines().collect();
        let mut report = self.interpret_lines(&lines, trial)?;
        report.trial_start = normalized.trial_start;
        Ok(report)
    }

    /// Interpret already-normalized log lines
    pub fn interpret_lines<S: AsRef<str>>(&self, lines: &[S], trial: &TrialConfig) -> Result<TrialReport> {
        let (records, mut warnings) = self.classify_lines(lines)?;
        let records = Self::strip_before_trial_start(records, &mut warnings)?;

        let mut run = TrialRun::new(&self.profile, trial.enemy_target_count(), &records);
        run.run();
        let TrialRun {
            columns,
            warnings: run_warnings,
            ..
        } = run;
        warnings.extend(run_warnings);

        let records_out = columns.into_records()?;
        if let Some(expected) = self.profile.expected_iterations {
            if records_out.len() != expected {
                return Err(TrialError::IterationCountMismatch {
                    expected,
                    actual: records_out.len(),
                });
            }
        }

        log::info!(
            "Interpreted trial: {} record(s), {} warning(s)",
            records_out.len(),
            warnings.len()
        );

        Ok(TrialReport {
            trial_start: None,
            records: records_out,
            warnings,
            accuracy: shot_accuracy(&records),
        })
    }

    /// Classify every line, keeping recognized events with their line numbers
    fn classify_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<(Vec<LogRecord>, Vec<TrialWarning>)> {
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let classified = EventClassifier::classify(line.as_ref());

            for issue in classified.issues {
                match self.profile.numeric_policy {
                    NumericPolicy::Strict => {
                        return Err(TrialError::UnparsableNumericField {
                            line: line_no,
                            field: issue.field,
                            value: issue.value,
                        });
                    }
                    NumericPolicy::Lenient => {
                        log::warn!(
                            "Line {}: unparsable {} value {:?}, using 0",
                            line_no,
                            issue.field,
                            issue.value
                        );
                        warnings.push(TrialWarning::UnparsableNumericField {
                            line: line_no,
                            field: issue.field,
                            value: issue.value,
                        });
                    }
                }
            }

            if classified.event.is_recognized() {
                records.push(LogRecord {
                    line: line_no,
                    event: classified.event,
                });
            }
        }

        Ok((records, warnings))
    }

    /// Drop everything before the first `TrialStart` and repeated `TrialStart`s
    fn strip_before_trial_start(
        records: Vec<LogRecord>,
        warnings: &mut Vec<TrialWarning>,
    ) -> Result<Vec<LogRecord>> {
        let start = records
            .iter()
            .position(|r| matches!(r.event, Event::TrialStart { .. }))
            .ok_or(TrialError::MissingTrialStart)?;

        let mut kept = Vec::with_capacity(records.len() - start);
        for (idx, record) in records.into_iter().enumerate() {
            if idx < start {
                log::warn!("Line {}: {} before TrialStart", record.line, record.event.kind());
                warnings.push(TrialWarning::EventBeforeTrialStart {
                    line: record.line,
                    event: record.event.kind(),
                });
            } else if idx > start && matches!(record.event, Event::TrialStart { .. }) {
                log::warn!("Line {}: repeated TrialStart", record.line);
                warnings.push(TrialWarning::DuplicateTrialStart { line: record.line });
            } else {
                kept.push(record);
            }
        }
        Ok(kept)
    }
}

fn shot_accuracy(records: &[LogRecord]) -> ShotAccuracy {
    let mut accuracy = ShotAccuracy::default();
    for record in records {
        match record.event {
            Event::MouseDown { outcome, .. } => {
                accuracy.clicks += 1;
                if outcome == ShotOutcome::Miss {
                    accuracy.misses += 1;
                }
            }
            Event::TargetHit { .. } => accuracy.hits += 1,
            _ => {}
        }
    }
    accuracy
}

/// State of one pass over a trial's events
struct TrialRun<'a> {
    profile: &'a DesignProfile,
    required_hits: u32,
    records: &'a [LogRecord],
    tracker: TargetTracker,
    acc: IterationAccumulator,
    columns: MetricColumns,
    warnings: Vec<TrialWarning>,
    reported_open: HashSet<usize>,
}

impl<'a> TrialRun<'a> {
    fn new(profile: &'a DesignProfile, required_hits: u32, records: &'a [LogRecord]) -> Self {
        Self {
            profile,
            required_hits,
            records,
            tracker: TargetTracker::new(profile.tracked_targets, profile.target_half_extent),
            acc: IterationAccumulator::new(0.0),
            columns: MetricColumns::new(),
            warnings: Vec::new(),
            reported_open: HashSet::new(),
        }
    }

    fn run(&mut self) {
        self.reseed(0);

        let records = self.records;
        for (idx, record) in records.iter().enumerate() {
            log::trace!(
                "Line {}: {} at {:?}",
                record.line,
                record.event.kind(),
                record.event.time()
            );
            self.handle(idx, record.line, &record.event);
        }

        if self.acc.has_activity() {
            log::debug!("Dropping incomplete iteration at end of trial");
        }
    }

    fn reseed(&mut self, idx: usize) {
        for warning in self.tracker.seed(self.records, idx) {
            if let TrialWarning::MissingTerminationEvent { line, .. } = warning {
                if !self.reported_open.insert(line) {
                    continue;
                }
            }
            self.warnings.push(warning);
        }
    }

    fn duplicate(&mut self, line: usize, event: &'static str) {
        log::warn!("Line {}: duplicate {} ignored", line, event);
        self.warnings
            .push(TrialWarning::DuplicateCompletionEvent { line, event });
    }

    fn handle(&mut self, idx: usize, line: usize, event: &Event) {
        match *event {
            Event::TargetStart { time, id, .. } => {
                if self.acc.on_target_start(time) && !self.tracker.is_tracking(id) {
                    self.reseed(idx);
                }
            }
            Event::TargetHit { time, .. } => {
                self.acc.on_target_hit(time, self.required_hits);
            }
            Event::FriendHit { .. } => self.acc.on_friend_hit(),
            Event::MouseDown { .. } => self.acc.on_shot(),
            Event::MouseMove { time, position } => {
                if self.acc.targets_hit() < self.profile.hover_hit_limit {
                    let overlap = self.tracker.overlap(time, position);
                    self.acc.on_cursor_sample(overlap);
                }
            }
            Event::AdditionStart {
                time,
                operand1,
                operand2,
            } => self.acc.on_addition_start(time, operand1, operand2),
            Event::AdditionCorrect { time } => self.on_addition_correct(line, time),
            Event::TasksComplete { time } => match self.profile.keying {
                KeyingMode::PerIteration => {
                    if !self.acc.on_tasks_complete(time) {
                        self.duplicate(line, "TasksComplete");
                    }
                }
                KeyingMode::PerSubTask => {
                    log::debug!("Line {}: TasksComplete has no effect per sub-task", line);
                }
            },
            Event::TargetComplete { time } => self.on_target_complete(idx, line, time),
            Event::IterationEnd { time } => self.on_iteration_end(idx, time),
            Event::TrialStart { .. } | Event::TargetTimeout { .. } | Event::Unrecognized => {}
        }
    }

    fn on_addition_correct(&mut self, line: usize, time: f64) {
        match self.profile.keying {
            KeyingMode::PerIteration => {
                if !self.acc.on_addition_correct(time) {
                    self.duplicate(line, "AdditionCorrect");
                }
            }
            KeyingMode::PerSubTask => match self.acc.take_addition_task(time, self.profile) {
                Some(record) => self.columns.push_record(record),
                None => self.duplicate(line, "AdditionCorrect"),
            },
        }
    }

    fn on_target_complete(&mut self, idx: usize, line: usize, time: f64) {
        match self.profile.keying {
            KeyingMode::PerIteration => {
                if !self.acc.on_target_complete(time) {
                    self.duplicate(line, "TargetComplete");
                    return;
                }
            }
            KeyingMode::PerSubTask => {
                if !self.acc.window_open && self.acc.targets_hit == 0 {
                    self.duplicate(line, "TargetComplete");
                    return;
                }
                let record = self.acc.finalize_target_task(time, self.profile);
                self.columns.push_record(record);
                self.acc.reset_keep_addition(time);
            }
        }
        self.reseed(idx);
    }

    fn on_iteration_end(&mut self, idx: usize, time: f64) {
        match self.profile.keying {
            KeyingMode::PerIteration => {
                let record = self.acc.finalize_iteration(self.profile);
                log::debug!(
                    "Iteration {} finalized at {:.3}s: {} hit(s), {} hover(s)",
                    self.columns.record_count().unwrap_or(0) + 1,
                    time,
                    record.targets_hit,
                    record.hovers
                );
                self.columns.push_record(record);
                self.acc = IterationAccumulator::new(time);
            }
            KeyingMode::PerSubTask => {
                log::debug!("IterationEnd at {:.3}s resets target state", time);
                self.acc.reset_keep_addition(time);
            }
        }
        self.reseed(idx);
    }
}

//! Moving target reconstruction
//!
//! Targets move in a straight line from the position logged by `TargetStart` to
//! the position logged by their termination event (`TargetHit`, `FriendHit` or
//! `TargetTimeout`). The tracker pairs each start with its termination by
//! identifier and answers "is this point inside that target at time t" for
//! hover detection.

use crate::types::{Event, LogRecord, Point, TrialWarning};

/// Axis-aligned rectangle, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Square of half side `half_extent` around `center`
    pub fn square(center: Point, half_extent: f64) -> Self {
        Self {
            min: Point::new(center.x - half_extent, center.y - half_extent),
            max: Point::new(center.x + half_extent, center.y + half_extent),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }
}

/// Where and when a target stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetEnd {
    pub position: Point,
    pub time: f64,
}

/// One moving target during its lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: i64,
    pub start: Point,
    pub start_time: f64,
    /// `None` while no termination event was found (open target)
    pub end: Option<TargetEnd>,
    /// Enemies are meant to be shot, friends avoided
    pub enemy: bool,
    /// Line of the `TargetStart` event
    pub line: usize,
}

impl Target {
    /// Fraction of the target's lifetime elapsed at `time`; not clamped
    pub fn time_param(&self, time: f64) -> Option<f64> {
        let end = self.end?;
        Some((time - self.start_time) / (end.time - self.start_time))
    }

    /// Center of the target at `time`
    ///
    /// Closed targets are interpolated (and extrapolated outside their
    /// lifetime). An open target is only known at its start time.
    pub fn center(&self, time: f64) -> Option<Point> {
        match self.end {
            Some(end) => {
                let t = self.time_param(time)?;
                Some(self.start.lerp(end.position, t))
            }
            None if time == self.start_time => Some(self.start),
            None => None,
        }
    }

    /// Hit region at `time`
    pub fn region(&self, time: f64, half_extent: f64) -> Option<Rect> {
        self.center(time).map(|c| Rect::square(c, half_extent))
    }

    /// True if `point` is inside the hit region and the target has not ended
    pub fn contains(&self, time: f64, point: Point, half_extent: f64) -> bool {
        if let Some(end) = self.end {
            if time >= end.time {
                return false;
            }
        }
        self.region(time, half_extent)
            .is_some_and(|rect| rect.contains(point))
    }
}

/// Which kinds of target are under the cursor at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlap {
    pub enemy: bool,
    pub friend: bool,
}

/// Set of targets active in the current window
#[derive(Debug, Clone)]
pub struct TargetTracker {
    targets: Vec<Target>,
    capacity: usize,
    half_extent: f64,
}

impl TargetTracker {
    /// Create an empty tracker holding up to `capacity` targets
    pub fn new(capacity: usize, half_extent: f64) -> Self {
        Self {
            targets: Vec::with_capacity(capacity),
            capacity,
            half_extent,
        }
    }

    /// Replace the tracked targets with the first targets starting at or after
    /// `start` in `records`
    ///
    /// Scanning for starts stops at the next iteration boundary. Each start is
    /// paired with the first later termination event carrying the same id; a
    /// start with no termination is kept as an open target and reported.
    pub fn seed(&mut self, records: &[LogRecord], start: usize) -> Vec<TrialWarning> {
        self.targets.clear();
        let mut warnings = Vec::new();

        for (idx, record) in records.iter().enumerate().skip(start) {
            if self.targets.len() >= self.capacity {
                break;
            }
            if idx != start && record.event.is_boundary() {
                break;
            }
            if let Event::TargetStart { time, position, id } = record.event {
                let target = Self::build_target(records, idx, id, time, position);
                if target.end.is_none() {
                    log::warn!(
                        "Target {} starting on line {} has no termination event",
                        id,
                        record.line
                    );
                    warnings.push(TrialWarning::MissingTerminationEvent {
                        line: record.line,
                        target_id: id,
                    });
                }
                self.targets.push(target);
            }
        }

        log::debug!(
            "Tracker seeded from record {}: {} target(s)",
            start,
            self.targets.len()
        );
        warnings
    }

    /// Find the termination of the target started at `start_idx`
    fn build_target(
        records: &[LogRecord],
        start_idx: usize,
        id: i64,
        start_time: f64,
        start: Point,
    ) -> Target {
        let mut target = Target {
            id,
            start,
            start_time,
            end: None,
            enemy: true,
            line: records[start_idx].line,
        };

        for record in &records[start_idx + 1..] {
            let (time, position, friend) = match record.event {
                Event::TargetHit {
                    time,
                    position,
                    id: hit_id,
                    friend,
                } if hit_id == id => (time, position, friend),
                Event::FriendHit {
                    time,
                    position,
                    id: hit_id,
                } if hit_id == id => (time, position, true),
                Event::TargetTimeout {
                    time,
                    position,
                    id: hit_id,
                    friend,
                } if hit_id == id => (time, position, friend),
                // The id is reused by a new target: this one never terminated
                Event::TargetStart { id: start_id, .. } if start_id == id => break,
                _ => continue,
            };
            target.end = Some(TargetEnd { position, time });
            target.enemy = !friend;
            break;
        }

        target
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn is_tracking(&self, id: i64) -> bool {
        self.targets.iter().any(|t| t.id == id)
    }

    /// Test every tracked target on screen at `time` against `point`
    ///
    /// Targets that have not started yet are skipped.
    pub fn overlap(&self, time: f64, point: Point) -> Overlap {
        let mut overlap = Overlap::default();
        for target in self.targets.iter().filter(|t| time >= t.start_time) {
            if target.contains(time, point, self.half_extent) {
                if target.enemy {
                    overlap.enemy = true;
                } else {
                    overlap.friend = true;
                }
            }
        }
        overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::EventClassifier;

    fn records(lines: &[&str]) -> Vec<LogRecord> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| LogRecord {
                line: i + 1,
                event: EventClassifier::classify(line).event,
            })
            .collect()
    }

    fn moving_target() -> Target {
        Target {
            id: 1,
            start: Point::new(0.0, 0.0),
            start_time: 1.0,
            end: Some(TargetEnd {
                position: Point::new(100.0, 0.0),
                time: 2.0,
            }),
            enemy: true,
            line: 1,
        }
    }

    #[test]
    fn test_center_interpolates() {
        let target = moving_target();
        assert_eq!(target.center(1.5), Some(Point::new(50.0, 0.0)));
        assert_eq!(target.center(1.0), Some(Point::new(0.0, 0.0)));
        // Before the start the position is extrapolated backwards
        assert_eq!(target.center(0.5), Some(Point::new(-50.0, 0.0)));
    }

    #[test]
    fn test_contains_uses_square_region() {
        let target = moving_target();
        assert!(target.contains(1.5, Point::new(50.0, 0.0), 64.0));
        assert!(target.contains(1.5, Point::new(114.0, 64.0), 64.0));
        assert!(!target.contains(1.5, Point::new(114.1, 0.0), 64.0));
        assert!(!target.contains(1.5, Point::new(50.0, -64.5), 64.0));
    }

    #[test]
    fn test_contains_false_at_or_after_end() {
        let target = moving_target();
        assert!(target.contains(1.99, Point::new(99.0, 0.0), 64.0));
        assert!(!target.contains(2.0, Point::new(100.0, 0.0), 64.0));
        assert!(!target.contains(3.0, Point::new(200.0, 0.0), 64.0));
    }

    #[test]
    fn test_open_target_not_queryable_after_start() {
        let mut target = moving_target();
        target.end = None;
        assert!(target.contains(1.0, Point::new(0.0, 0.0), 64.0));
        assert!(!target.contains(0.5, Point::new(0.0, 0.0), 64.0));
        assert!(!target.contains(1.5, Point::new(0.0, 0.0), 64.0));
        assert_eq!(target.time_param(1.5), None);
    }

    #[test]
    fn test_seed_pairs_starts_with_terminations() {
        let recs = records(&[
            "TrialStart, 0.0",
            "TargetStart, 1.0, 0, 0, 1",
            "TargetStart, 1.0, 500, 0, 2",
            "TargetStart, 1.0, 900, 0, 3",
            "TargetStart, 1.0, 900, 900, 4",
            "TargetHit, 2.0, 100, 0, 1",
            "FriendHit, 2.5, 500, 100, 2",
            "TargetTimeout, 3.0, 900, 300, 3, friend",
            "IterationEnd, 5.0",
        ]);
        let mut tracker = TargetTracker::new(3, 64.0);
        let warnings = tracker.seed(&recs, 0);

        assert!(warnings.is_empty());
        let targets = tracker.targets();
        assert_eq!(targets.len(), 3);
        assert!(targets[0].enemy);
        assert!(!targets[1].enemy);
        assert!(!targets[2].enemy);
        assert_eq!(targets[1].end.unwrap().time, 2.5);
        assert!(!tracker.is_tracking(4));
    }

    #[test]
    fn test_seed_reports_open_targets() {
        let recs = records(&[
            "TrialStart, 0.0",
            "TargetStart, 1.0, 0, 0, 9",
            "MouseMove, 1.5, 0, 0",
        ]);
        let mut tracker = TargetTracker::new(3, 64.0);
        let warnings = tracker.seed(&recs, 0);

        assert_eq!(
            warnings,
            vec![TrialWarning::MissingTerminationEvent {
                line: 2,
                target_id: 9
            }]
        );
        assert!(tracker.targets()[0].end.is_none());
    }

    #[test]
    fn test_seed_stops_at_boundary_and_replaces_targets() {
        let recs = records(&[
            "TrialStart, 0.0",
            "TargetStart, 1.0, 0, 0, 1",
            "TargetHit, 2.0, 0, 0, 1",
            "IterationEnd, 5.0",
            "TargetStart, 6.0, 0, 0, 1",
            "TargetHit, 7.0, 10, 10, 1",
            "IterationEnd, 10.0",
        ]);
        let mut tracker = TargetTracker::new(3, 64.0);
        tracker.seed(&recs, 0);
        assert_eq!(tracker.targets().len(), 1);
        assert_eq!(tracker.targets()[0].start_time, 1.0);

        tracker.seed(&recs, 3);
        assert_eq!(tracker.targets().len(), 1);
        assert_eq!(tracker.targets()[0].start_time, 6.0);
        assert_eq!(tracker.targets()[0].end.unwrap().time, 7.0);
    }

    #[test]
    fn test_reused_id_does_not_borrow_later_termination() {
        let recs = records(&[
            "TargetStart, 1.0, 0, 0, 1",
            "TargetStart, 6.0, 0, 0, 1",
            "TargetHit, 7.0, 0, 0, 1",
        ]);
        let mut tracker = TargetTracker::new(1, 64.0);
        let warnings = tracker.seed(&recs, 0);
        assert_eq!(warnings.len(), 1);
        assert!(tracker.targets()[0].end.is_none());
    }

    #[test]
    fn test_overlap_reports_both_kinds() {
        let recs = records(&[
            "TargetStart, 0.0, 0, 0, 1",
            "TargetStart, 0.0, 50, 0, 2",
            "TargetHit, 10.0, 0, 0, 1",
            "FriendHit, 10.0, 50, 0, 2",
        ]);
        let mut tracker = TargetTracker::new(3, 64.0);
        tracker.seed(&recs, 0);

        let both = tracker.overlap(1.0, Point::new(25.0, 0.0));
        assert!(both.enemy && both.friend);

        let friend_only = tracker.overlap(1.0, Point::new(100.0, 0.0));
        assert!(!friend_only.enemy && friend_only.friend);

        assert_eq!(tracker.overlap(1.0, Point::new(500.0, 0.0)), Overlap::default());
    }

    #[test]
    fn test_overlap_ignores_targets_not_yet_started() {
        let recs = records(&[
            "TargetStart, 2.0, 500, 500, 2",
            "TargetTimeout, 4.0, 500, 900, 2, friend",
            "TargetStart, 3.0, 0, 0, 5",
        ]);
        let mut tracker = TargetTracker::new(3, 64.0);
        tracker.seed(&recs, 0);

        // Extrapolated back to (500, 300) at 1.0, but not on screen yet
        let early = &tracker.targets()[0];
        assert_eq!(early.center(1.0), Some(Point::new(500.0, 300.0)));
        assert_eq!(tracker.overlap(1.0, Point::new(500.0, 300.0)), Overlap::default());
        assert!(tracker.overlap(3.0, Point::new(500.0, 700.0)).friend);

        // Open target: only its start instant is known
        assert!(!tracker.overlap(2.5, Point::new(0.0, 0.0)).enemy);
        assert!(tracker.overlap(3.0, Point::new(0.0, 0.0)).enemy);
        assert!(!tracker.overlap(3.5, Point::new(0.0, 0.0)).enemy);
    }
}

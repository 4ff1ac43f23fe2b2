//! Event classification
//!
//! Maps one normalized log line to a typed [`Event`]. A line is a keyword
//! followed by comma-separated fields:
//!
//! ```text
//! TargetHit, <time>, <x>, <y>, <id>[, friend]
//! TargetStart, <time>, <x>, <y>, <id>
//! AdditionStart, <time>, <op1>, <op2>
//! MouseDown, <time>, <x>, <y>[, HIT|MISS]
//! MouseMove, <time>, <x>, <y>
//! ```
//!
//! Lines are classified independently. A numeric field that fails to parse
//! becomes zero and is reported as a [`FieldIssue`] so the caller can surface it.

use crate::types::{Event, Point, ShotOutcome};
use regex::Regex;
use std::sync::OnceLock;

fn line_re() -> &'static Regex {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINE_RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z]+)(?:\s*,\s*|\s+)?(.*?)\s*$").expect("valid event line regex")
    })
}

/// A numeric field that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub value: String,
}

/// Result of classifying one line
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    pub event: Event,
    pub issues: Vec<FieldIssue>,
}

impl ClassifiedLine {
    fn unrecognized() -> Self {
        Self {
            event: Event::Unrecognized,
            issues: Vec::new(),
        }
    }
}

/// Event classifier - turns log lines into events
pub struct EventClassifier;

impl EventClassifier {
    /// Classify a single normalized log line
    pub fn classify(line: &str) -> ClassifiedLine {
        let Some(caps) = line_re().captures(line) else {
            return ClassifiedLine::unrecognized();
        };
        let keyword = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let fields: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        let mut reader = FieldReader::new(&fields);

        // Fixed priority: hit, start, completion, addition, mouse, generic
        let event = match keyword {
            "TargetHit" => {
                let (time, position, id) = reader.target_fields();
                Event::TargetHit {
                    time,
                    position,
                    id,
                    friend: reader.friend_marker(),
                }
            }
            "FriendHit" => {
                let (time, position, id) = reader.target_fields();
                Event::FriendHit { time, position, id }
            }
            "TargetTimeout" => {
                let (time, position, id) = reader.target_fields();
                Event::TargetTimeout {
                    time,
                    position,
                    id,
                    friend: reader.friend_marker(),
                }
            }
            "TargetStart" => {
                let (time, position, id) = reader.target_fields();
                Event::TargetStart { time, position, id }
            }
            "TrialStart" => Event::TrialStart {
                time: reader.float("time"),
            },
            "TargetComplete" => Event::TargetComplete {
                time: reader.float("time"),
            },
            "TasksComplete" => Event::TasksComplete {
                time: reader.float("time"),
            },
            "AdditionStart" => Event::AdditionStart {
                time: reader.float("time"),
                operand1: reader.int("operand1"),
                operand2: reader.int("operand2"),
            },
            "AdditionCorrect" => Event::AdditionCorrect {
                time: reader.float("time"),
            },
            "MouseDown" => {
                let time = reader.float("time");
                let position = reader.point();
                let outcome = reader
                    .marker()
                    .map_or(ShotOutcome::Unknown, ShotOutcome::from_marker);
                Event::MouseDown {
                    time,
                    position,
                    outcome,
                }
            }
            "MouseMove" => Event::MouseMove {
                time: reader.float("time"),
                position: reader.point(),
            },
            "IterationEnd" => Event::IterationEnd {
                time: reader.float("time"),
            },
            _ => return ClassifiedLine::unrecognized(),
        };

        log::trace!("Classified {:?} as {}", line, event.kind());
        ClassifiedLine {
            event,
            issues: reader.issues,
        }
    }
}

/// Sequential reader over the comma-separated fields of one line
struct FieldReader<'a> {
    fields: &'a [&'a str],
    pos: usize,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a [&'a str]) -> Self {
        Self {
            fields,
            pos: 0,
            issues: Vec::new(),
        }
    }

    fn next_field(&mut self) -> &'a str {
        let field = self.fields.get(self.pos).copied().unwrap_or("");
        self.pos += 1;
        field
    }

    fn float(&mut self, name: &'static str) -> f64 {
        let raw = self.next_field();
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                self.issues.push(FieldIssue {
                    field: name,
                    value: raw.to_string(),
                });
                0.0
            }
        }
    }

    fn int(&mut self, name: &'static str) -> i64 {
        let raw = self.next_field();
        raw.parse::<i64>().unwrap_or_else(|_| {
            self.issues.push(FieldIssue {
                field: name,
                value: raw.to_string(),
            });
            0
        })
    }

    fn point(&mut self) -> Point {
        let x = self.float("x");
        let y = self.float("y");
        Point::new(x, y)
    }

    /// `<time>, <x>, <y>, <id>` shared by all target events
    fn target_fields(&mut self) -> (f64, Point, i64) {
        let time = self.float("time");
        let position = self.point();
        let id = self.int("id");
        (time, position, id)
    }

    /// Optional trailing text marker
    fn marker(&mut self) -> Option<&'a str> {
        let field = self.fields.get(self.pos).copied()?;
        self.pos += 1;
        (!field.is_empty()).then_some(field)
    }

    fn friend_marker(&mut self) -> bool {
        self.marker()
            .is_some_and(|m| m.eq_ignore_ascii_case("friend"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Event {
        EventClassifier::classify(line).event
    }

    #[test]
    fn test_target_events() {
        assert_eq!(
            classify("TargetStart, 1.0, 10, 20, 7"),
            Event::TargetStart {
                time: 1.0,
                position: Point::new(10.0, 20.0),
                id: 7
            }
        );
        assert_eq!(
            classify("TargetHit, 2.5, 11, 21, 7"),
            Event::TargetHit {
                time: 2.5,
                position: Point::new(11.0, 21.0),
                id: 7,
                friend: false
            }
        );
        assert_eq!(
            classify("TargetTimeout, 4.0, 0, 0, 3, friend"),
            Event::TargetTimeout {
                time: 4.0,
                position: Point::new(0.0, 0.0),
                id: 3,
                friend: true
            }
        );
        assert!(matches!(
            classify("FriendHit, 3.0, 5, 5, 2"),
            Event::FriendHit { id: 2, .. }
        ));
    }

    #[test]
    fn test_task_events() {
        assert_eq!(
            classify("AdditionStart, 0.5, 3, 4"),
            Event::AdditionStart {
                time: 0.5,
                operand1: 3,
                operand2: 4
            }
        );
        assert_eq!(
            classify("AdditionCorrect, 2.25"),
            Event::AdditionCorrect { time: 2.25 }
        );
        assert_eq!(
            classify("TasksComplete, 3.0, extra"),
            Event::TasksComplete { time: 3.0 }
        );
        assert_eq!(classify("TargetComplete, 3.5"), Event::TargetComplete { time: 3.5 });
        assert_eq!(classify("IterationEnd, 5.000000"), Event::IterationEnd { time: 5.0 });
        assert_eq!(classify("TrialStart, 0.000000"), Event::TrialStart { time: 0.0 });
    }

    #[test]
    fn test_mouse_events() {
        assert_eq!(
            classify("MouseDown, 1.5, 100, 200, MISS"),
            Event::MouseDown {
                time: 1.5,
                position: Point::new(100.0, 200.0),
                outcome: ShotOutcome::Miss
            }
        );
        assert_eq!(
            classify("MouseDown, 1.5, 100, 200"),
            Event::MouseDown {
                time: 1.5,
                position: Point::new(100.0, 200.0),
                outcome: ShotOutcome::Unknown
            }
        );
        assert_eq!(
            classify("MouseMove, 1.75, -3, 4"),
            Event::MouseMove {
                time: 1.75,
                position: Point::new(-3.0, 4.0)
            }
        );
    }

    #[test]
    fn test_unrecognized_lines() {
        assert_eq!(classify(""), Event::Unrecognized);
        assert_eq!(classify("start trial: {\"numTargets\": 3}"), Event::Unrecognized);
        assert_eq!(classify("KeyPress, 1.0, a"), Event::Unrecognized);
        assert_eq!(classify("12345"), Event::Unrecognized);
    }

    #[test]
    fn test_unparsable_fields_default_to_zero() {
        let classified = EventClassifier::classify("TargetHit, 2.x, 10, , seven");
        assert_eq!(
            classified.event,
            Event::TargetHit {
                time: 0.0,
                position: Point::new(10.0, 0.0),
                id: 0,
                friend: false
            }
        );
        let fields: Vec<&str> = classified.issues.iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["time", "y", "id"]);
        assert_eq!(classified.issues[0].value, "2.x");
    }

    #[test]
    fn test_missing_fields_reported() {
        let classified = EventClassifier::classify("AdditionStart, 1.0, 3");
        assert_eq!(classified.issues.len(), 1);
        assert_eq!(classified.issues[0].field, "operand2");
    }
}

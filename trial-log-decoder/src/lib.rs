//! Trial Log Decoder Library
//!
//! Turns the append-only event log of a dual-task experiment (moving-target
//! shooting plus mental addition) into per-iteration performance metrics.
//!
//! # Architecture
//!
//! Data flows one way through the library:
//! - raw log text → [`normalize_timestamps`] → trial-relative seconds
//! - normalized lines → [`EventClassifier`] → typed [`Event`]s
//! - events → [`Interpreter`] (with a [`TargetTracker`] for hover geometry)
//!   → [`IterationMetrics`] records
//!
//! The library does NOT:
//! - Discover subject/block/trial directories
//! - Read block or task descriptors from disk
//! - Write output tables
//!
//! Those live in the application layer (trial-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use trial_log_decoder::{DesignProfile, Interpreter, TrialConfig};
//!
//! let profile = DesignProfile::builtin("combined-5s").unwrap();
//! let interpreter = Interpreter::new(profile).unwrap();
//!
//! let log = std::fs::read_to_string("output/subject5/block1/trial1/data.txt").unwrap();
//! let trial = TrialConfig::new(3).with_speed(400);
//!
//! match interpreter.interpret(&log, &trial) {
//!     Ok(report) => {
//!         for record in &report.records {
//!             println!("{:?}", record);
//!         }
//!         for warning in &report.warnings {
//!             eprintln!("warning: {}", warning);
//!         }
//!     }
//!     Err(e) => eprintln!("Trial skipped: {}", e),
//! }
//! ```

// Public modules
pub mod classifier;
pub mod config;
pub mod interpreter;
pub mod metrics;
pub mod normalize;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use classifier::{ClassifiedLine, EventClassifier, FieldIssue};
pub use config::{DesignProfile, KeyingMode, NumericPolicy, TrialConfig, BUILTIN_PROFILES};
pub use interpreter::{IterationAccumulator, Interpreter, ShotAccuracy, TrialReport};
pub use metrics::{IterationMetrics, MetricColumns, MetricKey};
pub use normalize::{normalize_timestamps, NormalizedLog};
pub use tracker::{Overlap, Target, TargetTracker};
pub use types::{Event, LogRecord, Point, Result, ShotOutcome, Timestamp, TrialError, TrialWarning};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

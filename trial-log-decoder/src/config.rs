//! Interpreter configuration types
//!
//! Two kinds of configuration reach the interpreter:
//! - [`TrialConfig`]: the block descriptor written by the experiment (target
//!   count, speed, addition difficulty, practice/incentive flags). Read-only.
//! - [`DesignProfile`]: which historical trial design produced the log. Design
//!   variants differ in iteration envelope, timeout length and expected row
//!   count, so they are selected explicitly by name instead of guessed.

use crate::types::{Result, TrialError};
use serde::{Deserialize, Serialize};

/// Block/trial descriptor as written to `block.txt`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrialConfig {
    /// Number of moving targets per iteration (enemies and friends)
    pub target_number: u32,
    /// Target travel distance per iteration
    pub target_speed: i64,
    /// Operand range of the addition task
    pub addition_difficulty: Vec<i64>,
    pub target_difficulty: i64,
    pub practice: bool,
    pub incentive: bool,
}

impl TrialConfig {
    pub fn new(target_number: u32) -> Self {
        Self {
            target_number,
            ..Self::default()
        }
    }

    /// Number of enemy targets that must be hit to complete the target task
    pub fn enemy_target_count(&self) -> u32 {
        self.target_number.div_ceil(2)
    }

    pub fn with_speed(mut self, speed: i64) -> Self {
        self.target_speed = speed;
        self
    }

    pub fn with_addition_difficulty(mut self, range: Vec<i64>) -> Self {
        self.addition_difficulty = range;
        self
    }

    pub fn with_practice(mut self, practice: bool) -> Self {
        self.practice = practice;
        self
    }
}

/// How metric records are keyed in a trial design
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyingMode {
    /// One record per `IterationEnd`; addition and target tasks share it
    #[default]
    PerIteration,
    /// One record per completed sub-task (`AdditionCorrect` or
    /// `TargetComplete`), no iteration envelope
    PerSubTask,
}

/// What to do with a numeric field that fails to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Default the field to zero and record a warning
    #[default]
    Lenient,
    /// Abort the trial
    Strict,
}

/// Names of the built-in design profiles
pub const BUILTIN_PROFILES: &[&str] = &["combined-5s", "combined-6s", "sub-task"];

/// A versioned trial-design profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignProfile {
    pub name: String,
    pub keying: KeyingMode,
    /// Latency written for a task that did not finish before `IterationEnd`
    pub timeout_sentinel: f64,
    /// Value written for fields that do not apply to a sub-task record
    pub not_applicable_sentinel: f64,
    /// Number of records a complete trial must produce, if fixed
    pub expected_iterations: Option<usize>,
    /// Hover is only sampled while fewer targets than this have been hit
    pub hover_hit_limit: u32,
    /// Half side length of a target's square hit region
    pub target_half_extent: f64,
    /// Maximum number of concurrently tracked targets
    pub tracked_targets: usize,
    pub numeric_policy: NumericPolicy,
}

impl Default for DesignProfile {
    fn default() -> Self {
        Self::combined(5.0)
    }
}

impl DesignProfile {
    /// Twelve 5 s (or 6 s) iterations with simultaneous addition and target tasks
    fn combined(timeout: f64) -> Self {
        Self {
            name: format!("combined-{}s", timeout),
            keying: KeyingMode::PerIteration,
            timeout_sentinel: timeout,
            not_applicable_sentinel: -1.0,
            expected_iterations: Some(12),
            hover_hit_limit: 2,
            target_half_extent: 64.0,
            tracked_targets: 3,
            numeric_policy: NumericPolicy::Lenient,
        }
    }

    /// Independent sub-tasks logged without an iteration envelope
    fn sub_task() -> Self {
        Self {
            name: "sub-task".to_string(),
            keying: KeyingMode::PerSubTask,
            timeout_sentinel: 6.0,
            expected_iterations: None,
            ..Self::combined(6.0)
        }
    }

    /// Look up a built-in profile by name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "combined-5s" => Some(Self::combined(5.0)),
            "combined-6s" => Some(Self::combined(6.0)),
            "sub-task" => Some(Self::sub_task()),
            _ => None,
        }
    }

    /// Builder method: set the timeout sentinel
    pub fn with_timeout_sentinel(mut self, seconds: f64) -> Self {
        self.timeout_sentinel = seconds;
        self
    }

    /// Builder method: set (or clear) the expected record count
    pub fn with_expected_iterations(mut self, expected: Option<usize>) -> Self {
        self.expected_iterations = expected;
        self
    }

    /// Builder method: set the keying mode
    pub fn with_keying(mut self, keying: KeyingMode) -> Self {
        self.keying = keying;
        self
    }

    /// Builder method: set the numeric parse policy
    pub fn with_numeric_policy(mut self, policy: NumericPolicy) -> Self {
        self.numeric_policy = policy;
        self
    }

    /// Builder method: set the hit count at which hover sampling stops
    pub fn with_hover_hit_limit(mut self, limit: u32) -> Self {
        self.hover_hit_limit = limit;
        self
    }

    /// Reject profiles that cannot drive the interpreter
    pub fn validate(&self) -> Result<()> {
        if !self.timeout_sentinel.is_finite() {
            return Err(TrialError::InvalidConfig(format!(
                "timeout_sentinel must be finite, got {}",
                self.timeout_sentinel
            )));
        }
        if !(self.target_half_extent > 0.0) {
            return Err(TrialError::InvalidConfig(format!(
                "target_half_extent must be positive, got {}",
                self.target_half_extent
            )));
        }
        if self.tracked_targets == 0 {
            return Err(TrialError::InvalidConfig(
                "tracked_targets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_target_count_rounds_up() {
        assert_eq!(TrialConfig::new(1).enemy_target_count(), 1);
        assert_eq!(TrialConfig::new(2).enemy_target_count(), 1);
        assert_eq!(TrialConfig::new(3).enemy_target_count(), 2);
        assert_eq!(TrialConfig::new(6).enemy_target_count(), 3);
        assert_eq!(TrialConfig::new(0).enemy_target_count(), 0);
        assert_eq!(TrialConfig::new(u32::MAX).enemy_target_count(), u32::MAX / 2 + 1);
    }

    #[test]
    fn test_builtin_profiles() {
        for name in BUILTIN_PROFILES {
            let profile = DesignProfile::builtin(name).unwrap();
            assert_eq!(profile.name, *name);
            assert!(profile.validate().is_ok());
        }
        assert_eq!(DesignProfile::builtin("combined-6s").unwrap().timeout_sentinel, 6.0);
        assert_eq!(
            DesignProfile::builtin("sub-task").unwrap().keying,
            KeyingMode::PerSubTask
        );
        assert!(DesignProfile::builtin("unknown").is_none());
    }

    #[test]
    fn test_profile_builder() {
        let profile = DesignProfile::default()
            .with_timeout_sentinel(6.0)
            .with_expected_iterations(None)
            .with_numeric_policy(NumericPolicy::Strict)
            .with_hover_hit_limit(3);

        assert_eq!(profile.timeout_sentinel, 6.0);
        assert_eq!(profile.expected_iterations, None);
        assert_eq!(profile.numeric_policy, NumericPolicy::Strict);
        assert_eq!(profile.hover_hit_limit, 3);
    }

    #[test]
    fn test_invalid_profile() {
        let mut profile = DesignProfile::default();
        profile.tracked_targets = 0;
        assert!(profile.validate().is_err());

        let profile = DesignProfile::default().with_timeout_sentinel(f64::NAN);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_trial_config_from_block_descriptor() {
        let json = r#"{"TargetNumber": 3, "TargetSpeed": 400, "AdditionDifficulty": [1, 5],
                       "TargetDifficulty": 2, "Practice": false}"#;
        let config: TrialConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.target_number, 3);
        assert_eq!(config.target_speed, 400);
        assert_eq!(config.addition_difficulty, vec![1, 5]);
        assert!(!config.incentive);
        assert_eq!(config.enemy_target_count(), 2);
    }
}

//! Subject/block/trial directory discovery
//!
//! Layout: `<root>/subject<N>/block*/trial*/data.txt`, with the block
//! descriptor in `block*/block.txt` and a per-trial fallback in
//! `trial*/task.txt`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use trial_log_decoder::TrialConfig;

const TASK_PREFIX: &str = "start trial: ";

/// One trial to interpret
#[derive(Debug, Clone)]
pub struct TrialJob {
    pub block: String,
    pub trial: String,
    pub dir: PathBuf,
    pub config: TrialConfig,
}

impl TrialJob {
    pub fn data_path(&self) -> PathBuf {
        self.dir.join("data.txt")
    }

    pub fn read_log(&self) -> Result<String> {
        let path = self.data_path();
        fs::read_to_string(&path).with_context(|| format!("Failed to read trial log: {:?}", path))
    }
}

/// Trial descriptor as written to `task.txt`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDescriptor {
    num_targets: u32,
    #[serde(default)]
    target_dist: i64,
    #[serde(default)]
    op_range: Vec<i64>,
}

impl From<TaskDescriptor> for TrialConfig {
    fn from(task: TaskDescriptor) -> Self {
        TrialConfig::new(task.num_targets)
            .with_speed(task.target_dist)
            .with_addition_difficulty(task.op_range)
            .with_practice(true)
    }
}

pub fn subject_dir(root: &Path, subject: u32) -> PathBuf {
    root.join(format!("subject{}", subject))
}

pub fn blocks_in_dir(dir: &Path) -> Result<Vec<String>> {
    dirs_with_prefix(dir, "block")
}

pub fn trials_in_dir(dir: &Path) -> Result<Vec<String>> {
    dirs_with_prefix(dir, "trial")
}

/// Subdirectory names starting with `prefix`, ordered by their numeric suffix
fn dirs_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read directory entry in {:?}", dir))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            names.push(name);
        }
    }

    names.sort_by(|a, b| {
        let key = |name: &str| name[prefix.len()..].parse::<u64>().ok();
        key(a).cmp(&key(b)).then_with(|| a.cmp(b))
    });
    Ok(names)
}

/// Parse `block.txt`; `Ok(None)` when the block has none
pub fn load_block_config(block_dir: &Path) -> Result<Option<TrialConfig>> {
    let path = block_dir.join("block.txt");
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read block descriptor: {:?}", path))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse block descriptor: {:?}", path))?;
    Ok(Some(config))
}

/// Parse `task.txt` (`start trial: {json}`); `Ok(None)` when the trial has none
pub fn load_task_config(trial_dir: &Path) -> Result<Option<TrialConfig>> {
    let path = trial_dir.join("task.txt");
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read task descriptor: {:?}", path))?;
    let json = content
        .trim_start()
        .strip_prefix(TASK_PREFIX)
        .ok_or_else(|| anyhow!("Task descriptor {:?} does not start with {:?}", path, TASK_PREFIX))?;
    let task: TaskDescriptor = serde_json::from_str(json.trim())
        .with_context(|| format!("Failed to parse task descriptor: {:?}", path))?;
    Ok(Some(task.into()))
}

/// Which part of a subject's tree to visit
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub block: Option<String>,
    pub trial: Option<u32>,
}

/// Collect the trials of one subject in block then trial order.
///
/// Trials without any descriptor are skipped with a warning, as are blocks
/// whose descriptor cannot be parsed or whose directory cannot be listed.
pub fn discover(root: &Path, subject: u32, selection: &Selection) -> Result<Vec<TrialJob>> {
    let subject_dir = subject_dir(root, subject);
    let blocks = match &selection.block {
        Some(block) => vec![block.clone()],
        None => blocks_in_dir(&subject_dir)?,
    };

    let mut jobs = Vec::new();
    for block in blocks {
        let block_dir = subject_dir.join(&block);
        let block_config = match load_block_config(&block_dir) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Skipping {}: {:#}", block, e);
                continue;
            }
        };

        let trials = match selection.trial {
            Some(trial) => vec![format!("trial{}", trial)],
            None => match trials_in_dir(&block_dir) {
                Ok(trials) => trials,
                Err(e) => {
                    log::warn!("Skipping {}: {:#}", block, e);
                    continue;
                }
            },
        };

        for trial in trials {
            let dir = block_dir.join(&trial);
            let config = match &block_config {
                Some(config) => config.clone(),
                None => match load_task_config(&dir) {
                    Ok(Some(config)) => {
                        log::debug!("{}/{}: using task descriptor", block, trial);
                        config
                    }
                    Ok(None) => {
                        log::warn!("Skipping {}/{}: no block or task descriptor", block, trial);
                        continue;
                    }
                    Err(e) => {
                        log::warn!("Skipping {}/{}: {:#}", block, trial, e);
                        continue;
                    }
                },
            };
            jobs.push(TrialJob {
                block: block.clone(),
                trial,
                dir,
                config,
            });
        }
    }

    log::info!("Discovered {} trials for subject {}", jobs.len(), subject);
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLOCK_JSON: &str = r#"{"TargetNumber":3,"TargetSpeed":400,"AdditionDifficulty":[1,5],"TargetDifficulty":2,"Practice":false}"#;

    fn make_trial(root: &Path, block: &str, trial: &str) -> PathBuf {
        let dir = root.join("subject5").join(block).join(trial);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("data.txt"), "TrialStart, 1500000000000\n").unwrap();
        dir
    }

    #[test]
    fn test_numeric_ordering() {
        let root = TempDir::new().unwrap();
        for block in ["block10", "block2", "block1"] {
            fs::create_dir_all(root.path().join(block)).unwrap();
        }
        fs::write(root.path().join("blocknotes.txt"), "").unwrap();

        let blocks = blocks_in_dir(root.path()).unwrap();
        assert_eq!(blocks, vec!["block1", "block2", "block10"]);
    }

    #[test]
    fn test_discover_with_block_descriptor() {
        let root = TempDir::new().unwrap();
        make_trial(root.path(), "block1", "trial2");
        make_trial(root.path(), "block1", "trial1");
        fs::write(root.path().join("subject5/block1/block.txt"), BLOCK_JSON).unwrap();

        let jobs = discover(root.path(), 5, &Selection::default()).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].trial, "trial1");
        assert_eq!(jobs[1].trial, "trial2");
        assert_eq!(jobs[0].config.target_number, 3);
        assert_eq!(jobs[0].config.addition_difficulty, vec![1, 5]);
        assert!(!jobs[0].config.practice);
        assert!(jobs[0].read_log().unwrap().starts_with("TrialStart"));
    }

    #[test]
    fn test_task_descriptor_fallback_marks_practice() {
        let root = TempDir::new().unwrap();
        let dir = make_trial(root.path(), "block0", "trial1");
        fs::write(
            dir.join("task.txt"),
            r#"start trial: {"numTargets":4,"targetDist":300,"opRange":[2,9]}"#,
        )
        .unwrap();

        let jobs = discover(root.path(), 5, &Selection::default()).unwrap();
        assert_eq!(jobs.len(), 1);
        let config = &jobs[0].config;
        assert!(config.practice);
        assert_eq!(config.target_number, 4);
        assert_eq!(config.target_speed, 300);
        assert_eq!(config.enemy_target_count(), 2);
    }

    #[test]
    fn test_trial_without_descriptor_is_skipped() {
        let root = TempDir::new().unwrap();
        make_trial(root.path(), "block1", "trial1");

        let jobs = discover(root.path(), 5, &Selection::default()).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_selection_filters() {
        let root = TempDir::new().unwrap();
        for block in ["block1", "block2"] {
            for trial in ["trial1", "trial2"] {
                make_trial(root.path(), block, trial);
            }
            fs::write(root.path().join("subject5").join(block).join("block.txt"), BLOCK_JSON).unwrap();
        }

        let selection = Selection {
            block: Some("block2".to_string()),
            trial: Some(1),
        };
        let jobs = discover(root.path(), 5, &selection).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].block, "block2");
        assert_eq!(jobs[0].trial, "trial1");
    }

    #[test]
    fn test_unreadable_block_does_not_abort_discovery() {
        let root = TempDir::new().unwrap();
        make_trial(root.path(), "block2", "trial1");
        fs::write(root.path().join("subject5/block2/block.txt"), BLOCK_JSON).unwrap();
        fs::create_dir_all(root.path().join("subject5/block1")).unwrap();
        fs::write(root.path().join("subject5/block1/block.txt"), "not json").unwrap();

        // A named block that does not exist cannot be listed
        let selection = Selection {
            block: Some("block9".to_string()),
            trial: None,
        };
        assert!(discover(root.path(), 5, &selection).unwrap().is_empty());

        let jobs = discover(root.path(), 5, &Selection::default()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].block, "block2");
    }

    #[test]
    fn test_malformed_task_descriptor() {
        let root = TempDir::new().unwrap();
        let dir = make_trial(root.path(), "block1", "trial1");
        fs::write(dir.join("task.txt"), "{}").unwrap();
        assert!(load_task_config(&dir).is_err());
    }

    #[test]
    fn test_missing_subject_directory() {
        let root = TempDir::new().unwrap();
        assert!(discover(root.path(), 9, &Selection::default()).is_err());
    }
}

//! Standalone trial log interpreter
//!
//! Interprets a single `data.txt` trial log and prints one line per record.
//!
//! Usage:
//!   interpret_log <data.txt> [--targets <count>] [--profile <name>]
//!
//! Example:
//!   interpret_log output/subject5/block1/trial1/data.txt --targets 3 --profile combined-6s

use std::env;
use std::path::PathBuf;
use trial_log_decoder::{DesignProfile, Interpreter, TrialConfig, BUILTIN_PROFILES};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <data.txt> [--targets <count>] [--profile <name>]", args[0]);
        eprintln!("Profiles: {}", BUILTIN_PROFILES.join(", "));
        std::process::exit(1);
    }

    let log_path = PathBuf::from(&args[1]);
    let mut targets = 1u32;
    let mut profile_name = "combined-5s".to_string();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--targets" if i + 1 < args.len() => {
                targets = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Invalid target count: {}", args[i + 1]);
                    std::process::exit(1);
                });
                i += 2;
            }
            "--profile" if i + 1 < args.len() => {
                profile_name = args[i + 1].clone();
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    let Some(profile) = DesignProfile::builtin(&profile_name) else {
        eprintln!("Unknown profile: {}", profile_name);
        std::process::exit(1);
    };

    let contents = match std::fs::read_to_string(&log_path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", log_path, e);
            std::process::exit(1);
        }
    };

    let interpreter = match Interpreter::new(profile) {
        Ok(interpreter) => interpreter,
        Err(e) => {
            eprintln!("Invalid profile: {}", e);
            std::process::exit(1);
        }
    };

    match interpreter.interpret(&contents, &TrialConfig::new(targets)) {
        Ok(report) => {
            println!("=== {:?} ===", log_path);
            if let Some(start) = report.trial_start {
                println!("Trial start: {}", start);
            }
            println!("iteration, addition, target, complete, hits, friendHits, shots, hovers");
            for (index, record) in report.records.iter().enumerate() {
                println!(
                    "{}, {:.6}, {:.6}, {:.6}, {}, {}, {}, {}",
                    index + 1,
                    record.addition_latency,
                    record.target_latency,
                    record.completion_latency,
                    record.targets_hit,
                    record.friend_hits,
                    record.shots,
                    record.hovers
                );
            }
            println!(
                "\nclicks: {}, misses: {}, hits: {}",
                report.accuracy.clicks, report.accuracy.misses, report.accuracy.hits
            );
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
        }
        Err(e) => {
            eprintln!("Trial rejected: {}", e);
            std::process::exit(1);
        }
    }
}

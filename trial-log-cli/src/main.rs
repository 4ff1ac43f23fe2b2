//! Trial Log CLI Application
//!
//! Command-line driver for the trial-log-decoder library. It adds:
//! - Subject/block/trial directory discovery
//! - Block and task descriptor loading
//! - TOML application config
//! - Parallel interpretation of trials
//! - Metrics table output

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use trial_log_decoder::{Interpreter, TrialReport};

mod config;
mod discovery;
mod report;

use config::AppConfig;
use discovery::{Selection, TrialJob};
use report::{Column, TableWriter, TrialContext};

/// Trial Log Reader - Turn experiment event logs into per-iteration metrics
#[derive(Parser, Debug)]
#[command(name = "trial-log-cli")]
#[command(about = "Interpret dual-task experiment logs into metrics tables", long_about = None)]
#[command(version)]
struct Args {
    /// Data root containing subject<N> directories
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Subject number
    #[arg(short, long, default_value_t = 5)]
    subject: u32,

    /// Only this block (directory name, e.g. block3)
    #[arg(long, value_name = "NAME")]
    block: Option<String>,

    /// Only this trial number
    #[arg(long, value_name = "N")]
    trial: Option<u32>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Design profile (combined-5s, combined-6s, sub-task)
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Output file for the metrics table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Comma-separated output columns (default: historical column set)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    columns: Vec<Column>,

    /// Print per-trial shot accuracy to stderr
    #[arg(long)]
    summary: bool,

    /// Number of worker threads (default: one per core)
    #[arg(short, long, value_name = "COUNT")]
    jobs: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Trial Log CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", trial_log_decoder::VERSION);

    let app = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    run(&args, app)
}

fn run(args: &Args, app: AppConfig) -> Result<()> {
    let profile = app.profile.resolve(args.profile.as_deref())?;
    log::info!("Design profile: {}", profile.name);
    let interpreter = Interpreter::new(profile).context("Failed to build interpreter")?;

    let root = args.root.clone().unwrap_or(app.input.root);
    let selection = Selection {
        block: args.block.clone(),
        trial: args.trial,
    };
    let jobs = discovery::discover(&root, args.subject, &selection)?;

    let results = interpret_all(&interpreter, &jobs, args.jobs)?;

    let columns = if args.columns.is_empty() {
        app.output.columns
    } else {
        args.columns.clone()
    };
    let out: Box<dyn Write> = match args.output.as_ref().or(app.output.file.as_ref()) {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = TableWriter::new(out, columns, app.output.delimiter);
    writer.write_header()?;

    let mut skipped = 0;
    for (job, result) in jobs.iter().zip(results) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                log::error!("Skipping {}/{}: {:#}", job.block, job.trial, e);
                skipped += 1;
                continue;
            }
        };

        for warning in &report.warnings {
            log::warn!("{}/{}: {}", job.block, job.trial, warning);
        }
        if args.summary {
            eprintln!(
                "{}/{}: clicks {}, misses {}, hits {}",
                job.block, job.trial, report.accuracy.clicks, report.accuracy.misses, report.accuracy.hits
            );
        }

        let context = TrialContext {
            subject: args.subject,
            block: &job.block,
            trial: &job.trial,
        };
        writer.write_trial(context, &job.config, &report.records)?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} rows from {} trials ({} skipped)",
        writer.rows_written(),
        jobs.len() - skipped,
        skipped
    );
    Ok(())
}

/// Interpret every trial; results come back in job order
fn interpret_all(
    interpreter: &Interpreter,
    jobs: &[TrialJob],
    threads: Option<usize>,
) -> Result<Vec<Result<TrialReport>>> {
    let work = || {
        jobs.par_iter()
            .map(|job| interpret_one(interpreter, job))
            .collect::<Vec<_>>()
    };

    match threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build worker pool")?;
            Ok(pool.install(work))
        }
        None => Ok(work()),
    }
}

fn interpret_one(interpreter: &Interpreter, job: &TrialJob) -> Result<TrialReport> {
    log::debug!("Interpreting {:?}", job.data_path());
    let log = job.read_log()?;
    let report = interpreter.interpret(&log, &job.config)?;
    Ok(report)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

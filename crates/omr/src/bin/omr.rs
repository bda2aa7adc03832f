//! omr CLI: grade answer-sheet photos from JSON job files.

use clap::{Parser, Subcommand};
use omr::grade::{AnswerKey, AnswerKeyError};
use omr::{load_json, GradeJobConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "omr")]
#[command(about = "Grade multiple-choice answer sheets from photos or scans")]
#[command(version)]
struct Cli {
    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one sheet described by a JSON job file.
    Grade {
        /// Path to the job file.
        config: PathBuf,
    },

    /// Check an answer key file and list every problem found.
    ValidateKey {
        /// JSON object mapping question numbers to letters A-E.
        key: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let level: LevelFilter = cli
        .log_level
        .parse()
        .map_err(|_| format!("unknown log level {:?}", cli.log_level))?;
    init_logging(level)?;

    match cli.command {
        Commands::Grade { config } => run_grade(&config),
        Commands::ValidateKey { key } => run_validate_key(&key),
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    omr::core::init_with_level(level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(_level: LevelFilter) -> CliResult<()> {
    // Filtering comes from RUST_LOG; library `log` records are bridged.
    let _ = tracing_log::LogTracer::init();
    omr::core::init_tracing(false);
    Ok(())
}

fn run_grade(config: &Path) -> CliResult<()> {
    let job = GradeJobConfig::load_json(config).map_err(|e| e.to_string())?;
    let report = job.run().map_err(|e| e.to_string())?;

    if job.report_path.is_none() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match (&report.result, &report.error) {
        (Some(result), _) => {
            eprintln!(
                "{}: {}/{} correct, grade {:.2}",
                report.image_path, result.correct, result.total, result.grade
            );
            for issue in &report.issues {
                eprintln!("  warning: {}", issue.message);
            }
            Ok(())
        }
        (None, Some(err)) => Err(format!("{}: {}", report.image_path, err.message).into()),
        (None, None) => Ok(()),
    }
}

fn run_validate_key(path: &Path) -> CliResult<()> {
    let raw: BTreeMap<String, String> = load_json(path).map_err(|e| e.to_string())?;
    match AnswerKey::from_raw(&raw) {
        Ok(key) => {
            println!("valid answer key: {} questions", key.len());
            Ok(())
        }
        Err(AnswerKeyError::Invalid(issues)) => {
            for issue in &issues {
                println!("{issue}");
            }
            Err(format!("{} problem(s) in {}", issues.len(), path.display()).into())
        }
        Err(e) => Err(e.to_string().into()),
    }
}

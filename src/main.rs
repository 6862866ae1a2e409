//! Spin Tally - score and seek through recorded spinner input traces

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod cli;
mod config;
mod paths;

use crate::config::{AppConfig, LoggingConfig, OutputFormat};
use crate::paths::AppPaths;
use spin_tally::{SpinReplay, SpinTrace};

/// Spin Tally - seek-safe spinner rotation scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file to score (.csv, .yaml, .yml or .json)
    trace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// After scoring the whole trace, seek to this time (repeatable)
    #[arg(long, allow_negative_numbers = true)]
    seek: Vec<f64>,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the turn stack after scoring
    #[arg(long)]
    turns: bool,

    /// Start an interactive session
    #[arg(long)]
    repl: bool,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();

    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());
    let mut config = AppConfig::load_or_default(&config_path)?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json {
        config.output.format = OutputFormat::Json;
    }
    if args.turns {
        config.output.show_turns = true;
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config.logging, &paths)?;

    info!("Starting Spin Tally v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", config_path.display());

    let mut replay = match &args.trace {
        Some(path) => SpinTrace::load(path)
            .with_context(|| format!("Failed to load trace: {}", path.display()))?
            .into_replay()?,
        None => SpinReplay::empty(),
    };

    if args.repl {
        cli::run_repl(&mut replay, &config)?;
        info!("Session closed");
        return Ok(());
    }

    if args.trace.is_none() {
        anyhow::bail!("No trace file given (pass a trace path, or --repl for a live session)");
    }

    score_trace(&mut replay, &args.seek, &config)
}

/// Score the full trace, then report after each requested seek
fn score_trace(replay: &mut SpinReplay, seeks: &[f64], config: &AppConfig) -> Result<()> {
    let format = config.output.format;

    replay.fast_forward();
    cli::check_replay(replay, config)?;
    cli::print_report(replay, format)?;

    for &time in seeks {
        let crossed = replay.seek(time);
        info!("Seek to {} crossed {} frames", time, crossed);
        cli::check_replay(replay, config)?;
        cli::print_report(replay, format)?;
    }

    if config.output.show_turns {
        cli::print_turns(replay, format)?;
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, paths: &AppPaths) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    // Reports go to stdout, logs to stderr
    let console_layer = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = if logging.file {
        paths.ensure_logs_dir()?;
        let appender = tracing_appender::rolling::daily(&paths.logs_dir, "spin-tally.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spin_tally::Frame;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "spin-tally",
            "trace.csv",
            "--seek",
            "500",
            "--seek",
            "-10",
            "--json",
        ]);
        assert_eq!(args.trace, Some(PathBuf::from("trace.csv")));
        assert_eq!(args.seek, vec![500.0, -10.0]);
        assert!(args.json);
        assert!(!args.repl);
    }

    #[test]
    fn test_score_trace_with_seeks() {
        let frames = vec![Frame::new(500.0, 370.0), Frame::new(1000.0, -50.0)];
        let mut replay = SpinReplay::new(frames).unwrap();
        let config = AppConfig::default();

        score_trace(&mut replay, &[600.0, 0.0, 2000.0], &config).unwrap();
        assert!(replay.at_end());
        assert_eq!(replay.total_rotation(), 400.0);
    }

    #[test]
    fn test_score_trace_fractional_frames_strict() {
        let frames = (0..20)
            .map(|i| Frame::new((i + 1) as f64 * 16.0, if i % 4 == 3 { -41.9 } else { 58.3 }))
            .collect();
        let mut replay = SpinReplay::new(frames).unwrap();
        let mut config = AppConfig::default();
        config.replay.strict = true;

        score_trace(&mut replay, &[100.0, 0.0, 250.0, 1000.0], &config).unwrap();
        assert!(replay.at_end());
    }
}

//! Command-line reporting and REPL

use anyhow::{Context, Result};
use colored::*;
use rustyline::DefaultEditor;
use serde::Serialize;
use spin_tally::{Frame, SpinReplay, Turn};
use tracing::{debug, warn};

use crate::config::{AppConfig, OutputFormat};

/// One line of scoring output
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub time: Option<f64>,
    pub cursor: usize,
    pub total_rotation: f32,
    pub completed_spins: usize,
}

impl Report {
    pub fn of(replay: &SpinReplay) -> Self {
        Self {
            time: replay.current_time(),
            cursor: replay.cursor(),
            total_rotation: replay.total_rotation(),
            completed_spins: replay.accumulator().completed_spins(),
        }
    }
}

/// Print the replay's current score
pub fn print_report(replay: &SpinReplay, format: OutputFormat) -> Result<()> {
    let report = Report::of(replay);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Text => {
            let time = report
                .time
                .map(|t| format!("{t:.1}"))
                .unwrap_or_else(|| "start".to_string());
            println!(
                "{} {:>10}  {} {:>4}/{:<4}  {} {:>9}  {} {}",
                "time".dimmed(),
                time,
                "frame".dimmed(),
                report.cursor,
                replay.frames().len(),
                "total".dimmed(),
                format!("{:.2}°", report.total_rotation).green().bold(),
                "spins".dimmed(),
                report.completed_spins.to_string().cyan()
            );
        }
    }
    Ok(())
}

/// Print the closed turns and the open one
pub fn print_turns(replay: &SpinReplay, format: OutputFormat) -> Result<()> {
    let accumulator = replay.accumulator();
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Turns<'a> {
                closed: &'a [Turn],
                current: &'a Turn,
            }
            let turns = Turns {
                closed: accumulator.turns(),
                current: accumulator.current_turn(),
            };
            println!("{}", serde_json::to_string(&turns)?);
        }
        OutputFormat::Text => {
            println!("{}", "Turns (oldest first):".bold());
            for turn in accumulator.turns() {
                println!("  {}", describe_turn(turn));
            }
            println!(
                "  {} {}",
                describe_turn(accumulator.current_turn()),
                "(open)".yellow()
            );
        }
    }
    Ok(())
}

fn describe_turn(turn: &Turn) -> String {
    let direction = turn
        .direction
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    let spin = if turn.is_complete_spin() {
        " spin".green().to_string()
    } else {
        String::new()
    };
    format!(
        "from {:>10}  {:>3}  {:>8.2}°{}",
        turn.start_time, direction, turn.angle, spin
    )
}

/// Cross-check the incremental total against a fresh rescore.
///
/// Divergence is logged as a warning, or returned as an error in strict mode.
pub fn check_replay(replay: &SpinReplay, config: &AppConfig) -> Result<()> {
    if !config.replay.verify {
        return Ok(());
    }

    match replay.verify_within(config.replay.tolerance) {
        Ok(()) => Ok(()),
        Err(e) if config.replay.strict => Err(e)
            .with_context(|| format!("Replay verification failed at frame {}", replay.cursor())),
        Err(e) => {
            warn!("Replay drift at frame {}: {}", replay.cursor(), e);
            Ok(())
        }
    }
}

/// REPL command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply { time: f64, delta: f32 },
    Seek { time: f64 },
    Step,
    Back,
    Rewind,
    End,
    Total,
    Turns,
    Verify,
    Help,
    Quit,
}

impl Command {
    /// Parse a REPL line like "apply 16 12.5", "seek 1000", "back"
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            anyhow::bail!("Empty command");
        };

        let mut number = |what: &str| -> Result<f64> {
            let word = words
                .next()
                .with_context(|| format!("Missing {} for '{}'", what, name))?;
            word.parse::<f64>()
                .with_context(|| format!("Invalid {}: {}", what, word))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "apply" | "a" => {
                let time = number("time")?;
                let delta = number("delta")? as f32;
                Command::Apply { time, delta }
            }
            "seek" | "s" => Command::Seek {
                time: number("time")?,
            },
            "step" | "n" => Command::Step,
            "back" | "b" => Command::Back,
            "rewind" => Command::Rewind,
            "end" => Command::End,
            "total" | "t" => Command::Total,
            "turns" => Command::Turns,
            "verify" => Command::Verify,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => anyhow::bail!("Unknown command: {}", other),
        };

        if let Some(extra) = words.next() {
            anyhow::bail!("Unexpected argument: {}", extra);
        }
        Ok(command)
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  apply <time> <delta>  record and apply a live frame");
    println!("  seek <time>           move the cursor to a playback time");
    println!("  step | back           move one frame forward / backward");
    println!("  rewind | end          jump to the start / end of the recording");
    println!("  total | turns         show the score / the turn stack");
    println!("  verify                compare against a from-scratch rescore");
    println!("  quit                  leave");
}

/// Execute one command. Returns false when the session should end.
pub fn execute(replay: &mut SpinReplay, command: Command, config: &AppConfig) -> Result<bool> {
    let format = config.output.format;
    let moves_cursor = !matches!(
        command,
        Command::Verify | Command::Help | Command::Total | Command::Turns
    );

    match command {
        Command::Apply { time, delta } => {
            replay.record(Frame::new(time, delta))?;
            print_report(replay, format)?;
        }
        Command::Seek { time } => {
            let crossed = replay.seek(time);
            debug!("Seek to {} crossed {} frames", time, crossed);
            print_report(replay, format)?;
        }
        Command::Step => {
            if !replay.step_forward() {
                println!("{}", "Already at the end".yellow());
            }
            print_report(replay, format)?;
        }
        Command::Back => {
            if !replay.step_backward() {
                println!("{}", "Already at the start".yellow());
            }
            print_report(replay, format)?;
        }
        Command::Rewind => {
            replay.rewind();
            print_report(replay, format)?;
        }
        Command::End => {
            replay.fast_forward();
            print_report(replay, format)?;
        }
        Command::Total => print_report(replay, format)?,
        Command::Turns => print_turns(replay, format)?,
        Command::Verify => match replay.verify_within(config.replay.tolerance) {
            Ok(()) => println!("{}", "✅ Incremental total matches rescore".green()),
            Err(e) => println!("{} {}", "❌".red(), e),
        },
        Command::Help => print_help(),
        Command::Quit => return Ok(false),
    }

    if moves_cursor {
        if let Err(e) = check_replay(replay, config) {
            warn!("{:#}", e);
        }
    }
    Ok(true)
}

pub fn run_repl(replay: &mut SpinReplay, config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    print_help();

    loop {
        let readline = rl.readline("spin> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    debug!("Failed to record history: {}", e);
                }

                match Command::parse(&line) {
                    Ok(command) => match execute(replay, command, config) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => println!("{} {:#}", "Error:".red(), e),
                    },
                    Err(e) => println!("{} {:#}", "Error:".red(), e),
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

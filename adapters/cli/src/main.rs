#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that fires laser pulses through level files and
//! replays recorded solutions.

mod report;
mod share_code;

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use laser_grid_core::{Level, Solution};
use laser_grid_system_completion::evaluate;
use laser_grid_system_propagation::PropagationRules;
use laser_grid_system_validation::{pulse, validate, validate_batch};
use laser_grid_world::{self as world, Grid};

use crate::{
    report::{PulseReport, ValidationLine},
    share_code::ShareCode,
};

/// Traces laser pulses through grid puzzle levels.
#[derive(Debug, Parser)]
#[command(name = "laser-grid", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fires one pulse through a level and prints what it produced.
    Pulse {
        /// Level description in JSON.
        level: PathBuf,
        /// Solution file whose placements are applied first.
        #[arg(long, conflicts_with = "share")]
        placements: Option<PathBuf>,
        /// Share code whose placements are applied first.
        #[arg(long)]
        share: Option<String>,
        /// Keep obstacles intact when beams hit them.
        #[arg(long)]
        no_beam_damage: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replays recorded solutions against a level.
    Validate {
        /// Level description in JSON.
        level: PathBuf,
        /// Solution files to replay.
        #[arg(required = true)]
        solutions: Vec<PathBuf>,
        /// Print one JSON report per solution.
        #[arg(long)]
        json: bool,
    },
    /// Reports whether a solution completes its level.
    Check {
        /// Level description in JSON.
        level: PathBuf,
        /// Solution file to apply.
        solution: PathBuf,
    },
    /// Prints a share code for the placements of a solution.
    Share {
        /// Level description in JSON.
        level: PathBuf,
        /// Solution file to encode.
        solution: PathBuf,
    },
}

/// Entry point for the laser grid command-line interface.
fn main() -> Result<ExitCode> {
    env_logger::init();
    match Cli::parse().command {
        Command::Pulse {
            level,
            placements,
            share,
            no_beam_damage,
            json,
        } => run_pulse(&level, placements.as_deref(), share.as_deref(), no_beam_damage, json),
        Command::Validate {
            level,
            solutions,
            json,
        } => run_validate(&level, solutions, json),
        Command::Check { level, solution } => run_check(&level, &solution),
        Command::Share { level, solution } => run_share(&level, &solution),
    }
}

fn run_pulse(
    level_path: &Path,
    placements: Option<&Path>,
    share: Option<&str>,
    no_beam_damage: bool,
    json: bool,
) -> Result<ExitCode> {
    let level = load_level(level_path)?;
    let records = match (placements, share) {
        (Some(path), _) => load_solution(path)?.placements,
        (None, Some(code)) => {
            let code = ShareCode::decode(code).context("failed to read share code")?;
            code.check_dimensions(level.width, level.height)?;
            code.placements
        }
        (None, None) => Vec::new(),
    };

    let base = Grid::from_level(&level)
        .with_context(|| format!("level {} is malformed", level_path.display()))?;
    let placements = world::placements_from_records(&records)?;
    let grid = world::apply_limited(&base, &placements, &level.tool_limits)?;

    let rules = PropagationRules {
        beam_damage: !no_beam_damage,
    };
    let pulse = pulse(&grid, rules);
    let completion = evaluate(&grid, level.goals(), &pulse.outcome);
    let report = PulseReport::new(&level.name, &grid, pulse, completion);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(level_path: &Path, solutions: Vec<PathBuf>, json: bool) -> Result<ExitCode> {
    let level = load_level(level_path)?;
    let cases = solutions
        .iter()
        .map(|path| Ok((level.clone(), load_solution(path)?)))
        .collect::<Result<Vec<(Level, Solution)>>>()?;

    let lines: Vec<ValidationLine> = solutions
        .into_iter()
        .zip(validate_batch(&cases))
        .map(|(path, result)| ValidationLine::new(path, result))
        .collect();

    let all_passed = lines.iter().all(ValidationLine::passed);
    for line in &lines {
        if json {
            println!("{}", serde_json::to_string(line)?);
        } else {
            println!("{line}");
        }
    }

    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_check(level_path: &Path, solution_path: &Path) -> Result<ExitCode> {
    let level = load_level(level_path)?;
    let solution = load_solution(solution_path)?;
    let result = validate(&level, &solution)?;

    if result.completion.complete {
        println!("complete");
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "incomplete (targets {}, energy goal {}, loop {})",
            met(result.completion.targets_met),
            met(result.completion.energy_goal_met),
            met(result.completion.loop_met)
        );
        Ok(ExitCode::FAILURE)
    }
}

fn run_share(level_path: &Path, solution_path: &Path) -> Result<ExitCode> {
    let level = load_level(level_path)?;
    let solution = load_solution(solution_path)?;
    let code = ShareCode {
        columns: level.width,
        rows: level.height,
        placements: solution.placements,
    };
    println!("{}", code.encode()?);
    Ok(ExitCode::SUCCESS)
}

fn load_level(path: &Path) -> Result<Level> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read level {}", path.display()))?;
    let level: Level = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse level {}", path.display()))?;
    log::debug!("loaded level '{}' from {}", level.name, path.display());
    Ok(level)
}

fn load_solution(path: &Path) -> Result<Solution> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read solution {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse solution {}", path.display()))
}

fn met(value: bool) -> &'static str {
    if value {
        "met"
    } else {
        "missed"
    }
}

use std::{collections::BTreeMap, fmt, path::PathBuf};

use laser_grid_core::{position_keys, BeamEvent, BeamSegment, CellCoord, Detonation};
use laser_grid_system_completion::CompletionReport;
use laser_grid_system_validation::{Pulse, ValidationError, ValidationResult};
use laser_grid_world::{query, Grid};
use serde::Serialize;

/// Everything a single pulse produced, ready for printing.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct PulseReport {
    level: String,
    columns: u32,
    rows: u32,
    segments: Vec<BeamSegment>,
    events: Vec<BeamEvent>,
    detonations: Vec<Detonation>,
    #[serde(serialize_with = "position_keys::serialize")]
    required: BTreeMap<CellCoord, u32>,
    #[serde(serialize_with = "position_keys::serialize")]
    target_energy: BTreeMap<CellCoord, u32>,
    total_energy: u64,
    loop_detected: bool,
    completion: CompletionReport,
}

impl PulseReport {
    pub(crate) fn new(
        level: &str,
        grid: &Grid,
        pulse: Pulse,
        completion: CompletionReport,
    ) -> Self {
        let (columns, rows) = query::dimensions(grid);
        let total_energy = pulse.outcome.total_energy();
        Self {
            level: level.to_owned(),
            columns,
            rows,
            segments: pulse.outcome.segments,
            events: pulse.outcome.events,
            detonations: pulse.detonations,
            required: query::targets(grid)
                .map(|(cell, target)| (cell, target.required_energy))
                .collect(),
            target_energy: pulse.outcome.target_energy,
            total_energy,
            loop_detected: pulse.outcome.loop_detected,
            completion,
        }
    }
}

impl fmt::Display for PulseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "level '{}' ({}x{})", self.level, self.columns, self.rows)?;

        for detonation in &self.detonations {
            writeln!(
                f,
                "bomb {} (power {}) cleared {} obstacle(s)",
                detonation.bomb,
                detonation.power,
                detonation.cleared.len()
            )?;
        }

        writeln!(f, "segments:")?;
        for segment in &self.segments {
            writeln!(
                f,
                "  #{} {} -> {} {} energy {} brightness {:.2}",
                segment.emitter,
                segment.start,
                segment.end,
                segment.direction,
                segment.energy,
                segment.brightness
            )?;
        }

        writeln!(f, "targets:")?;
        for (cell, required) in &self.required {
            let delivered = self.target_energy.get(cell).copied().unwrap_or(0);
            let verdict = if delivered >= *required { "met" } else { "short" };
            writeln!(f, "  {cell}: {delivered} / {required} {verdict}")?;
        }

        writeln!(f, "total energy: {}", self.total_energy)?;
        writeln!(f, "loop detected: {}", yes_no(self.loop_detected))?;
        write!(f, "complete: {}", yes_no(self.completion.complete))
    }
}

/// Outcome of replaying one solution file.
#[derive(Debug, Serialize)]
pub(crate) struct ValidationLine {
    solution: PathBuf,
    #[serde(flatten)]
    verdict: Verdict,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Verdict {
    Passed(ValidationResult),
    Failed(ValidationResult),
    Error { message: String },
}

impl ValidationLine {
    pub(crate) fn new(
        solution: PathBuf,
        result: Result<ValidationResult, ValidationError>,
    ) -> Self {
        let verdict = match result {
            Ok(result) if result.passed => Verdict::Passed(result),
            Ok(result) => Verdict::Failed(result),
            Err(error) => Verdict::Error {
                message: error.to_string(),
            },
        };
        Self { solution, verdict }
    }

    pub(crate) fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed(_))
    }
}

impl fmt::Display for ValidationLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let solution = self.solution.display();
        match &self.verdict {
            Verdict::Passed(_) => write!(f, "PASS {solution}"),
            Verdict::Failed(result) => {
                write!(f, "FAIL {solution}")?;
                for mismatch in &result.mismatches {
                    write!(f, "\n  {mismatch}")?;
                }
                Ok(())
            }
            Verdict::Error { message } => write!(f, "ERROR {solution}: {message}"),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

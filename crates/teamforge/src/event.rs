//! Output event records.
//!
//! A solve emits zero or more `progress` records followed by exactly one
//! terminal record: `complete` with the enriched roster on success, or
//! `error` with a machine-readable kind. The framing that carries these
//! over a network is someone else's concern; these are the payloads.

use serde::Serialize;

use teamforge_core::TeamForgeError;
use teamforge_solver::ProgressUpdate;

use crate::request::JsonMap;

/// Advisory progress on a running solve; one per incumbent, subject to
/// latest-wins coalescing.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressRecord {
    /// Strictly increasing incumbent counter.
    pub solution_count: u64,
    /// Objective of the incumbent.
    pub objective_value: f64,
    /// Seconds since the solve started.
    pub wall_time: f64,
    /// Solver conflicts so far.
    pub num_conflicts: u64,
    /// Human-readable summary.
    pub message: String,
}

impl ProgressRecord {
    pub(crate) fn from_update(update: &ProgressUpdate) -> ProgressRecord {
        let wall_time = update.wall_time.as_secs_f64();
        ProgressRecord {
            solution_count: update.solution_index,
            objective_value: update.objective as f64,
            wall_time,
            num_conflicts: update.conflicts,
            message: format!(
                "Solution {}: objective={:.2}, time={:.2}s, conflicts={}",
                update.solution_index, update.objective as f64, wall_time, update.conflicts
            ),
        }
    }
}

/// Aggregate statistics reported with the final assignment.
#[derive(Clone, Debug, Serialize)]
pub struct SolveSummary {
    pub solution_count: u64,
    pub wall_time: f64,
    pub num_teams: usize,
    pub num_participants: usize,
}

/// The successful terminal record: the roster echoed back with a
/// `team_number` on every participant.
#[derive(Clone, Debug, Serialize)]
pub struct CompleteRecord {
    pub participants: Vec<JsonMap>,
    pub stats: SolveSummary,
}

/// The failing terminal record.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorRecord {
    /// Machine-readable kind, e.g. `unsolvable_size`.
    pub kind: String,
    pub message: String,
}

impl From<&TeamForgeError> for ErrorRecord {
    fn from(err: &TeamForgeError) -> ErrorRecord {
        ErrorRecord {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// The terminal record of a solve; delivered exactly once, after any
/// progress records.
#[derive(Clone, Debug)]
pub enum TerminalRecord {
    Complete(CompleteRecord),
    Error(ErrorRecord),
}

/// Any record a subscriber can receive, tagged for wire use.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SolveEvent {
    Progress(ProgressRecord),
    Complete(CompleteRecord),
    Error(ErrorRecord),
}

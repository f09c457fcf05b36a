//! Search driver.
//!
//! The driver owns a solve from start to finish: it hands the frozen model
//! to the solver, snapshots the team assignment at every incumbent, relays
//! progress to the caller's callback, and folds the solver status together
//! with the cancellation state into the final outcome. Callers run it on a
//! worker thread so that subscribers and cancellation handlers stay
//! responsive while the solver grinds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use teamforge_model::{CpModel, VarId};
use tracing::info;

use crate::solve::{CpSolve, SolveParams, SolveStatus};
use crate::stats::SolveStats;

/// Shared flag for requesting an early stop.
///
/// Clones observe the same flag. The solver polls it between search nodes,
/// so delivery latency is bounded by the node rate.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Requests that the running solve stop at the next opportunity.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn flag(&self) -> &AtomicBool {
        &self.flag
    }
}

/// Summary of one incumbent, relayed to the progress subscriber.
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    /// Monotonic counter starting at 1.
    pub solution_index: u64,
    /// Objective value of the incumbent.
    pub objective: i64,
    /// Wall time since the solve started.
    pub wall_time: Duration,
    /// Conflicts hit so far.
    pub conflicts: u64,
}

/// Final classification of a driven solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveStatus {
    Optimal,
    Feasible,
    Infeasible,
    NoSolution,
    /// Cancelled before any solution was found. A cancellation after an
    /// incumbent exists surfaces as `Feasible` instead.
    Cancelled,
}

/// Final result of a driven solve.
#[derive(Clone, Debug)]
pub struct DriveOutcome {
    pub status: DriveStatus,
    /// Objective of the best assignment, when one exists.
    pub objective: Option<i64>,
    /// Values of the requested assignment variables, when a solution
    /// exists.
    pub assignment: Option<Vec<i64>>,
    /// Number of incumbents reported.
    pub solution_count: u64,
    pub stats: SolveStats,
}

/// Runs solves against a solver implementation with fixed parameters.
pub struct SearchDriver<S: CpSolve> {
    solver: S,
    params: SolveParams,
}

impl<S: CpSolve> SearchDriver<S> {
    pub fn new(solver: S, params: SolveParams) -> SearchDriver<S> {
        SearchDriver { solver, params }
    }

    pub fn params(&self) -> &SolveParams {
        &self.params
    }

    /// Solves `model`, reporting each incumbent through `on_progress` and
    /// returning the values of `assignment_vars` from the best solution.
    pub fn run(
        &self,
        model: &CpModel,
        assignment_vars: &[VarId],
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&ProgressUpdate),
    ) -> DriveOutcome {
        info!(
            event = "solve_start",
            vars = model.num_vars(),
            constraints = model.num_constraints(),
            max_time_ms = self.params.max_time.as_millis() as u64,
        );

        let mut solution_count = 0u64;
        let outcome = self.solver.solve(
            model,
            &self.params,
            cancel.flag(),
            &mut |event| {
                solution_count = event.solution_index;
                on_progress(&ProgressUpdate {
                    solution_index: event.solution_index,
                    objective: event.objective,
                    wall_time: event.wall_time,
                    conflicts: event.conflicts,
                });
            },
        );

        let status = match outcome.status {
            SolveStatus::Optimal => DriveStatus::Optimal,
            SolveStatus::Feasible => DriveStatus::Feasible,
            SolveStatus::Infeasible => DriveStatus::Infeasible,
            SolveStatus::NoSolution => {
                if cancel.is_cancelled() {
                    DriveStatus::Cancelled
                } else {
                    DriveStatus::NoSolution
                }
            }
        };

        let assignment = outcome.values.as_ref().map(|values| {
            assignment_vars
                .iter()
                .map(|var| values[var.index()])
                .collect()
        });

        info!(
            event = "solve_end",
            ?status,
            objective = outcome.objective,
            solutions = solution_count,
            elapsed_ms = outcome.stats.elapsed.as_millis() as u64,
        );

        DriveOutcome {
            status,
            objective: outcome.objective,
            assignment,
            solution_count,
            stats: outcome.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnb::BranchAndBound;
    use teamforge_model::LinExpr;

    fn toy_model() -> (CpModel, Vec<VarId>) {
        let mut model = CpModel::new();
        let x = model.new_int_var(0, 3, "x");
        let y = model.new_int_var(0, 3, "y");
        model.add_eq(LinExpr::var(x).with_term(1, y), 3);
        model.minimize(LinExpr::var(x));
        (model, vec![x, y])
    }

    #[test]
    fn reports_optimal_with_assignment() {
        let (model, vars) = toy_model();
        let driver = SearchDriver::new(BranchAndBound::new(), SolveParams::default());
        let cancel = CancellationToken::new();
        let mut updates = Vec::new();
        let outcome = driver.run(&model, &vars, &cancel, |update| {
            updates.push(update.solution_index);
        });
        assert_eq!(outcome.status, DriveStatus::Optimal);
        assert_eq!(outcome.objective, Some(0));
        assert_eq!(outcome.assignment, Some(vec![0, 3]));
        assert_eq!(outcome.solution_count, updates.len() as u64);
        assert!(!updates.is_empty());
    }

    #[test]
    fn progress_indices_increase_strictly() {
        let (model, vars) = toy_model();
        let driver = SearchDriver::new(BranchAndBound::new(), SolveParams::default());
        let cancel = CancellationToken::new();
        let mut last = 0;
        driver.run(&model, &vars, &cancel, |update| {
            assert!(update.solution_index > last);
            last = update.solution_index;
        });
    }

    #[test]
    fn cancellation_before_any_incumbent_maps_to_cancelled() {
        let (model, vars) = toy_model();
        let driver = SearchDriver::new(BranchAndBound::new(), SolveParams::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = driver.run(&model, &vars, &cancel, |_| {});
        assert_eq!(outcome.status, DriveStatus::Cancelled);
        assert!(outcome.assignment.is_none());
    }

    #[test]
    fn deadline_without_incumbent_maps_to_no_solution() {
        let (model, vars) = toy_model();
        let driver = SearchDriver::new(
            BranchAndBound::new(),
            SolveParams::new(Duration::ZERO),
        );
        let cancel = CancellationToken::new();
        let outcome = driver.run(&model, &vars, &cancel, |_| {});
        assert_eq!(outcome.status, DriveStatus::NoSolution);
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}

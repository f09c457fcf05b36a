//! The solver interface.
//!
//! The engine consumes a constraint solver through [`CpSolve`]: bounded
//! integer variables, linear and reified-linear constraints, max-equality,
//! a minimization objective, a wall-clock deadline, a cancellation flag,
//! and a callback fired on every strictly improving solution. Any solver
//! with that feature set can sit behind the trait; the bundled
//! implementation lives in [`crate::bnb`].

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teamforge_model::CpModel;

use crate::stats::SolveStats;

/// Tuning knobs for one solve.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use teamforge_solver::SolveParams;
///
/// let params = SolveParams::seconds(30).with_random_seed(7);
/// assert_eq!(params.max_time, Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveParams {
    /// Wall-clock budget for the solver. Model construction is budgeted
    /// separately by the caller.
    pub max_time: Duration,
    /// Seed for the solver's tie-breaking; identical seeds reproduce the
    /// search exactly.
    pub random_seed: u64,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            max_time: Duration::from_secs(60),
            random_seed: 0,
        }
    }
}

impl SolveParams {
    pub fn new(max_time: Duration) -> SolveParams {
        SolveParams {
            max_time,
            ..SolveParams::default()
        }
    }

    pub fn seconds(secs: u64) -> SolveParams {
        SolveParams::new(Duration::from_secs(secs))
    }

    pub fn millis(ms: u64) -> SolveParams {
        SolveParams::new(Duration::from_millis(ms))
    }

    pub fn with_max_time(mut self, max_time: Duration) -> SolveParams {
        self.max_time = max_time;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> SolveParams {
        self.random_seed = seed;
        self
    }
}

/// Outcome classification of a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// The best solution was proven optimal.
    Optimal,
    /// A solution was found, but the search stopped before proving
    /// optimality.
    Feasible,
    /// The search space was exhausted without any solution.
    Infeasible,
    /// The search stopped before finding any solution.
    NoSolution,
}

impl SolveStatus {
    pub fn is_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// A strictly improving solution reported during the search.
#[derive(Debug)]
pub struct IncumbentEvent<'a> {
    /// Monotonic counter starting at 1.
    pub solution_index: u64,
    /// Objective value of this solution.
    pub objective: i64,
    /// Wall time since the solve started.
    pub wall_time: Duration,
    /// Conflicts hit so far.
    pub conflicts: u64,
    /// Values of every model variable, indexed by variable handle.
    pub values: &'a [i64],
}

/// Final result of a solve.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Objective of the best solution, when one exists.
    pub objective: Option<i64>,
    /// Variable values of the best solution, when one exists.
    pub values: Option<Vec<i64>>,
    pub stats: SolveStats,
}

/// A constraint solver capable of running a frozen model.
pub trait CpSolve {
    /// Minimizes the model objective, firing `on_incumbent` for each
    /// strictly improving solution. The solver polls `cancel` between
    /// nodes and stops early when it is set or the deadline passes.
    fn solve(
        &self,
        model: &CpModel,
        params: &SolveParams,
        cancel: &AtomicBool,
        on_incumbent: &mut dyn FnMut(&IncumbentEvent<'_>),
    ) -> SolveOutcome;
}

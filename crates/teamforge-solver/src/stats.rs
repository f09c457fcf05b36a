//! Solve statistics.

use std::time::Duration;

/// Counters collected over one solve.
///
/// # Example
///
/// ```
/// use teamforge_solver::SolveStats;
///
/// let mut stats = SolveStats::default();
/// stats.record_node();
/// stats.record_conflict();
/// stats.record_incumbent();
///
/// assert_eq!(stats.nodes, 1);
/// assert_eq!(stats.conflicts, 1);
/// assert_eq!(stats.incumbents, 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SolveStats {
    /// Search nodes explored.
    pub nodes: u64,
    /// Dead ends hit during propagation.
    pub conflicts: u64,
    /// Strictly improving solutions found.
    pub incumbents: u64,
    /// Wall time spent in the solver.
    pub elapsed: Duration,
}

impl SolveStats {
    pub fn record_node(&mut self) {
        self.nodes += 1;
    }

    pub fn record_conflict(&mut self) {
        self.conflicts += 1;
    }

    pub fn record_incumbent(&mut self) {
        self.incumbents += 1;
    }

    /// Nodes explored per second of wall time.
    pub fn nodes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.nodes as f64 / secs
        } else {
            0.0
        }
    }
}

//! TeamForge solver engine
//!
//! This crate provides everything between a frozen model and a final
//! assignment:
//! - The solver interface ([`solve`]) and its bundled branch-and-bound
//!   implementation ([`bnb`])
//! - The search driver ([`driver`]) with deadlines, cancellation, and
//!   incumbent tracking
//! - The latest-wins progress channel ([`progress`])
//! - Solve statistics ([`stats`])

pub mod bnb;
pub mod driver;
pub mod progress;
pub mod solve;
pub mod stats;

pub use bnb::BranchAndBound;
pub use driver::{CancellationToken, DriveOutcome, DriveStatus, ProgressUpdate, SearchDriver};
pub use progress::{progress_channel, Delivery, ProgressReceiver, ProgressSender};
pub use solve::{CpSolve, IncumbentEvent, SolveOutcome, SolveParams, SolveStatus};
pub use stats::SolveStats;

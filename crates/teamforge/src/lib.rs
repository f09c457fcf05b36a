//! TeamForge - constraint-based team formation
//!
//! TeamForge splits a roster of participants into disjoint teams of a
//! target size, guided by weighted composition objectives over participant
//! attributes (cluster, cluster_numeric, different, diversify). The
//! problem is compiled into an integer constraint-optimization model and
//! minimized under a wall-clock deadline, streaming intermediate solutions
//! to a subscriber.
//!
//! # Quick Start
//!
//! ```
//! use teamforge::prelude::*;
//!
//! let request = AssignmentRequest::from_json(r#"{
//!     "participants": [
//!         {"id": 1, "level": "junior"},
//!         {"id": 2, "level": "senior"},
//!         {"id": 3, "level": "junior"},
//!         {"id": 4, "level": "senior"},
//!         {"id": 5, "level": "junior"},
//!         {"id": 6, "level": "senior"}
//!     ],
//!     "constraints": [
//!         {"attribute": "level", "type": "different", "weight": 1}
//!     ],
//!     "target_team_size": 3
//! }"#).unwrap();
//!
//! let report = TeamFormation::new(request).unwrap().assign().unwrap();
//! assert_eq!(report.num_teams, 2);
//! assert_eq!(report.team_numbers.len(), 6);
//! ```

pub mod engine;
pub mod evaluate;
pub mod event;
pub mod request;

pub use engine::{AssignmentReport, EngineConfig, SolveHandle, TeamFormation};
pub use evaluate::{evaluate_teams, MissRow};
pub use event::{
    CompleteRecord, ErrorRecord, ProgressRecord, SolveEvent, SolveSummary, TerminalRecord,
};
pub use request::AssignmentRequest;

pub mod prelude {
    pub use crate::{
        AssignmentRequest, AssignmentReport, EngineConfig, MissRow, SolveEvent, SolveHandle,
        TeamFormation,
    };
    pub use teamforge_core::{ConstraintKind, ConstraintSpec, TeamForgeError, TeamPlan};
    pub use teamforge_solver::{CancellationToken, SolveParams};
}

//! TeamForge core data model
//!
//! This crate provides the shared types used across the TeamForge workspace:
//! - Rosters of participants with typed attribute values
//! - Constraint specifications (cluster, cluster_numeric, different, diversify)
//! - The attribute normalizer that turns raw attribute columns into the
//!   canonical integer encodings consumed by the constraint compiler
//! - Team-size planning (number of teams and the admissible size pair)
//! - Error types

pub mod constraint;
pub mod error;
pub mod normalize;
pub mod roster;
pub mod sizing;

pub use constraint::{integer_weights, ConstraintKind, ConstraintSpec};
pub use error::{Result, TeamForgeError};
pub use normalize::{
    round_div_half_even, AttributeCatalog, DiscreteAttr, NumericAttr,
};
pub use roster::{AttrScalar, AttrValue, Participant, Roster};
pub use sizing::TeamPlan;

//! TeamForge model layer
//!
//! This crate owns the translation from a weighted constraint specification
//! over a roster into an integer constraint-optimization model:
//!
//! - [`var`]: variable handles and linear expressions
//! - [`model`]: the model container (variables, constraints, objective)
//! - [`builder`]: master decision variables, team-size cardinality, and
//!   symmetry breaking
//! - [`encode`]: one cost encoder per constraint kind

pub mod builder;
pub mod encode;
pub mod model;
pub mod var;

pub use builder::ModelBuilder;
pub use model::{Constraint, CpModel, UNBOUNDED_MAX, UNBOUNDED_MIN};
pub use var::{LinExpr, VarId};

//! Constraint specifications.

use serde::{Deserialize, Serialize};

/// The composition objective applied to one attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// All team members should share a value of the attribute.
    Cluster,
    /// Team members should have a small numeric range on the attribute.
    ClusterNumeric,
    /// Team members should all hold distinct values of the attribute.
    Different,
    /// Per-team value counts should follow the population distribution.
    Diversify,
}

impl ConstraintKind {
    /// Whether this kind consumes the numeric encoding of its attribute.
    pub fn is_numeric(self) -> bool {
        matches!(self, ConstraintKind::ClusterNumeric)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKind::Cluster => "cluster",
            ConstraintKind::ClusterNumeric => "cluster_numeric",
            ConstraintKind::Different => "different",
            ConstraintKind::Diversify => "diversify",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighted composition objective over a named attribute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Attribute name; must be present on every participant.
    pub attribute: String,
    /// Objective kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Positive priority weight relative to the other constraints.
    pub weight: f64,
}

impl ConstraintSpec {
    pub fn new(attribute: impl Into<String>, kind: ConstraintKind, weight: f64) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
            weight,
        }
    }
}

/// Scales the request weights to the integers used in the objective.
///
/// Integer weights pass through unchanged. If any weight is fractional,
/// every weight is multiplied by a common factor of 1000 and rounded, so
/// relative priorities are preserved; the factor cancels in comparisons
/// between assignments. Weights that would round to zero are clamped to 1.
pub fn integer_weights(specs: &[ConstraintSpec]) -> Vec<i64> {
    let fractional = specs.iter().any(|s| s.weight.fract() != 0.0);
    let scale = if fractional { 1000.0 } else { 1.0 };
    specs
        .iter()
        .map(|s| ((s.weight * scale).round() as i64).max(1))
        .collect()
}

//! Error types for TeamForge

use std::time::Duration;

use thiserror::Error;

/// Main error type for TeamForge operations.
///
/// All variants are terminal for a solve: the engine reports the error as
/// the final stream record and aborts.
#[derive(Debug, Error)]
pub enum TeamForgeError {
    /// Malformed or missing request fields.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A constraint references an attribute that is not present on
    /// every participant.
    #[error("attribute '{attribute}' is missing on participant {participant}")]
    MissingAttribute {
        attribute: String,
        participant: usize,
    },

    /// A numeric-clustering constraint targets a non-numeric column.
    #[error("attribute '{0}' cannot be coerced to an integer column")]
    NonNumericAttribute(String),

    /// A discrete constraint targets an attribute with no observed values.
    #[error("attribute '{0}' has no observed values")]
    EmptyDomain(String),

    /// The requested team sizes cannot partition the roster.
    #[error(
        "cannot split {participants} participants into teams of {target} \
         (sizes {small} or {large} allowed)"
    )]
    UnsolvableSize {
        participants: usize,
        target: usize,
        small: usize,
        large: usize,
    },

    /// The constraint compiler could not produce a consistent model.
    #[error("model compilation failed: {0}")]
    Compile(String),

    /// Model construction exceeded its time budget.
    #[error("model compilation exceeded the {0:?} budget")]
    CompileTimeout(Duration),

    /// The solver proved that no assignment satisfies the hard constraints.
    #[error("no assignment satisfies the team-size constraints")]
    Infeasible,

    /// No feasible assignment was found before the deadline.
    #[error("no solution found before the deadline")]
    NoSolution,

    /// The caller requested a stop before any solution was found.
    #[error("solve was cancelled before a solution was found")]
    Cancelled,

    /// Internal error (should not occur in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl TeamForgeError {
    /// Machine-readable error kind, used in the terminal error record.
    pub fn kind(&self) -> &'static str {
        match self {
            TeamForgeError::BadRequest(_) | TeamForgeError::MissingAttribute { .. } => {
                "bad_request"
            }
            TeamForgeError::NonNumericAttribute(_) => "non_numeric_attribute",
            TeamForgeError::EmptyDomain(_) => "empty_domain",
            TeamForgeError::UnsolvableSize { .. } => "unsolvable_size",
            TeamForgeError::Compile(_) => "compile_error",
            TeamForgeError::CompileTimeout(_) => "compile_timeout",
            TeamForgeError::Infeasible => "infeasible",
            TeamForgeError::NoSolution => "no_solution",
            TeamForgeError::Cancelled => "cancelled",
            TeamForgeError::Internal(_) => "internal",
        }
    }
}

/// Result type alias for TeamForge operations.
pub type Result<T> = std::result::Result<T, TeamForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(TeamForgeError::BadRequest("x".into()).kind(), "bad_request");
        assert_eq!(
            TeamForgeError::MissingAttribute {
                attribute: "gender".into(),
                participant: 3,
            }
            .kind(),
            "bad_request"
        );
        assert_eq!(TeamForgeError::Infeasible.kind(), "infeasible");
        assert_eq!(TeamForgeError::NoSolution.kind(), "no_solution");
        assert_eq!(
            TeamForgeError::UnsolvableSize {
                participants: 4,
                target: 3,
                small: 2,
                large: 3,
            }
            .kind(),
            "unsolvable_size"
        );
    }

    #[test]
    fn messages_mention_the_attribute() {
        let err = TeamForgeError::NonNumericAttribute("age".into());
        assert!(err.to_string().contains("age"));
    }
}

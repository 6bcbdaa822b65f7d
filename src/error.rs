//! Error types for the simulation core.
//!
//! Every fallible operation in the crate returns [`SimError`]. Errors are
//! surfaced immediately rather than recovered; any retry policy (smaller
//! time step, relaxed constraints) belongs to the embedding host.

use thiserror::Error;

/// Broad classification of a [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed an argument the API cannot accept.
    InvalidArgument,
    /// A numeric operation produced or detected an unusable value.
    NumericalFailure,
    /// The store or model was used in a state that contradicts its invariants.
    StateInconsistency,
}

/// Unified error type for the simulation core.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    #[error("index {index} out of range for {len} variables")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("range {index}..{end} out of range for {len} variables")]
    RangeOutOfRange { index: usize, end: usize, len: usize },

    #[error("body index {index} out of range for {len} bodies")]
    BodyOutOfRange { index: usize, len: usize },

    #[error("variable name list is empty")]
    EmptyNameList,

    #[error("variable name {0:?} is reserved")]
    ReservedName(String),

    #[error("variable name {0:?} is empty after normalization")]
    BlankName(String),

    #[error("duplicate variable name {0:?}")]
    DuplicateName(String),

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("NaN assigned to non-computed variable {index}")]
    NotANumber { index: usize },

    #[error(
        "constraint matrix is singular or ill-conditioned \
         (pivot ratio {ratio:.3e} below tolerance {tolerance:.3e})"
    )]
    SingularMatrix { ratio: f64, tolerance: f64 },

    #[error("non-finite or non-positive comparison argument {0}")]
    NonFiniteArgument(f64),

    #[error("variable {0} is a deleted slot")]
    DeletedVariable(usize),

    #[error("store has no time variable")]
    NoTimeVariable,
}

impl SimError {
    /// Classifies this error into the coarse taxonomy hosts branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::IndexOutOfRange { .. }
            | SimError::RangeOutOfRange { .. }
            | SimError::BodyOutOfRange { .. }
            | SimError::EmptyNameList
            | SimError::ReservedName(_)
            | SimError::BlankName(_)
            | SimError::DuplicateName(_)
            | SimError::LengthMismatch { .. } => ErrorKind::InvalidArgument,
            SimError::NotANumber { .. }
            | SimError::SingularMatrix { .. }
            | SimError::NonFiniteArgument(_) => ErrorKind::NumericalFailure,
            SimError::DeletedVariable(_) | SimError::NoTimeVariable => {
                ErrorKind::StateInconsistency
            }
        }
    }
}

/// Convenient Result alias for simulation operations.
pub type SimResult<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(
            SimError::IndexOutOfRange { index: 9, len: 3 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            SimError::SingularMatrix {
                ratio: 0.0,
                tolerance: 1e-10
            }
            .kind(),
            ErrorKind::NumericalFailure
        );
        assert_eq!(
            SimError::DeletedVariable(2).kind(),
            ErrorKind::StateInconsistency
        );
    }

    #[test]
    fn messages_name_the_offender() {
        let err = SimError::DuplicateName("ANGLE_1".into());
        assert!(err.to_string().contains("ANGLE_1"));
    }
}

//! Error types for value reconciliation

use thiserror::Error;

/// Merge conflicts and access failures.
///
/// Conflict variants carry compact renderings of the two operands that
/// could not be reconciled; `Inner` frames accumulate one per enclosing
/// merge call, so the innermost pair stays reachable through the chain.
#[derive(Error, Debug)]
pub enum MergeError {
    // Content conflicts
    #[error("different concrete values or abstract values that cannot be merged ({left} / {right})")]
    Incompatible { left: String, right: String },

    #[error("cannot merge different byte blocks ({left} / {right})")]
    ByteBlockMismatch { left: String, right: String },

    // Length conflicts
    #[error("sequences have different lengths ({left} / {right})")]
    LengthMismatch { left: String, right: String },

    #[error("cannot merge with a shorter sequence ({left} / {right})")]
    ShorterSequence { left: String, right: String },

    #[error("cannot merge with a longer sequence ({left} / {right})")]
    LongerSequence { left: String, right: String },

    #[error("cannot merge with a shorter sparse sequence ({left} / {right})")]
    ShorterSparse { left: String, right: String },

    #[error("cannot merge with a longer sparse sequence ({left} / {right})")]
    LongerSparse { left: String, right: String },

    // Type incompatibility
    #[error("cannot merge {left} with this type of object ({right})")]
    TypeMismatch { left: String, right: String },

    // Access failures
    #[error("index may be out of range: {0}")]
    IndexOutOfRange(isize),

    #[error("assignment index may be out of range: {0}")]
    AssignmentOutOfRange(isize),

    #[error("attempt to assign sequence of size {actual} to extended slice of possible size {expected}")]
    SliceSizeMismatch { actual: usize, expected: usize },

    // Propagation
    #[error("inner merge failure ({left} / {right})")]
    Inner {
        left: String,
        right: String,
        #[source]
        source: Box<MergeError>,
    },
}

/// Result type for merge operations
pub type MergeResult<T> = Result<T, MergeError>;

impl MergeError {
    /// The innermost pair of operands that actually conflicted, if any.
    /// Access failures carry no operand pair.
    pub fn conflict(&self) -> Option<(&str, &str)> {
        match self {
            MergeError::Inner { source, .. } => source.conflict(),
            MergeError::Incompatible { left, right }
            | MergeError::ByteBlockMismatch { left, right }
            | MergeError::LengthMismatch { left, right }
            | MergeError::ShorterSequence { left, right }
            | MergeError::LongerSequence { left, right }
            | MergeError::ShorterSparse { left, right }
            | MergeError::LongerSparse { left, right }
            | MergeError::TypeMismatch { left, right } => Some((left, right)),
            MergeError::IndexOutOfRange(_)
            | MergeError::AssignmentOutOfRange(_)
            | MergeError::SliceSizeMismatch { .. } => None,
        }
    }

    /// Number of `Inner` frames wrapped around the root failure.
    pub fn depth(&self) -> usize {
        match self {
            MergeError::Inner { source, .. } => 1 + source.depth(),
            _ => 0,
        }
    }
}

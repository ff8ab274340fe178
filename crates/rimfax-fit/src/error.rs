//! Error types for fitting.

use thiserror::Error;

/// Errors that can occur during result reduction and fitting.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum FitError {
    /// The fit did not converge within the iteration budget. The raw
    /// data is already persisted; this only aborts the analysis.
    #[error("fit did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    /// Not enough points to constrain the model.
    #[error("insufficient data: model needs {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The normal equations became singular.
    #[error("singular normal equations at iteration {iteration}")]
    Singular { iteration: usize },

    /// `t` and `y` lengths differ.
    #[error("mismatched input lengths: {t_len} time points, {y_len} values")]
    MismatchedLengths { t_len: usize, y_len: usize },
}

/// Result type for fit operations.
pub type FitResult<T> = Result<T, FitError>;

use thiserror::Error;

/// Unified error type for `fixpoint` operations.
///
/// Only configuration and setup problems are errors. Running out of
/// evaluations or hitting non-finite values during a solve is reported
/// through [`IterationResult`](crate::IterationResult) instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IterationError {
    /// Raised when the convergence tolerance is zero, negative or not finite.
    #[error("tolerance must be positive and finite, found {tol}")]
    NonPositiveTolerance { tol: f64 },

    /// Raised when the contraction evaluation budget is zero.
    #[error("max_evaluations must be at least 1")]
    ZeroEvaluationBudget,

    /// Raised when the SQUAREM step ceiling is not strictly positive.
    #[error("step_max must be positive, found {step_max}")]
    NonPositiveStepMax { step_max: f64 },

    /// Raised when the SQUAREM step floor exceeds the ceiling.
    #[error("step_min ({step_min}) must not exceed step_max ({step_max})")]
    InvalidStepBounds { step_min: f64, step_max: f64 },

    /// Raised when the SQUAREM step expansion factor is not strictly positive.
    #[error("step_factor must be positive, found {step_factor}")]
    NonPositiveStepFactor { step_factor: f64 },

    /// Raised when a floating point option is NaN or infinite.
    #[error("option `{name}` must be finite, found {value}")]
    NonFiniteOption {
        /// Name of the offending option.
        name: &'static str,
        /// The value that was supplied.
        value: f64,
    },

    /// Raised when a SQUAREM scheme number outside `1..=3` is requested.
    #[error("unknown SQUAREM scheme {scheme}; expected 1, 2 or 3")]
    UnknownScheme { scheme: u8 },

    /// Raised when an iteration routine is requested by an unknown name.
    #[error("unknown iteration method `{name}`; expected simple, squarem or return")]
    UnknownMethod { name: String },

    /// Raised when vectors or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },
}

impl IterationError {
    /// Helper to format a [`DimensionMismatch`](IterationError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when a matrix factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFiniteOption { name, value })
        }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, IterationError>;

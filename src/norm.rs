//! Norms used to measure the step between successive iterates.

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

type NormFn = dyn Fn(&DVector<f64>) -> f64 + Send + Sync;

/// Norm applied to `f(x) - x` when testing for convergence.
#[derive(Clone, Default)]
pub enum Norm {
    /// Maximum absolute coordinate (the supremum norm).
    #[default]
    Infinity,
    /// Euclidean (L2) norm.
    Euclidean,
    /// User-supplied norm. It should return a non-negative value.
    Custom(Arc<NormFn>),
}

impl Norm {
    /// Wraps a closure as a custom norm.
    pub fn custom<F>(norm: F) -> Self
    where
        F: Fn(&DVector<f64>) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(norm))
    }

    /// Evaluates the norm of `values`.
    pub fn evaluate(&self, values: &DVector<f64>) -> f64 {
        match self {
            Self::Infinity => values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())),
            Self::Euclidean => values.norm(),
            Self::Custom(norm) => norm(values),
        }
    }
}

impl fmt::Debug for Norm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinity => f.write_str("Infinity"),
            Self::Euclidean => f.write_str("Euclidean"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

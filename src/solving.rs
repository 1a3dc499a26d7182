//! Contraction evaluation bookkeeping and solve diagnostics.

use std::fmt::Display;

use log::{debug, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Why a solve stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The step norm fell below the tolerance.
    Converged,
    /// The contraction evaluation budget ran out first.
    BudgetExhausted,
    /// The contraction produced non-finite values, a vector of the wrong
    /// length, or aborted. The last finite iterate was kept.
    NumericalFailure,
}

/// Outcome of a fixed-point solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Final iterate. Only trustworthy when `converged` is true.
    pub final_vector: DVector<f64>,
    /// Whether the tolerance check ended the solve.
    pub converged: bool,
    /// Reason the solve stopped.
    pub termination: Termination,
    /// Number of completed major iterations.
    pub iterations: usize,
    /// Number of contraction evaluations, never more than `max_evaluations`.
    pub evaluations: usize,
    /// Last step norm that was computed, or infinity when none was.
    pub last_norm: f64,
}

/// Conversion from whatever a contraction returns into the next iterate.
///
/// `None` and `Err` abort the current evaluation; the solver treats them
/// exactly like a non-finite result and reverts to the last good iterate.
pub trait IntoIterate {
    /// Returns the next iterate, or `None` if the evaluation failed.
    fn into_iterate(self) -> Option<DVector<f64>>;
}

impl IntoIterate for DVector<f64> {
    fn into_iterate(self) -> Option<DVector<f64>> {
        Some(self)
    }
}

impl IntoIterate for Vec<f64> {
    fn into_iterate(self) -> Option<DVector<f64>> {
        Some(DVector::from_vec(self))
    }
}

impl IntoIterate for Option<DVector<f64>> {
    fn into_iterate(self) -> Option<DVector<f64>> {
        self
    }
}

impl<E: Display> IntoIterate for Result<DVector<f64>, E> {
    fn into_iterate(self) -> Option<DVector<f64>> {
        match self {
            Ok(values) => Some(values),
            Err(error) => {
                warn!("contraction aborted: {error}");
                None
            }
        }
    }
}

/// Counted access to the contraction mapping for a single solve.
///
/// Every call to [`evaluate`](Self::evaluate) counts against the evaluation
/// budget, and calls beyond the budget are refused without invoking the
/// mapping. Results are checked for length and finiteness.
pub struct IterationContext<'a> {
    mapping: &'a mut dyn FnMut(&DVector<f64>) -> Option<DVector<f64>>,
    callback: &'a mut dyn FnMut(),
    dimension: usize,
    max_evaluations: usize,
    evaluations: usize,
    iterations: usize,
    last_norm: f64,
}

impl<'a> IterationContext<'a> {
    pub(crate) fn new(
        mapping: &'a mut dyn FnMut(&DVector<f64>) -> Option<DVector<f64>>,
        callback: &'a mut dyn FnMut(),
        dimension: usize,
        max_evaluations: usize,
    ) -> Self {
        Self {
            mapping,
            callback,
            dimension,
            max_evaluations,
            evaluations: 0,
            iterations: 0,
            last_norm: f64::INFINITY,
        }
    }

    /// Applies the contraction to `x`.
    ///
    /// Returns `None` when the budget is already spent, or when the mapping
    /// aborted or produced a vector that is non-finite or of the wrong length.
    pub fn evaluate(&mut self, x: &DVector<f64>) -> Option<DVector<f64>> {
        if self.budget_exhausted() {
            return None;
        }
        self.evaluations += 1;

        let values = (self.mapping)(x)?;
        if values.len() != self.dimension {
            warn!(
                "contraction returned {} values for a {}-dimensional iterate",
                values.len(),
                self.dimension
            );
            return None;
        }
        if !values.iter().all(|value| value.is_finite()) {
            debug!(
                "contraction produced non-finite values at evaluation {}",
                self.evaluations
            );
            return None;
        }
        Some(values)
    }

    /// Marks a major iteration as complete and fires the iteration callback.
    pub fn complete_iteration(&mut self) {
        self.iterations += 1;
        (self.callback)();
    }

    /// Records the latest step norm for diagnostics.
    pub fn record_norm(&mut self, norm: f64) {
        self.last_norm = norm;
    }

    /// Whether no further evaluations are allowed.
    pub fn budget_exhausted(&self) -> bool {
        self.evaluations >= self.max_evaluations
    }

    /// Number of evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Number of major iterations completed so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Dimension of the iterate.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub(crate) fn finish(
        self,
        final_vector: DVector<f64>,
        termination: Termination,
    ) -> IterationResult {
        IterationResult {
            final_vector,
            converged: termination == Termination::Converged,
            termination,
            iterations: self.iterations,
            evaluations: self.evaluations,
            last_norm: self.last_norm,
        }
    }
}

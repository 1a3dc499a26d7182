//! SQUAREM acceleration of fixed-point iterations.
//!
//! Each major iteration takes two plain contraction steps from `x0`, uses the
//! observed residual `r = f(x0) - x0` and its change `v = (f(f(x0)) - f(x0)) - r`
//! to build a squared extrapolation
//!
//! ```text
//! x = x0 - 2 alpha r + alpha^2 v
//! ```
//!
//! and then applies the contraction once more to stabilize the extrapolated
//! point. The step length `alpha` is bounded by `step_min`/`step_max`, and a
//! bound that is hit is widened by `step_factor` for the remaining iterations.

use log::{debug, trace, warn};
use nalgebra::DVector;

use crate::iteration::FixedPointIterator;
use crate::options::{IterationOptions, Scheme, SquaremOptions};
use crate::solving::{IterationContext, Termination};

/// Accelerated iterator implementing the SQUAREM S1/S2/S3 schemes.
#[derive(Clone, Debug, Default)]
pub struct SquaremIterator {
    options: SquaremOptions,
}

impl SquaremIterator {
    /// Creates an iterator with the given extrapolation settings.
    pub fn new(options: SquaremOptions) -> Self {
        Self { options }
    }

    /// Extrapolation settings.
    pub fn options(&self) -> &SquaremOptions {
        &self.options
    }
}

/// Step bounds that evolve over the major iterations of a single solve.
#[derive(Clone, Copy, Debug)]
struct StepBounds {
    scheme: Scheme,
    step_min: f64,
    step_max: f64,
    step_factor: f64,
}

impl StepBounds {
    fn new(options: &SquaremOptions) -> Self {
        Self {
            scheme: options.scheme(),
            step_min: options.step_min(),
            step_max: options.step_max(),
            step_factor: options.step_factor(),
        }
    }

    /// Returns the bounded step length and widens whichever bound it hit.
    fn step_length(&mut self, r: &DVector<f64>, v: &DVector<f64>) -> f64 {
        let raw = self.scheme.step_length(r.dot(r), r.dot(v), v.dot(v));
        // A degenerate `v` yields NaN, which is kept so that the stabilization
        // step decides whether the extrapolation is usable. A `step_factor`
        // below one can shrink the ceiling under the floor; the floor wins then.
        let bounded = if raw.is_nan() {
            f64::NAN
        } else {
            self.step_min.max(self.step_max.min(-raw))
        };

        if bounded == self.step_max {
            self.step_max *= self.step_factor;
            debug!("SQUAREM step_max widened to {}", self.step_max);
        }
        if bounded == self.step_min && self.step_min < 0.0 {
            self.step_min *= self.step_factor;
            debug!("SQUAREM step_min widened to {}", self.step_min);
        }
        -bounded
    }
}

impl FixedPointIterator for SquaremIterator {
    fn iterate(
        &self,
        initial: DVector<f64>,
        options: &IterationOptions,
        context: &mut IterationContext<'_>,
    ) -> (DVector<f64>, Termination) {
        let norm = options.norm();
        let tol = options.tol();
        let mut bounds = StepBounds::new(&self.options);
        let mut fallback_available = self.options.fallback_to_simple();
        let mut x = initial;

        loop {
            // First plain step.
            let x0 = x;
            let Some(next) = context.evaluate(&x0) else {
                return failure(x0, context);
            };
            x = next;
            let g0 = &x - &x0;
            let g0_norm = norm.evaluate(&g0);
            context.record_norm(g0_norm);
            if let Some(termination) = check_stop(g0_norm, tol, context) {
                return (x, termination);
            }

            // Second plain step.
            let x1 = x;
            let Some(next) = context.evaluate(&x1) else {
                return failure(x1, context);
            };
            x = next;
            let g1 = &x - &x1;
            let g1_norm = norm.evaluate(&g1);
            context.record_norm(g1_norm);
            if let Some(termination) = check_stop(g1_norm, tol, context) {
                return (x, termination);
            }

            // Squared extrapolation.
            let r = g0;
            let v = &g1 - &r;
            let alpha = bounds.step_length(&r, &v);
            let x2 = x;
            let extrapolated = &x0 - &r * (2.0 * alpha) + &v * (alpha * alpha);
            trace!(
                "SQUAREM iteration {}: alpha {alpha:e}, residual norm {g1_norm:e}",
                context.iterations() + 1
            );

            // Stabilization step, from the extrapolated point or, after a
            // non-finite extrapolation with the fallback enabled, from `x2`.
            let finite = extrapolated.iter().all(|value| value.is_finite());
            let x3 = if fallback_available && !finite {
                fallback_available = false;
                warn!("SQUAREM extrapolation is not finite; continuing with a plain step");
                x2.clone()
            } else {
                extrapolated
            };
            let stabilized = match context.evaluate(&x3) {
                Some(values) => values,
                None if fallback_available && !context.budget_exhausted() => {
                    fallback_available = false;
                    warn!("SQUAREM stabilization failed; continuing with a plain step");
                    x = x2;
                    context.complete_iteration();
                    continue;
                }
                None => return failure(x2, context),
            };
            x = stabilized;
            context.complete_iteration();

            let step_norm = norm.evaluate(&(&x - &x3));
            context.record_norm(step_norm);
            if let Some(termination) = check_stop(step_norm, tol, context) {
                return (x, termination);
            }
        }
    }
}

/// An exhausted budget takes precedence over the tolerance, so a solve only
/// converges while evaluations remain.
fn check_stop(norm: f64, tol: f64, context: &IterationContext<'_>) -> Option<Termination> {
    if context.budget_exhausted() {
        debug!(
            "SQUAREM exhausted {} evaluations (norm {norm:e})",
            context.evaluations()
        );
        Some(Termination::BudgetExhausted)
    } else if norm < tol {
        debug!(
            "SQUAREM converged after {} evaluations ({} iterations)",
            context.evaluations(),
            context.iterations()
        );
        Some(Termination::Converged)
    } else {
        None
    }
}

fn failure(
    last_good: DVector<f64>,
    context: &IterationContext<'_>,
) -> (DVector<f64>, Termination) {
    warn!(
        "SQUAREM failed after {} evaluations; keeping last finite iterate",
        context.evaluations()
    );
    (last_good, Termination::NumericalFailure)
}

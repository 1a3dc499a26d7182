//! Plain fixed-point iteration without acceleration.

use log::{debug, trace, warn};
use nalgebra::DVector;

use crate::iteration::FixedPointIterator;
use crate::options::IterationOptions;
use crate::solving::{IterationContext, Termination};

/// Repeatedly applies the contraction, `x <- f(x)`.
///
/// Each contraction evaluation is one iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleIterator;

impl FixedPointIterator for SimpleIterator {
    fn iterate(
        &self,
        initial: DVector<f64>,
        options: &IterationOptions,
        context: &mut IterationContext<'_>,
    ) -> (DVector<f64>, Termination) {
        let mut x = initial;

        loop {
            let next = context.evaluate(&x);
            context.complete_iteration();

            let Some(next) = next else {
                warn!(
                    "simple iteration failed after {} evaluations; keeping last finite iterate",
                    context.evaluations()
                );
                return (x, Termination::NumericalFailure);
            };

            let norm = options.norm().evaluate(&(&next - &x));
            context.record_norm(norm);
            trace!("simple iteration {}: norm {norm:e}", context.iterations());
            x = next;

            if norm < options.tol() {
                debug!(
                    "simple iteration converged after {} evaluations",
                    context.evaluations()
                );
                return (x, Termination::Converged);
            }
            if context.budget_exhausted() {
                debug!(
                    "simple iteration exhausted {} evaluations (norm {norm:e})",
                    context.evaluations()
                );
                return (x, Termination::BudgetExhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::iteration::Iteration;

    fn options(tol: f64, max_evaluations: usize) -> IterationOptions {
        IterationOptions::builder()
            .tol(tol)
            .max_evaluations(max_evaluations)
            .build()
            .unwrap()
    }

    #[test]
    fn halving_map_converges_to_zero() {
        let iteration = Iteration::simple(options(1e-10, 1_000));
        let x0 = DVector::from_vec(vec![1.0]);

        let result = iteration.solve(&x0, |x: &DVector<f64>| x * 0.5);
        assert!(result.converged);
        assert_relative_eq!(result.final_vector[0], 0.0, epsilon = 1e-9);
        // |x_k - x_{k-1}| = 0.5^k drops below 1e-10 at k = 34.
        assert_eq!(result.evaluations, 34);
        assert_eq!(result.iterations, result.evaluations);
    }

    #[test]
    fn nan_on_first_call_keeps_initial_value() {
        let iteration = Iteration::simple(options(1e-10, 100));
        let x0 = DVector::from_vec(vec![0.25, -3.0]);

        let result = iteration.solve(&x0, |x: &DVector<f64>| x.map(|_| f64::NAN));
        assert!(!result.converged);
        assert_eq!(result.termination, Termination::NumericalFailure);
        assert_eq!(result.final_vector, x0);
        assert_eq!(result.evaluations, 1);
        assert_eq!(result.iterations, result.evaluations);
    }

    #[test]
    fn callback_fires_once_per_evaluation() {
        let iteration = Iteration::simple(options(1e-12, 7));
        let x0 = DVector::from_vec(vec![1.0, 1.0]);
        let mut ticks = 0usize;

        let result =
            iteration.solve_with_callback(&x0, |x: &DVector<f64>| x * 0.9, || ticks += 1);
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert_eq!(result.evaluations, 7);
        assert_eq!(ticks, 7);
    }

    #[test]
    fn tolerance_met_on_last_allowed_evaluation_counts_as_converged() {
        // Step norms are 0.5, 0.25, 0.125; the third is below the tolerance.
        let iteration = Iteration::simple(options(0.2, 3));
        let x0 = DVector::from_vec(vec![1.0]);

        let result = iteration.solve(&x0, |x: &DVector<f64>| x * 0.5);
        assert!(result.converged);
        assert_eq!(result.evaluations, 3);
        assert_relative_eq!(result.last_norm, 0.125);
    }
}

//! Fixed-point iteration front end: method selection, solving, and batch solving.

use std::fmt;
use std::sync::Arc;

use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{IterationError, Result};
use crate::options::{IterationOptions, SquaremOptions};
use crate::simple::SimpleIterator;
use crate::solving::{IntoIterate, IterationContext, IterationResult, Termination};
use crate::squarem::SquaremIterator;

/// A routine that drives a contraction towards its fixed point.
///
/// Implementations obtain every contraction value through
/// [`IterationContext::evaluate`], which enforces the evaluation budget and
/// reports non-finite values as `None`, and call
/// [`IterationContext::complete_iteration`] once per major iteration.
pub trait FixedPointIterator: fmt::Debug + Send + Sync {
    /// Iterates from `initial` and returns the final iterate with the reason for stopping.
    fn iterate(
        &self,
        initial: DVector<f64>,
        options: &IterationOptions,
        context: &mut IterationContext<'_>,
    ) -> (DVector<f64>, Termination);
}

/// Returns the initial vector unchanged without evaluating the contraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReturnIterator;

impl FixedPointIterator for ReturnIterator {
    fn iterate(
        &self,
        initial: DVector<f64>,
        _options: &IterationOptions,
        _context: &mut IterationContext<'_>,
    ) -> (DVector<f64>, Termination) {
        (initial, Termination::Converged)
    }
}

/// Iteration routine selected at configuration time.
#[derive(Clone, Debug)]
pub enum Method {
    /// Plain fixed-point iteration.
    Simple(SimpleIterator),
    /// SQUAREM accelerated iteration.
    Squarem(SquaremIterator),
    /// Trust the initial value as the fixed point.
    Return(ReturnIterator),
    /// A user-supplied routine.
    Custom(Arc<dyn FixedPointIterator>),
}

impl Method {
    fn iterator(&self) -> &dyn FixedPointIterator {
        match self {
            Self::Simple(iterator) => iterator,
            Self::Squarem(iterator) => iterator,
            Self::Return(iterator) => iterator,
            Self::Custom(iterator) => iterator.as_ref(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Squarem(_) => "squarem",
            Self::Return(_) => "return",
            Self::Custom(_) => "custom",
        }
    }
}

/// Configured fixed-point solver.
///
/// ```
/// use fixpoint::{Iteration, IterationOptions, SquaremOptions};
/// use nalgebra::DVector;
///
/// let options = IterationOptions::builder().tol(1e-12).build().unwrap();
/// let iteration = Iteration::squarem(options, SquaremOptions::default());
///
/// let result = iteration.solve(&DVector::from_vec(vec![1.0, 2.0]), |x: &DVector<f64>| {
///     x.map(|value| 0.5 * value + 1.0)
/// });
/// assert!(result.converged);
/// assert!((result.final_vector[0] - 2.0).abs() < 1e-10);
/// ```
#[derive(Clone, Debug)]
pub struct Iteration {
    method: Method,
    options: IterationOptions,
}

impl Default for Iteration {
    fn default() -> Self {
        Self::squarem(IterationOptions::default(), SquaremOptions::default())
    }
}

impl Iteration {
    /// Plain fixed-point iteration.
    pub fn simple(options: IterationOptions) -> Self {
        Self {
            method: Method::Simple(SimpleIterator),
            options,
        }
    }

    /// SQUAREM accelerated iteration.
    pub fn squarem(options: IterationOptions, squarem: SquaremOptions) -> Self {
        Self {
            method: Method::Squarem(SquaremIterator::new(squarem)),
            options,
        }
    }

    /// Returns the initial value as the fixed point without evaluating anything.
    pub fn trivial() -> Self {
        Self {
            method: Method::Return(ReturnIterator),
            options: IterationOptions::default(),
        }
    }

    /// Wraps a user-supplied iteration routine.
    pub fn custom<I>(options: IterationOptions, iterator: I) -> Self
    where
        I: FixedPointIterator + 'static,
    {
        Self {
            method: Method::Custom(Arc::new(iterator)),
            options,
        }
    }

    /// Selects a built-in routine by name: `"simple"`, `"squarem"` or `"return"`.
    ///
    /// SQUAREM uses its default extrapolation settings.
    pub fn named(name: &str, options: IterationOptions) -> Result<Self> {
        match name {
            "simple" => Ok(Self::simple(options)),
            "squarem" => Ok(Self::squarem(options, SquaremOptions::default())),
            "return" => Ok(Self {
                method: Method::Return(ReturnIterator),
                options,
            }),
            _ => Err(IterationError::UnknownMethod {
                name: name.to_string(),
            }),
        }
    }

    /// The selected routine.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Stopping rules shared by every routine.
    pub fn options(&self) -> &IterationOptions {
        &self.options
    }

    /// Solves for a fixed point of `contraction` starting from `initial`.
    pub fn solve<F, O>(&self, initial: &DVector<f64>, contraction: F) -> IterationResult
    where
        F: FnMut(&DVector<f64>) -> O,
        O: IntoIterate,
    {
        self.solve_with_callback(initial, contraction, || {})
    }

    /// Like [`solve`](Self::solve), invoking `callback` after every major iteration.
    pub fn solve_with_callback<F, O, C>(
        &self,
        initial: &DVector<f64>,
        mut contraction: F,
        mut callback: C,
    ) -> IterationResult
    where
        F: FnMut(&DVector<f64>) -> O,
        O: IntoIterate,
        C: FnMut(),
    {
        let mut mapping = |x: &DVector<f64>| contraction(x).into_iterate();
        let mut context = IterationContext::new(
            &mut mapping,
            &mut callback,
            initial.len(),
            self.options.max_evaluations(),
        );

        let iterator = self.method.iterator();
        let (final_vector, termination) =
            iterator.iterate(initial.clone(), &self.options, &mut context);
        let result = context.finish(final_vector, termination);

        debug!(
            "{} iteration finished: {:?} after {} iterations and {} evaluations",
            self.method.name(),
            result.termination,
            result.iterations,
            result.evaluations
        );
        result
    }

    /// Solves many independent fixed-point problems in parallel.
    ///
    /// `contraction(index, x)` evaluates the mapping of problem `index`. Every
    /// problem gets its own evaluation budget and SQUAREM step bounds.
    pub fn solve_batch<F, O>(
        &self,
        initials: &[DVector<f64>],
        contraction: F,
    ) -> Vec<IterationResult>
    where
        F: Fn(usize, &DVector<f64>) -> O + Sync,
        O: IntoIterate,
    {
        initials
            .par_iter()
            .enumerate()
            .map(|(index, initial)| {
                self.solve(initial, |x: &DVector<f64>| contraction(index, x))
            })
            .collect()
    }
}

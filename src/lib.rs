//! Fixed-point iteration with SQUAREM acceleration.
//!
//! Many estimators need the fixed point `x* = f(x*)` of a contraction mapping
//! before they can do anything else: equilibrium prices, mean utilities in
//! random coefficients demand models, EM updates. This crate provides the
//! iteration engine for those problems. It offers
//!
//! - plain fixed-point iteration and SQUAREM acceleration (`simple` and `squarem` modules),
//! - validated stopping rules and extrapolation settings (`options` module),
//! - counted, budget-enforced contraction evaluation (`solving` module),
//! - a hook for custom iteration routines and parallel batch solving (`iteration` module), and
//! - reference problems with closed-form solutions (`problems` module).
//!
//! Solves never fail with an error. Running out of evaluations or hitting
//! non-finite values is reported through [`IterationResult::converged`] and
//! [`IterationResult::termination`], and the last finite iterate is returned.
//! Only malformed configuration is rejected, when the options are built.
//!
//! # Quick start
//!
//! ```
//! use fixpoint::{Iteration, IterationOptions, Scheme, SquaremOptions};
//! use fixpoint::problems::LinearMap;
//!
//! let map = LinearMap::random_diagonal(10, 42);
//!
//! let options = IterationOptions::builder()
//!     .tol(1e-12)
//!     .max_evaluations(10_000)
//!     .build()
//!     .expect("valid stopping rules");
//! let squarem = SquaremOptions::builder()
//!     .scheme(Scheme::S3)
//!     .build()
//!     .expect("valid step bounds");
//!
//! let iteration = Iteration::squarem(options, squarem);
//! let initial = nalgebra::DVector::zeros(map.dimension());
//! let result = iteration.solve(&initial, |x: &nalgebra::DVector<f64>| map.apply(x));
//!
//! assert!(result.converged);
//! println!(
//!     "converged in {} iterations ({} evaluations)",
//!     result.iterations, result.evaluations
//! );
//! ```

pub mod error;
pub mod iteration;
pub mod norm;
pub mod options;
pub mod problems;
pub mod simple;
pub mod solving;
pub mod squarem;

pub use error::{IterationError, Result};
pub use iteration::{FixedPointIterator, Iteration, Method, ReturnIterator};
pub use norm::Norm;
pub use options::{IterationOptions, Scheme, SquaremOptions};
pub use simple::SimpleIterator;
pub use solving::{IntoIterate, IterationContext, IterationResult, Termination};
pub use squarem::SquaremIterator;

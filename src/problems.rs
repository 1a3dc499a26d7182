//! Reference contraction problems with known fixed points.
//!
//! These are used by the test suite and the benchmarks to compare iteration
//! methods on problems whose solution can be computed in closed form.

use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

use crate::error::{IterationError, Result};

/// Affine map `x -> A x + b`.
///
/// It is a contraction whenever the spectral radius of `A` is below one.
#[derive(Clone, Debug)]
pub struct LinearMap {
    matrix: DMatrix<f64>,
    offset: DVector<f64>,
}

impl LinearMap {
    /// Builds the map after checking that `A` is square and matches `b`.
    pub fn new(matrix: DMatrix<f64>, offset: DVector<f64>) -> Result<Self> {
        if !matrix.is_square() {
            return Err(IterationError::dimension_mismatch(
                "linear map columns",
                matrix.nrows(),
                matrix.ncols(),
            ));
        }
        if offset.len() != matrix.nrows() {
            return Err(IterationError::dimension_mismatch(
                "linear map offset",
                matrix.nrows(),
                offset.len(),
            ));
        }
        Ok(Self { matrix, offset })
    }

    /// Diagonal map `x_i -> a_i x_i + b_i` with the given rates and offsets.
    pub fn diagonal(rates: DVector<f64>, offset: DVector<f64>) -> Result<Self> {
        Self::new(DMatrix::from_diagonal(&rates), offset)
    }

    /// Diagonal map with rates drawn uniformly from `[0.05, 0.95)` and
    /// standard normal offsets.
    pub fn random_diagonal(dimension: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let rates = Uniform::new(0.05, 0.95);
        let diagonal = DVector::from_fn(dimension, |_, _| rates.sample(&mut rng));
        let offset = DVector::from_fn(dimension, |_, _| StandardNormal.sample(&mut rng));
        Self {
            matrix: DMatrix::from_diagonal(&diagonal),
            offset,
        }
    }

    /// Dimension of the iterate.
    pub fn dimension(&self) -> usize {
        self.offset.len()
    }

    /// Returns the matrix `A`.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Returns the offset `b`.
    pub fn offset(&self) -> &DVector<f64> {
        &self.offset
    }

    /// Evaluates `A x + b`.
    pub fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.matrix * x + &self.offset
    }

    /// Solves `(I - A) x = b` for the exact fixed point.
    pub fn fixed_point(&self) -> Result<DVector<f64>> {
        let n = self.dimension();
        let system = DMatrix::identity(n, n) - &self.matrix;
        system
            .lu()
            .solve(&self.offset)
            .ok_or_else(|| IterationError::singular("I - A"))
    }
}

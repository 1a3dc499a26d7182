//! Validated configuration for fixed-point iteration and SQUAREM acceleration.
//!
//! Options are only obtainable through builders that reject malformed values
//! up front, so a solve never starts with an inconsistent configuration.

use serde::{Deserialize, Serialize};

use crate::error::{IterationError, Result};
use crate::norm::Norm;

/// Controls the stopping rules shared by every iteration method.
#[derive(Clone, Debug)]
pub struct IterationOptions {
    max_evaluations: usize,
    tol: f64,
    norm: Norm,
}

impl Default for IterationOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 5_000,
            tol: 1e-14,
            norm: Norm::Infinity,
        }
    }
}

impl IterationOptions {
    /// Starts a builder seeded with the default options.
    pub fn builder() -> IterationOptionsBuilder {
        IterationOptionsBuilder::default()
    }

    /// Maximum number of contraction evaluations allowed in one solve.
    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    /// Convergence threshold on the step norm.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Norm applied to the difference between successive iterates.
    pub fn norm(&self) -> &Norm {
        &self.norm
    }
}

/// Builder that validates [`IterationOptions`].
#[derive(Clone, Debug)]
pub struct IterationOptionsBuilder {
    max_evaluations: usize,
    tol: f64,
    norm: Norm,
}

impl Default for IterationOptionsBuilder {
    fn default() -> Self {
        let defaults = IterationOptions::default();
        Self {
            max_evaluations: defaults.max_evaluations,
            tol: defaults.tol,
            norm: defaults.norm,
        }
    }
}

impl IterationOptionsBuilder {
    /// Sets the contraction evaluation budget.
    pub fn max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Sets the convergence tolerance.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the norm used for the convergence check.
    pub fn norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    /// Finalizes the options after validating the budget and tolerance.
    pub fn build(self) -> Result<IterationOptions> {
        if self.max_evaluations == 0 {
            return Err(IterationError::ZeroEvaluationBudget);
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(IterationError::NonPositiveTolerance { tol: self.tol });
        }
        Ok(IterationOptions {
            max_evaluations: self.max_evaluations,
            tol: self.tol,
            norm: self.norm,
        })
    }
}

/// Step length formula used by SQUAREM to extrapolate from two contraction steps.
///
/// With `r = f(x) - x` and `v = f(f(x)) - 2 f(x) + x` the schemes are
///
/// - `S1`: `alpha = r'v / v'v`
/// - `S2`: `alpha = r'r / r'v`
/// - `S3`: `alpha = -sqrt(r'r / v'v)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Scheme {
    /// Step length from the projection of `r` onto `v`.
    S1,
    /// Step length from the projection of `v` onto `r`.
    S2,
    /// Step length from the ratio of norms; the most stable choice.
    #[default]
    S3,
}

impl Scheme {
    /// Computes the unbounded step length for residual `r` and curvature `v`.
    pub(crate) fn step_length(self, rr: f64, rv: f64, vv: f64) -> f64 {
        match self {
            Self::S1 => rv / vv,
            Self::S2 => rr / rv,
            Self::S3 => -(rr / vv).sqrt(),
        }
    }
}

impl TryFrom<u8> for Scheme {
    type Error = IterationError;

    fn try_from(scheme: u8) -> Result<Self> {
        match scheme {
            1 => Ok(Self::S1),
            2 => Ok(Self::S2),
            3 => Ok(Self::S3),
            _ => Err(IterationError::UnknownScheme { scheme }),
        }
    }
}

impl From<Scheme> for u8 {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::S1 => 1,
            Scheme::S2 => 2,
            Scheme::S3 => 3,
        }
    }
}

/// Extrapolation settings for the SQUAREM accelerated iterator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SquaremOptionsBuilder")]
pub struct SquaremOptions {
    scheme: Scheme,
    step_min: f64,
    step_max: f64,
    step_factor: f64,
    fallback_to_simple: bool,
}

impl Default for SquaremOptions {
    fn default() -> Self {
        Self {
            scheme: Scheme::S3,
            step_min: 1.0,
            step_max: 1.0,
            step_factor: 4.0,
            fallback_to_simple: false,
        }
    }
}

impl SquaremOptions {
    /// Starts a builder seeded with the default options.
    pub fn builder() -> SquaremOptionsBuilder {
        SquaremOptionsBuilder::default()
    }

    /// Step length formula.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Initial floor on the (negated) step length. May be negative.
    pub fn step_min(&self) -> f64 {
        self.step_min
    }

    /// Initial ceiling on the (negated) step length.
    pub fn step_max(&self) -> f64 {
        self.step_max
    }

    /// Factor applied to a step bound each time the step length hits it.
    pub fn step_factor(&self) -> f64 {
        self.step_factor
    }

    /// Whether the first failed extrapolation falls back to a plain step instead of terminating.
    pub fn fallback_to_simple(&self) -> bool {
        self.fallback_to_simple
    }
}

/// Builder that validates [`SquaremOptions`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SquaremOptionsBuilder {
    scheme: Scheme,
    step_min: f64,
    step_max: f64,
    step_factor: f64,
    fallback_to_simple: bool,
}

impl Default for SquaremOptionsBuilder {
    fn default() -> Self {
        let defaults = SquaremOptions::default();
        Self {
            scheme: defaults.scheme,
            step_min: defaults.step_min,
            step_max: defaults.step_max,
            step_factor: defaults.step_factor,
            fallback_to_simple: defaults.fallback_to_simple,
        }
    }
}

impl SquaremOptionsBuilder {
    /// Sets the step length formula.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the initial step length floor.
    pub fn step_min(mut self, step_min: f64) -> Self {
        self.step_min = step_min;
        self
    }

    /// Sets the initial step length ceiling.
    pub fn step_max(mut self, step_max: f64) -> Self {
        self.step_max = step_max;
        self
    }

    /// Sets the bound expansion factor.
    pub fn step_factor(mut self, step_factor: f64) -> Self {
        self.step_factor = step_factor;
        self
    }

    /// Enables a one-shot fallback to plain iteration after a failed extrapolation.
    pub fn fallback_to_simple(mut self, enabled: bool) -> Self {
        self.fallback_to_simple = enabled;
        self
    }

    /// Finalizes the options after validating the step bounds.
    pub fn build(self) -> Result<SquaremOptions> {
        let step_min = IterationError::require_finite("step_min", self.step_min)?;
        let step_max = IterationError::require_finite("step_max", self.step_max)?;
        let step_factor = IterationError::require_finite("step_factor", self.step_factor)?;

        if step_max <= 0.0 {
            return Err(IterationError::NonPositiveStepMax { step_max });
        }
        if step_min > step_max {
            return Err(IterationError::InvalidStepBounds { step_min, step_max });
        }
        if step_factor <= 0.0 {
            return Err(IterationError::NonPositiveStepFactor { step_factor });
        }

        Ok(SquaremOptions {
            scheme: self.scheme,
            step_min,
            step_max,
            step_factor,
            fallback_to_simple: self.fallback_to_simple,
        })
    }
}

impl TryFrom<SquaremOptionsBuilder> for SquaremOptions {
    type Error = IterationError;

    fn try_from(builder: SquaremOptionsBuilder) -> Result<Self> {
        builder.build()
    }
}

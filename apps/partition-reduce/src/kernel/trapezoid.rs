//! Composite trapezoid rule over `[left, right]`.
//!
//! ```text
//! h = (right - left) / n
//! ∫ f ≈ h · Σ_{i=0}^{n-1} (f(x_i) + f(x_{i+1})) / 2,   x_i = left + i·h
//! ```
//!
//! The `n` trapezoids form the unit range; the step `h` is always derived
//! from the global interval, never from a rank's own slice.

use clap::ValueEnum;

use super::{code_field, float_field, int_field, LocalContribution, SharedParameters};
use crate::comm::Scalar;
use crate::error::{Error, Result};
use crate::partition::SubRange;
use crate::reduce::IDENTITY;

/// Trapezoid count used when none is given
pub const DEFAULT_SAMPLES: u64 = 1024;

/// Function being integrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Integrand {
    /// f(x) = x²
    #[default]
    Square,
    /// f(x) = x³
    Cube,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = eˣ
    Exp,
}

impl Integrand {
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Integrand::Square => x * x,
            Integrand::Cube => x * x * x,
            Integrand::Sine => x.sin(),
            Integrand::Exp => x.exp(),
        }
    }

    fn code(self) -> i64 {
        match self {
            Integrand::Square => 0,
            Integrand::Cube => 1,
            Integrand::Sine => 2,
            Integrand::Exp => 3,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Integrand::Square),
            1 => Some(Integrand::Cube),
            2 => Some(Integrand::Sine),
            3 => Some(Integrand::Exp),
            _ => None,
        }
    }
}

/// Broadcast inputs of the integration kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalParams {
    left: f64,
    right: f64,
    samples: u64,
    integrand: Integrand,
}

impl IntervalParams {
    pub fn new(left: f64, right: f64, samples: u64, integrand: Integrand) -> Result<Self> {
        if !left.is_finite() || !right.is_finite() {
            return Err(Error::InvalidInput(format!(
                "interval [{left}, {right}] must have finite endpoints"
            )));
        }
        if samples == 0 || i64::try_from(samples).is_err() {
            return Err(Error::InvalidInput(format!("sample count {samples} out of range")));
        }
        Ok(Self {
            left,
            right,
            samples,
            integrand,
        })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn integrand(&self) -> Integrand {
        self.integrand
    }

    /// Width of one trapezoid
    pub fn step(&self) -> f64 {
        (self.right - self.left) / self.samples as f64
    }
}

impl SharedParameters for IntervalParams {
    const FIELD_COUNT: usize = 4;

    fn to_fields(&self) -> Vec<Scalar> {
        vec![
            Scalar::Float(self.left),
            Scalar::Float(self.right),
            Scalar::Int(self.samples as i64),
            Scalar::Int(self.integrand.code()),
        ]
    }

    fn from_fields(fields: &[Scalar]) -> Result<Self> {
        let left = float_field(fields, 0)?;
        let right = float_field(fields, 1)?;
        let samples = int_field(fields, 2)?;
        let samples = u64::try_from(samples)
            .map_err(|_| Error::InvalidInput(format!("sample count {samples} out of range")))?;
        let integrand = code_field(fields, 3, Integrand::from_code)?;
        Self::new(left, right, samples, integrand)
    }
}

/// Trapezoid-rule kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct Trapezoid;

impl LocalContribution for Trapezoid {
    type Params = IntervalParams;

    fn total_units(&self, params: &IntervalParams) -> u64 {
        params.samples
    }

    fn contribution(&self, params: &IntervalParams, range: SubRange) -> f64 {
        if range.is_empty() {
            return IDENTITY;
        }
        let h = params.step();
        let f = |i: u64| params.integrand.eval(params.left + i as f64 * h);

        let sum = range
            .units()
            .fold(IDENTITY, |acc, i| acc + (f(i) + f(i + 1)) / 2.0);
        sum * h
    }
}

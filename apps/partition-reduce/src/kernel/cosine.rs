//! Truncated Maclaurin series for cos(x).
//!
//! ```text
//! cos(x) ≈ Σ_{i=0}^{k} (-1)^i · x^{2i} / (2i)!
//! ```
//!
//! The `k + 1` terms form the unit range that gets partitioned.

use std::f64::consts::{PI, TAU};

use clap::ValueEnum;

use super::{code_field, float_field, int_field, LocalContribution, SharedParameters};
use crate::comm::Scalar;
use crate::error::{Error, Result};
use crate::partition::SubRange;
use crate::reduce::IDENTITY;

/// Largest iteration bound whose factorials stay finite in `f64` (170!)
pub const MAX_ITERATIONS: u32 = 85;

/// How the input angle is folded before the series is summed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AngleReduction {
    /// `fmod(x, π)` outside `[-π, π]`, with the negative branch mirrored.
    ///
    /// Uses period π rather than 2π, so angles past ±180° can come out
    /// with the opposite sign of the true cosine.
    #[default]
    Reference,
    /// Fold into `[-π, π)` with period 2π
    Periodic,
    /// Sum the series on the raw angle
    #[value(name = "none")]
    Disabled,
}

impl AngleReduction {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            AngleReduction::Reference => {
                if x > PI {
                    x % PI
                } else if x < -PI {
                    -((-x) % PI)
                } else {
                    x
                }
            }
            AngleReduction::Periodic => {
                if (-PI..=PI).contains(&x) {
                    x
                } else {
                    (x + PI).rem_euclid(TAU) - PI
                }
            }
            AngleReduction::Disabled => x,
        }
    }

    fn code(self) -> i64 {
        match self {
            AngleReduction::Reference => 0,
            AngleReduction::Periodic => 1,
            AngleReduction::Disabled => 2,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AngleReduction::Reference),
            1 => Some(AngleReduction::Periodic),
            2 => Some(AngleReduction::Disabled),
            _ => None,
        }
    }
}

/// Broadcast inputs of the series kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesParams {
    iterations: u32,
    radians: f64,
    reduction: AngleReduction,
}

impl SeriesParams {
    pub fn new(iterations: u32, radians: f64, reduction: AngleReduction) -> Result<Self> {
        if iterations > MAX_ITERATIONS {
            return Err(Error::InvalidInput(format!(
                "iteration bound {iterations} exceeds {MAX_ITERATIONS}; (2k)! would overflow"
            )));
        }
        if !radians.is_finite() {
            return Err(Error::InvalidInput(format!("angle {radians} is not finite")));
        }
        Ok(Self {
            iterations,
            radians,
            reduction,
        })
    }

    pub fn from_degrees(iterations: u32, degrees: f64, reduction: AngleReduction) -> Result<Self> {
        Self::new(iterations, degrees * (PI / 180.0), reduction)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }

    pub fn degrees(&self) -> f64 {
        self.radians * 180.0 / PI
    }

    pub fn reduction(&self) -> AngleReduction {
        self.reduction
    }
}

impl SharedParameters for SeriesParams {
    const FIELD_COUNT: usize = 3;

    fn to_fields(&self) -> Vec<Scalar> {
        vec![
            Scalar::Int(i64::from(self.iterations)),
            Scalar::Float(self.radians),
            Scalar::Int(self.reduction.code()),
        ]
    }

    fn from_fields(fields: &[Scalar]) -> Result<Self> {
        let iterations = int_field(fields, 0)?;
        let iterations = u32::try_from(iterations)
            .map_err(|_| Error::InvalidInput(format!("iteration bound {iterations} out of range")))?;
        let radians = float_field(fields, 1)?;
        let reduction = code_field(fields, 2, AngleReduction::from_code)?;
        Self::new(iterations, radians, reduction)
    }
}

/// `(-1)^i · x^{2i} / (2i)!`, with the sign taken from the global index
fn term(x: f64, i: u64) -> f64 {
    let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
    sign * x.powi((2 * i) as i32) / factorial(2 * i)
}

fn factorial(n: u64) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Series-approximation kernel for cos(x)
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSeries;

impl LocalContribution for CosineSeries {
    type Params = SeriesParams;

    fn total_units(&self, params: &SeriesParams) -> u64 {
        u64::from(params.iterations) + 1
    }

    fn contribution(&self, params: &SeriesParams, range: SubRange) -> f64 {
        let x = params.reduction.apply(params.radians);
        range.units().fold(IDENTITY, |acc, i| acc + term(x, i))
    }
}

//! Numeric kernels evaluated by every rank over its own slice.

mod cosine;
mod trapezoid;

pub use cosine::{AngleReduction, CosineSeries, SeriesParams, MAX_ITERATIONS};
pub use trapezoid::{Integrand, IntervalParams, Trapezoid, DEFAULT_SAMPLES};

use crate::comm::{field_tag, Scalar};
use crate::error::{Error, Result};
use crate::partition::SubRange;

/// Scalar inputs every rank needs, as they travel during the broadcast.
///
/// `from_fields(to_fields(p))` must reproduce `p` bit for bit.
pub trait SharedParameters: Sized + Clone + Send + Sync + std::fmt::Debug {
    /// Number of scalars `to_fields` produces
    const FIELD_COUNT: usize;

    fn to_fields(&self) -> Vec<Scalar>;

    fn from_fields(fields: &[Scalar]) -> Result<Self>;
}

/// Partial result of one rank over one [`SubRange`].
///
/// Implementations are pure: no communication, and the same parameters and
/// slice always give the same bits. An empty slice contributes `0.0`.
pub trait LocalContribution {
    type Params: SharedParameters;

    /// Size of the global unit range these parameters describe
    fn total_units(&self, params: &Self::Params) -> u64;

    fn contribution(&self, params: &Self::Params, range: SubRange) -> f64;
}

fn field_error(index: usize, reason: impl Into<String>) -> Error {
    Error::ParameterField {
        index,
        tag: field_tag(index),
        reason: reason.into(),
    }
}

fn field(fields: &[Scalar], index: usize) -> Result<Scalar> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| field_error(index, format!("missing, only {} received", fields.len())))
}

pub(crate) fn int_field(fields: &[Scalar], index: usize) -> Result<i64> {
    field(fields, index)?
        .as_int()
        .ok_or_else(|| field_error(index, "expected an integer"))
}

pub(crate) fn float_field(fields: &[Scalar], index: usize) -> Result<f64> {
    field(fields, index)?
        .as_float()
        .ok_or_else(|| field_error(index, "expected a float"))
}

pub(crate) fn code_field<T>(fields: &[Scalar], index: usize, decode: fn(i64) -> Option<T>) -> Result<T> {
    let code = int_field(fields, index)?;
    decode(code).ok_or_else(|| field_error(index, format!("unknown code {code}")))
}

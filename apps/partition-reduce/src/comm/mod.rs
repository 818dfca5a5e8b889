//! Synchronous point-to-point message exchange.
//!
//! # Blocking contract
//!
//! - [`Communicator::recv`] suspends the caller until a message from exactly
//!   `(source, tag)` is available. Messages that do not match are held back
//!   for a later receive.
//! - [`Communicator::recv_any`] suspends until any rank delivers `tag`.
//! - [`Communicator::send`] may return as soon as the message is buffered.
//! - Messages between one ordered pair of ranks under one tag arrive in the
//!   order they were sent. Nothing is promised across pairs.
//! - There is no timeout. A receive with no matching send blocks forever.
//!
//! Runtimes:
//!
//! | Runtime | Type | Scope |
//! |---------|------|-------|
//! | threads | [`LocalGroup`] | every rank is a thread of this process |
//! | tcp     | [`TcpHub`] / [`TcpComm`] | one process per rank, star around rank 0 |
//! | mpi     | `MpiComm` (feature `mpi`) | launched by `mpirun` |

mod local;
mod mailbox;
#[cfg(feature = "mpi")]
mod mpi_world;
mod tcp;

pub use local::{LocalComm, LocalGroup};
#[cfg(feature = "mpi")]
pub use mpi_world::MpiComm;
pub use tcp::{TcpComm, TcpHub};

use crate::error::{Error, Result};
use crate::group::{GroupDescriptor, Rank};

/// Application-chosen message discriminator
pub type Tag = i32;

/// Tag carrying partial results back to the coordinator
pub const RESULT_TAG: Tag = 0;

/// Tag of the first parameter field; field `i` travels under `i + 1`
pub const FIRST_FIELD_TAG: Tag = 1;

pub fn field_tag(index: usize) -> Tag {
    FIRST_FIELD_TAG + index as Tag
}

/// Size of an encoded [`Scalar`]
pub const SCALAR_BYTES: usize = 9;

const KIND_INT: u8 = 0x01;
const KIND_FLOAT: u8 = 0x02;

/// Fixed-size message payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// One kind byte followed by the little-endian value.
    ///
    /// Floats are carried by bit pattern, so the receiver reconstructs the
    /// exact value the sender held, NaN payloads included.
    pub fn to_bytes(self) -> [u8; SCALAR_BYTES] {
        let (kind, body) = match self {
            Scalar::Int(v) => (KIND_INT, v.to_le_bytes()),
            Scalar::Float(v) => (KIND_FLOAT, v.to_bits().to_le_bytes()),
        };
        let mut out = [0u8; SCALAR_BYTES];
        out[0] = kind;
        out[1..].copy_from_slice(&body);
        out
    }

    pub fn from_bytes(bytes: &[u8; SCALAR_BYTES]) -> Result<Self> {
        let mut body = [0u8; 8];
        body.copy_from_slice(&bytes[1..]);
        match bytes[0] {
            KIND_INT => Ok(Scalar::Int(i64::from_le_bytes(body))),
            KIND_FLOAT => Ok(Scalar::Float(f64::from_bits(u64::from_le_bytes(body)))),
            other => Err(Error::MalformedFrame(other)),
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(v),
            Scalar::Float(_) => None,
        }
    }

    pub fn as_float(self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(v),
            Scalar::Int(_) => None,
        }
    }
}

/// A delivered message with its routing header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub value: Scalar,
}

/// Point-to-point messaging scoped to one flat group.
///
/// See the module docs for the blocking contract every implementation keeps.
pub trait Communicator {
    /// This process's identity in the group
    fn group(&self) -> GroupDescriptor;

    fn send(&self, dest: Rank, tag: Tag, value: Scalar) -> Result<()>;

    /// Block until `source` delivers a message under `tag`
    fn recv(&self, source: Rank, tag: Tag) -> Result<Scalar>;

    /// Block until any rank delivers a message under `tag`
    fn recv_any(&self, tag: Tag) -> Result<(Rank, Scalar)>;
}

impl<C: Communicator + ?Sized> Communicator for &C {
    fn group(&self) -> GroupDescriptor {
        (**self).group()
    }

    fn send(&self, dest: Rank, tag: Tag, value: Scalar) -> Result<()> {
        (**self).send(dest, tag, value)
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Scalar> {
        (**self).recv(source, tag)
    }

    fn recv_any(&self, tag: Tag) -> Result<(Rank, Scalar)> {
        (**self).recv_any(tag)
    }
}

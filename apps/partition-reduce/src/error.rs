//! Error types for partition-reduce

use thiserror::Error;

use crate::comm::Tag;
use crate::group::Rank;

/// Result type for group operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a single process can observe.
///
/// Protocol mismatches (a send with no matching receive) are deliberately
/// absent: they block forever and are never detected.
#[derive(Error, Debug)]
pub enum Error {
    /// Group must contain at least one process
    #[error("group size must be at least 1")]
    EmptyGroup,

    /// Rank outside `[0, size)`
    #[error("rank {rank} is outside a group of size {size}")]
    InvalidRank { rank: Rank, size: usize },

    /// The transport has no link to the requested peer
    #[error("no route from rank {from} to rank {to}")]
    NoRoute { from: Rank, to: Rank },

    /// Wire frame with an unknown scalar type byte
    #[error("malformed frame: unknown scalar kind {0:#04x}")]
    MalformedFrame(u8),

    /// A peer's link broke (bad frame or I/O error) while receives were pending
    #[error("link to rank {peer} failed: {reason}")]
    LinkFailed { peer: Rank, reason: String },

    /// A worker announced itself incorrectly during TCP bootstrap
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A broadcast field decoded to the wrong kind or an out-of-range value
    #[error("parameter field {index} (tag {tag}): {reason}")]
    ParameterField {
        index: usize,
        tag: Tag,
        reason: String,
    },

    /// A message arrived with the wrong scalar kind for its tag
    #[error("unexpected {kind} payload from rank {from} under tag {tag}")]
    UnexpectedPayload {
        from: Rank,
        tag: Tag,
        kind: &'static str,
    },

    /// Parameters rejected before any computation started
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A rank thread panicked inside the threads runtime
    #[error("rank {0} panicked")]
    RankPanicked(Rank),

    /// The group finished without a coordinator report
    #[error("no coordinator report was produced")]
    MissingReport,

    /// Runtime requested from a build that does not include it
    #[error("the {0} runtime is not compiled in (enable the `{0}` feature)")]
    FeatureDisabled(&'static str),

    /// MPI could not be initialized
    #[error("failed to initialize MPI")]
    MpiUnavailable,

    /// Underlying I/O failure (sockets, stdin)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! Partition / Compute / Reduce
//!
//! A fixed-size group of cooperating processes agrees on a handful of scalar
//! parameters, splits a global range of work units across itself, evaluates
//! a numeric kernel over each slice with no data sharing, and folds every
//! partial result into one value at the coordinator (rank 0).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Process Group                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌─────────────┐      ┌─────────────┐      ┌─────────────┐      │
//! │   │   Rank 0    │─────▶│   Rank 1    │      │   Rank 2    │      │
//! │   │(Coordinator)│─────────────────────────▶ │  (Worker)   │      │
//! │   │  [0, n/3)   │      │ [n/3, 2n/3) │      │ [2n/3, n)   │      │
//! │   └──────▲──────┘      └──────┬──────┘      └──────┬──────┘      │
//! │          │   partial (tag 0)  │                    │             │
//! │          └────────────────────┴────────────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! 1. The coordinator acquires [`kernel::SharedParameters`] and broadcasts them
//!    field by field ([`broadcast`]).
//! 2. Every rank derives its [`partition::SubRange`] from its
//!    [`group::GroupDescriptor`] alone.
//! 3. Every rank evaluates its [`kernel::LocalContribution`].
//! 4. Workers send their partial; the coordinator folds them ([`reduce`]).
//!
//! The message runtimes live in [`comm`]; [`launch`] wires them to the
//! per-process state machine in [`process`].

pub mod broadcast;
pub mod cli;
pub mod comm;
pub mod error;
pub mod group;
pub mod kernel;
pub mod launch;
pub mod logging;
pub mod partition;
pub mod process;
pub mod prompt;
pub mod reduce;

pub use error::{Error, Result};
pub use group::{GroupDescriptor, Rank, Role};
pub use partition::SubRange;

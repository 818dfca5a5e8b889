//! Per-process state machine.
//!
//! ```text
//! Coordinator: Init -> ParamsReady -> Computed -> Reduced -> Done
//! Worker:      Init -> ParamsReady -> Computed -> Sent    -> Done
//! ```
//!
//! [`Process::run`] is the only place that branches on [`Role`]; the
//! broadcast, partition, kernel and reduce steps it calls are role-agnostic.
//! A process runs once: `run` consumes it.

use std::time::{Duration, Instant};

use tracing::info;

use crate::broadcast;
use crate::comm::Communicator;
use crate::error::Result;
use crate::group::{GroupDescriptor, Rank, Role};
use crate::kernel::LocalContribution;
use crate::partition::SubRange;
use crate::reduce::{self, Contribution, ReduceOrder, ResultReducer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Only the group descriptor is known
    Init,
    /// Shared parameters held
    ParamsReady,
    /// Sub-range derived and local contribution evaluated
    Computed,
    /// Coordinator: every partial folded
    Reduced,
    /// Worker: partial handed to the coordinator
    Sent,
    Done,
}

impl Phase {
    /// The single phase that may follow `self` for a process in `role`
    pub fn next(self, role: Role) -> Option<Phase> {
        match (self, role) {
            (Phase::Init, _) => Some(Phase::ParamsReady),
            (Phase::ParamsReady, _) => Some(Phase::Computed),
            (Phase::Computed, Role::Coordinator) => Some(Phase::Reduced),
            (Phase::Computed, Role::Worker) => Some(Phase::Sent),
            (Phase::Reduced | Phase::Sent, _) => Some(Phase::Done),
            (Phase::Done, _) => None,
        }
    }
}

/// What the coordinator reports once the group is done
#[derive(Debug, Clone)]
pub struct Report<P> {
    pub params: P,
    pub value: f64,
    pub total_units: u64,
    pub group_size: usize,
    /// Wall time from the broadcast to the end of the reduction
    pub elapsed: Duration,
    /// Per-rank partials in the order they were folded
    pub contributions: Vec<Contribution>,
    pub order: ReduceOrder,
}

/// What a worker leaves behind after sending its partial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSummary {
    pub rank: Rank,
    pub range: SubRange,
    pub partial: f64,
}

#[derive(Debug, Clone)]
pub enum Outcome<P> {
    Coordinator(Report<P>),
    Worker(WorkerSummary),
}

impl<P> Outcome<P> {
    pub fn into_report(self) -> Option<Report<P>> {
        match self {
            Outcome::Coordinator(report) => Some(report),
            Outcome::Worker(_) => None,
        }
    }
}

/// One member of the group, bound to its communicator and kernel
pub struct Process<'k, C, K> {
    comm: C,
    kernel: &'k K,
    reducer: ResultReducer,
    group: GroupDescriptor,
    phase: Phase,
}

impl<'k, C, K> Process<'k, C, K>
where
    C: Communicator,
    K: LocalContribution,
{
    pub fn new(comm: C, kernel: &'k K, reducer: ResultReducer) -> Self {
        let group = comm.group();
        Self {
            comm,
            kernel,
            reducer,
            group,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive this process to `Done`.
    ///
    /// `acquire` supplies the parameters and is only called on the
    /// coordinator; workers get theirs from the broadcast.
    pub fn run<A>(mut self, acquire: A) -> Result<Outcome<K::Params>>
    where
        A: FnOnce() -> Result<K::Params>,
    {
        match self.group.role() {
            Role::Coordinator => self.coordinate(acquire).map(Outcome::Coordinator),
            Role::Worker => self.work().map(Outcome::Worker),
        }
    }

    fn advance(&mut self, to: Phase) {
        debug_assert_eq!(
            self.phase.next(self.group.role()),
            Some(to),
            "illegal transition {:?} -> {:?}",
            self.phase,
            to
        );
        info!(rank = self.group.rank(), from = ?self.phase, ?to, "phase");
        self.phase = to;
    }

    fn compute(&mut self, params: &K::Params) -> (u64, SubRange, f64) {
        let total_units = self.kernel.total_units(params);
        let range = SubRange::for_rank(total_units, &self.group);
        let partial = self.kernel.contribution(params, range);
        info!(rank = self.group.rank(), %range, partial, "local contribution");
        self.advance(Phase::Computed);
        (total_units, range, partial)
    }

    fn coordinate<A>(&mut self, acquire: A) -> Result<Report<K::Params>>
    where
        A: FnOnce() -> Result<K::Params>,
    {
        let params = acquire()?;
        self.advance(Phase::ParamsReady);

        let started = Instant::now();
        broadcast::publish(&self.comm, &params)?;

        let (total_units, _, partial) = self.compute(&params);

        let reduction = self.reducer.reduce(&self.comm, partial)?;
        self.advance(Phase::Reduced);
        let elapsed = started.elapsed();

        self.advance(Phase::Done);
        Ok(Report {
            params,
            value: reduction.total,
            total_units,
            group_size: self.group.size(),
            elapsed,
            contributions: reduction.contributions,
            order: self.reducer.order(),
        })
    }

    fn work(&mut self) -> Result<WorkerSummary> {
        let params: K::Params = broadcast::receive(&self.comm)?;
        self.advance(Phase::ParamsReady);

        let (_, range, partial) = self.compute(&params);

        reduce::send_partial(&self.comm, partial)?;
        self.advance(Phase::Sent);

        self.advance(Phase::Done);
        Ok(WorkerSummary {
            rank: self.group.rank(),
            range,
            partial,
        })
    }
}

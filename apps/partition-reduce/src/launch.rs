//! Running a whole group on one of the runtimes.
//!
//! Every entry point returns `Some(report)` on the coordinator and `None` on
//! workers. The threads and rayon runtimes host the coordinator in this
//! process and therefore always report.

use std::thread;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::cli::{GroupArgs, Runtime};
use crate::comm::{Communicator, LocalGroup, TcpComm};
use crate::error::{Error, Result};
use crate::group::GroupDescriptor;
use crate::kernel::LocalContribution;
use crate::partition::SubRange;
use crate::process::{Outcome, Process, Report};
use crate::reduce::{self, Contribution, ReduceOrder, ResultReducer};

/// Run the group described by `args`.
///
/// `acquire` is the coordinator's input step; it is never called on a worker.
pub fn run<K, A>(args: &GroupArgs, kernel: &K, acquire: A) -> Result<Option<Report<K::Params>>>
where
    K: LocalContribution + Sync,
    A: FnOnce() -> Result<K::Params>,
{
    let reducer = ResultReducer::new(args.reduce_order);
    info!(runtime = %args.runtime, procs = args.procs, "launching group");

    match args.runtime {
        Runtime::Threads => run_threads(args.procs, kernel, reducer, acquire).map(Some),
        Runtime::Tcp => {
            let group = GroupDescriptor::new(args.rank, args.procs)?;
            let comm = TcpComm::establish(&args.master_addr, group)?;
            Process::new(comm, kernel, reducer)
                .run(acquire)
                .map(Outcome::into_report)
        }
        Runtime::Mpi => run_mpi(kernel, reducer, acquire),
        Runtime::Rayon => run_shared_memory(args.procs, kernel, acquire).map(Some),
    }
}

/// Every rank as a thread of this process.
///
/// The coordinator's input step runs before the ranks start, since they all
/// share this process's terminal.
pub fn run_threads<K, A>(
    size: usize,
    kernel: &K,
    reducer: ResultReducer,
    acquire: A,
) -> Result<Report<K::Params>>
where
    K: LocalContribution + Sync,
    A: FnOnce() -> Result<K::Params>,
{
    let comms = LocalGroup::create(size)?;
    let params = acquire()?;

    let outcomes = thread::scope(|scope| -> Result<Vec<Outcome<K::Params>>> {
        let mut handles = Vec::with_capacity(size);
        for comm in comms {
            let rank = comm.group().rank();
            let params = params.clone();
            let handle = thread::Builder::new()
                .name(format!("rank-{rank}"))
                .spawn_scoped(scope, move || {
                    Process::new(comm, kernel, reducer).run(move || Ok(params))
                })?;
            handles.push((rank, handle));
        }

        handles
            .into_iter()
            .map(|(rank, handle)| match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::RankPanicked(rank)),
            })
            .collect()
    })?;

    outcomes
        .into_iter()
        .find_map(Outcome::into_report)
        .ok_or(Error::MissingReport)
}

#[cfg(feature = "mpi")]
fn run_mpi<K, A>(kernel: &K, reducer: ResultReducer, acquire: A) -> Result<Option<Report<K::Params>>>
where
    K: LocalContribution,
    A: FnOnce() -> Result<K::Params>,
{
    let comm = crate::comm::MpiComm::init()?;
    Process::new(comm, kernel, reducer)
        .run(acquire)
        .map(Outcome::into_report)
}

#[cfg(not(feature = "mpi"))]
fn run_mpi<K, A>(_kernel: &K, _reducer: ResultReducer, _acquire: A) -> Result<Option<Report<K::Params>>>
where
    K: LocalContribution,
    A: FnOnce() -> Result<K::Params>,
{
    Err(Error::FeatureDisabled("mpi"))
}

/// Shared-memory baseline: the same partition and kernel, evaluated on the
/// rayon pool with no message exchange, folded in ascending rank order.
pub fn run_shared_memory<K, A>(size: usize, kernel: &K, acquire: A) -> Result<Report<K::Params>>
where
    K: LocalContribution + Sync,
    A: FnOnce() -> Result<K::Params>,
{
    let params = acquire()?;
    let started = Instant::now();
    let total_units = kernel.total_units(&params);

    let contributions = (0..size)
        .into_par_iter()
        .map(|rank| {
            let group = GroupDescriptor::new(rank, size)?;
            let range = SubRange::for_rank(total_units, &group);
            Ok(Contribution {
                rank,
                value: kernel.contribution(&params, range),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if contributions.is_empty() {
        return Err(Error::EmptyGroup);
    }

    Ok(Report {
        value: reduce::fold(&contributions),
        params,
        total_units,
        group_size: size,
        elapsed: started.elapsed(),
        contributions,
        order: ReduceOrder::Ascending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::TcpHub;
    use crate::kernel::{
        AngleReduction, CosineSeries, Integrand, IntervalParams, SeriesParams, Trapezoid,
        DEFAULT_SAMPLES,
    };

    fn series(iterations: u32, degrees: f64) -> impl Fn() -> Result<SeriesParams> {
        move || SeriesParams::from_degrees(iterations, degrees, AngleReduction::Reference)
    }

    fn unit_square() -> Result<IntervalParams> {
        IntervalParams::new(0.0, 1.0, DEFAULT_SAMPLES, Integrand::Square)
    }

    #[test]
    fn test_cosine_of_zero() {
        for size in [1, 2, 4, 7] {
            let report = run_threads(size, &CosineSeries, ResultReducer::default(), series(10, 0.0)).unwrap();
            assert!((report.value - 1.0).abs() < 1e-9, "size {size}: {}", report.value);
            assert_eq!(report.total_units, 11);
        }
    }

    #[test]
    fn test_cosine_of_sixty() {
        let report = run_threads(4, &CosineSeries, ResultReducer::default(), series(20, 60.0)).unwrap();
        assert!((report.value - 0.5).abs() < 1e-6);
        assert_eq!(report.group_size, 4);
        assert_eq!(report.contributions.len(), 4);
    }

    #[test]
    fn test_integral_of_square() {
        let report = run_threads(4, &Trapezoid, ResultReducer::default(), unit_square).unwrap();
        assert!((report.value - 1.0 / 3.0).abs() < 1e-4);
        assert_eq!(report.total_units, 1024);
    }

    #[test]
    fn test_group_size_does_not_change_answer() {
        let one = run_threads(1, &CosineSeries, ResultReducer::default(), series(20, 60.0)).unwrap();
        let four = run_threads(4, &CosineSeries, ResultReducer::default(), series(20, 60.0)).unwrap();
        assert!((one.value - four.value).abs() < 1e-12);

        let one = run_threads(1, &Trapezoid, ResultReducer::default(), unit_square).unwrap();
        let four = run_threads(4, &Trapezoid, ResultReducer::default(), unit_square).unwrap();
        assert!((one.value - four.value).abs() < 1e-12);
    }

    #[test]
    fn test_more_ranks_than_units() {
        // 3 series terms over 8 ranks: seven empty slices.
        let report = run_threads(8, &CosineSeries, ResultReducer::default(), series(2, 30.0)).unwrap();
        let empty = report.contributions.iter().filter(|c| c.value == 0.0).count();
        assert!(empty >= 7);
        let x = 30.0_f64.to_radians();
        assert!((report.value - (1.0 - x * x / 2.0 + x.powi(4) / 24.0)).abs() < 1e-12);
    }

    #[test]
    fn test_arrival_order_within_tolerance() {
        let ascending = run_threads(6, &Trapezoid, ResultReducer::new(ReduceOrder::Ascending), unit_square).unwrap();
        let arrival = run_threads(6, &Trapezoid, ResultReducer::new(ReduceOrder::Arrival), unit_square).unwrap();
        assert!((ascending.value - arrival.value).abs() < 1e-12);
        assert_eq!(arrival.order, ReduceOrder::Arrival);
    }

    #[test]
    fn test_ascending_order_is_reproducible() {
        let first = run_threads(5, &CosineSeries, ResultReducer::default(), series(40, 123.0)).unwrap();
        let second = run_threads(5, &CosineSeries, ResultReducer::default(), series(40, 123.0)).unwrap();
        assert_eq!(first.value.to_bits(), second.value.to_bits());
        let ranks: Vec<_> = first.contributions.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_shared_memory_matches_threads() {
        let threads = run_threads(4, &CosineSeries, ResultReducer::default(), series(20, 60.0)).unwrap();
        let shared = run_shared_memory(4, &CosineSeries, series(20, 60.0)).unwrap();
        assert_eq!(threads.value.to_bits(), shared.value.to_bits());
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert!(matches!(
            run_threads(0, &Trapezoid, ResultReducer::default(), unit_square),
            Err(Error::EmptyGroup)
        ));
        assert!(matches!(
            run_shared_memory(0, &Trapezoid, unit_square),
            Err(Error::EmptyGroup)
        ));
    }

    #[test]
    fn test_tcp_group_over_loopback() {
        let size = 3;
        let hub = TcpHub::bind("127.0.0.1:0", size).unwrap();
        let addr = hub.local_addr().unwrap();

        let workers: Vec<_> = (1..size)
            .map(|rank| {
                thread::spawn(move || {
                    let group = GroupDescriptor::new(rank, size).unwrap();
                    let comm = TcpComm::connect(addr, group).unwrap();
                    Process::new(comm, &Trapezoid, ResultReducer::default())
                        .run(unit_square)
                        .unwrap()
                })
            })
            .collect();

        let comm = hub.accept_workers().unwrap();
        let report = Process::new(comm, &Trapezoid, ResultReducer::default())
            .run(unit_square)
            .unwrap()
            .into_report()
            .unwrap();

        for worker in workers {
            assert!(worker.join().unwrap().into_report().is_none());
        }
        assert!((report.value - 1.0 / 3.0).abs() < 1e-4);
        assert_eq!(report.group_size, 3);
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn test_mpi_requires_feature() {
        let result = run_mpi(&Trapezoid, ResultReducer::default(), unit_square);
        assert!(matches!(result, Err(Error::FeatureDisabled("mpi"))));
    }
}

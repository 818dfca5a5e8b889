//! Coordinator-side combination of partial results.
//!
//! The coordinator seeds the running total with its own partial, then
//! receives exactly one partial from every other rank. Two fold orders:
//!
//! - [`ReduceOrder::Ascending`]: receive from rank 1, 2, ... in turn. The
//!   result is bit-identical across runs.
//! - [`ReduceOrder::Arrival`]: take whichever partial lands first. Lower
//!   latency, but floating-point rounding may differ between runs.
//!
//! A worker that never sends leaves the coordinator blocked forever.

use clap::ValueEnum;
use tracing::debug;

use crate::comm::{Communicator, Scalar, RESULT_TAG};
use crate::error::{Error, Result};
use crate::group::{Rank, COORDINATOR};

/// Additive identity; the contribution of an empty slice
pub const IDENTITY: f64 = 0.0;

/// Order in which the coordinator folds partials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReduceOrder {
    /// Ascending source rank (deterministic)
    #[default]
    Ascending,
    /// First come, first folded
    Arrival,
}

/// One rank's partial result as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub rank: Rank,
    pub value: f64,
}

/// Folded total plus every contribution in the order it was added
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub total: f64,
    pub contributions: Vec<Contribution>,
}

/// Left fold of `contributions` in slice order
pub fn fold(contributions: &[Contribution]) -> f64 {
    contributions.iter().fold(IDENTITY, |acc, c| acc + c.value)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultReducer {
    order: ReduceOrder,
}

impl ResultReducer {
    pub fn new(order: ReduceOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ReduceOrder {
        self.order
    }

    /// Collect one partial per worker and fold them onto `own`.
    pub fn reduce<C: Communicator>(&self, comm: &C, own: f64) -> Result<Reduction> {
        let group = comm.group();
        let mut total = own;
        let mut contributions = Vec::with_capacity(group.size());
        contributions.push(Contribution {
            rank: group.rank(),
            value: own,
        });

        for expected in group.workers() {
            let (source, payload) = match self.order {
                ReduceOrder::Ascending => (expected, comm.recv(expected, RESULT_TAG)?),
                ReduceOrder::Arrival => comm.recv_any(RESULT_TAG)?,
            };
            let value = payload.as_float().ok_or(Error::UnexpectedPayload {
                from: source,
                tag: RESULT_TAG,
                kind: "integer",
            })?;

            debug!(source, value, "partial folded");
            total += value;
            contributions.push(Contribution {
                rank: source,
                value,
            });
        }

        Ok(Reduction {
            total,
            contributions,
        })
    }
}

/// Worker side: hand this rank's partial to the coordinator, exactly once.
pub fn send_partial<C: Communicator>(comm: &C, partial: f64) -> Result<()> {
    comm.send(COORDINATOR, RESULT_TAG, Scalar::Float(partial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalGroup, Tag};
    use crate::group::GroupDescriptor;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::thread;

    /// Coordinator endpoint whose inbox replays a fixed arrival order
    struct Scripted {
        group: GroupDescriptor,
        inbox: RefCell<VecDeque<(Rank, Scalar)>>,
    }

    impl Scripted {
        fn new(arrivals: Vec<(Rank, f64)>) -> Self {
            Self {
                group: GroupDescriptor::new(0, arrivals.len() + 1).unwrap(),
                inbox: RefCell::new(
                    arrivals
                        .into_iter()
                        .map(|(rank, v)| (rank, Scalar::Float(v)))
                        .collect(),
                ),
            }
        }
    }

    impl Communicator for Scripted {
        fn group(&self) -> GroupDescriptor {
            self.group
        }

        fn send(&self, _dest: Rank, _tag: Tag, _value: Scalar) -> Result<()> {
            Ok(())
        }

        fn recv(&self, source: Rank, _tag: Tag) -> Result<Scalar> {
            let mut inbox = self.inbox.borrow_mut();
            let pos = inbox.iter().position(|(r, _)| *r == source).unwrap();
            Ok(inbox.remove(pos).unwrap().1)
        }

        fn recv_any(&self, _tag: Tag) -> Result<(Rank, Scalar)> {
            Ok(self.inbox.borrow_mut().pop_front().unwrap())
        }
    }

    fn ranks(reduction: &Reduction) -> Vec<Rank> {
        reduction.contributions.iter().map(|c| c.rank).collect()
    }

    #[test]
    fn test_ascending_ignores_arrival_order() {
        let comm = Scripted::new(vec![(3, 0.3), (1, 0.1), (2, 0.2)]);
        let reduction = ResultReducer::new(ReduceOrder::Ascending).reduce(&comm, 1.0).unwrap();
        assert_eq!(ranks(&reduction), vec![0, 1, 2, 3]);
        assert_eq!(reduction.total, ((1.0 + 0.1) + 0.2) + 0.3);
    }

    #[test]
    fn test_arrival_follows_arrival_order() {
        let comm = Scripted::new(vec![(3, 0.3), (1, 0.1), (2, 0.2)]);
        let reduction = ResultReducer::new(ReduceOrder::Arrival).reduce(&comm, 1.0).unwrap();
        assert_eq!(ranks(&reduction), vec![0, 3, 1, 2]);
        assert!((reduction.total - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_single_rank_is_own_partial() {
        let comm = Scripted::new(vec![]);
        let reduction = ResultReducer::default().reduce(&comm, 0.75).unwrap();
        assert_eq!(reduction.total, 0.75);
        assert_eq!(ranks(&reduction), vec![0]);
    }

    #[test]
    fn test_integer_partial_is_rejected() {
        let comms = LocalGroup::create(2).unwrap();
        comms[1].send(0, RESULT_TAG, Scalar::Int(3)).unwrap();
        assert!(matches!(
            ResultReducer::default().reduce(&comms[0], 0.0),
            Err(Error::UnexpectedPayload { from: 1, .. })
        ));
    }

    #[test]
    fn test_workers_over_threads() {
        let mut comms = LocalGroup::create(5).unwrap().into_iter();
        let coordinator = comms.next().unwrap();
        let senders: Vec<_> = comms
            .map(|comm| {
                thread::spawn(move || {
                    send_partial(&comm, comm.group().rank() as f64 * 0.5).unwrap();
                })
            })
            .collect();

        let reduction = ResultReducer::new(ReduceOrder::Arrival)
            .reduce(&coordinator, 0.0)
            .unwrap();
        assert!((reduction.total - 5.0).abs() < 1e-12);
        let mut seen = ranks(&reduction);
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        for sender in senders {
            sender.join().unwrap();
        }
    }

    #[test]
    fn test_fold_is_left_to_right() {
        let parts = [
            Contribution { rank: 0, value: 1e16 },
            Contribution { rank: 1, value: 1.0 },
            Contribution { rank: 2, value: -1e16 },
        ];
        assert_eq!(fold(&parts), 0.0);
    }

    proptest! {
        #[test]
        fn prop_total_matches_sum_in_any_order(
            (partials, arrival) in prop::collection::vec(-1e6f64..1e6, 1..32)
                .prop_flat_map(|p| {
                    let order: Vec<usize> = (1..p.len()).collect();
                    (Just(p), Just(order).prop_shuffle())
                }),
            arrival_policy in any::<bool>(),
        ) {
            let own = partials[0];
            let comm = Scripted::new(arrival.iter().map(|&r| (r, partials[r])).collect());
            let order = if arrival_policy { ReduceOrder::Arrival } else { ReduceOrder::Ascending };

            let reduction = ResultReducer::new(order).reduce(&comm, own).unwrap();

            let exact: f64 = partials.iter().sum();
            let scale = partials.iter().map(|v| v.abs()).sum::<f64>().max(1.0);
            prop_assert!((reduction.total - exact).abs() / scale < 1e-9);
            prop_assert_eq!(reduction.contributions.len(), partials.len());
        }
    }
}

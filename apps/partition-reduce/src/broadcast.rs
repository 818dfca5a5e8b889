//! Parameter broadcast from the coordinator to every worker.
//!
//! Each parameter field travels as its own message: field `i` goes under
//! [`field_tag`]`(i)`, clear of the result tag. A worker receives the fields
//! by tag, so it only proceeds once every field has arrived.

use tracing::debug;

use crate::comm::{field_tag, Communicator};
use crate::error::Result;
use crate::group::COORDINATOR;
use crate::kernel::SharedParameters;

/// Coordinator side: send every field of `params` to every worker.
pub fn publish<C, P>(comm: &C, params: &P) -> Result<()>
where
    C: Communicator,
    P: SharedParameters,
{
    let group = comm.group();
    let fields = params.to_fields();
    debug_assert_eq!(fields.len(), P::FIELD_COUNT);

    for dest in group.workers() {
        for (index, value) in fields.iter().enumerate() {
            comm.send(dest, field_tag(index), *value)?;
        }
    }

    debug!(workers = group.size() - 1, fields = fields.len(), "parameters published");
    Ok(())
}

/// Worker side: block until the coordinator's copy has fully arrived.
pub fn receive<C, P>(comm: &C) -> Result<P>
where
    C: Communicator,
    P: SharedParameters,
{
    let fields = (0..P::FIELD_COUNT)
        .map(|index| comm.recv(COORDINATOR, field_tag(index)))
        .collect::<Result<Vec<_>>>()?;

    let params = P::from_fields(&fields)?;
    debug!(rank = comm.group().rank(), ?params, "parameters received");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalGroup, Scalar};
    use crate::kernel::{AngleReduction, Integrand, IntervalParams, SeriesParams};
    use std::thread;

    #[test]
    fn test_every_worker_gets_identical_bits() {
        let params = SeriesParams::from_degrees(20, 61.7, AngleReduction::Periodic).unwrap();
        let mut comms = LocalGroup::create(4).unwrap().into_iter();
        let coordinator = comms.next().unwrap();

        let workers: Vec<_> = comms
            .map(|comm| thread::spawn(move || receive::<_, SeriesParams>(&comm).unwrap()))
            .collect();

        publish(&coordinator, &params).unwrap();

        for worker in workers {
            let copy = worker.join().unwrap();
            assert_eq!(copy.radians().to_bits(), params.radians().to_bits());
            assert_eq!(copy, params);
        }
    }

    #[test]
    fn test_fields_matched_by_tag_not_arrival() {
        let comms = LocalGroup::create(2).unwrap();
        let params = IntervalParams::new(-1.5, 4.0, 256, Integrand::Cube).unwrap();

        for (index, value) in params.to_fields().into_iter().enumerate().rev() {
            comms[0].send(1, field_tag(index), value).unwrap();
        }

        assert_eq!(receive::<_, IntervalParams>(&comms[1]).unwrap(), params);
    }

    #[test]
    fn test_single_rank_group_sends_nothing() {
        let comms = LocalGroup::create(1).unwrap();
        let params = IntervalParams::new(0.0, 1.0, 8, Integrand::Square).unwrap();
        publish(&comms[0], &params).unwrap();

        // Nothing was queued: the self-addressed message is the first one seen.
        comms[0].send(0, field_tag(0), Scalar::Int(-1)).unwrap();
        assert_eq!(comms[0].recv(0, field_tag(0)).unwrap(), Scalar::Int(-1));
    }
}

//! MPI runtime, enabled with the `mpi` feature.
//!
//! Run with: `mpirun -np 4 cosine-mpi --runtime mpi`

use mpi::environment::Universe;
use mpi::point_to_point::{Destination, Source};
use mpi::topology::{Communicator as _, SimpleCommunicator};
use tracing::trace;

use super::{Communicator, Scalar, Tag, SCALAR_BYTES};
use crate::error::{Error, Result};
use crate::group::{GroupDescriptor, Rank};

/// `MPI_COMM_WORLD` behind the [`Communicator`] contract.
///
/// Scalars travel as their 9-byte encoding so the kind survives the trip.
pub struct MpiComm {
    world: SimpleCommunicator,
    group: GroupDescriptor,
    // Finalizes MPI on drop; must outlive `world`.
    _universe: Universe,
}

impl MpiComm {
    pub fn init() -> Result<Self> {
        let universe = mpi::initialize().ok_or(Error::MpiUnavailable)?;
        let world = universe.world();
        let group = GroupDescriptor::new(world.rank() as Rank, world.size() as usize)?;
        Ok(Self {
            world,
            group,
            _universe: universe,
        })
    }
}

impl Communicator for MpiComm {
    fn group(&self) -> GroupDescriptor {
        self.group
    }

    fn send(&self, dest: Rank, tag: Tag, value: Scalar) -> Result<()> {
        self.group.member(dest)?;
        trace!(from = self.group.rank(), to = dest, tag, ?value, "send");
        let frame = value.to_bytes();
        self.world
            .process_at_rank(dest as i32)
            .send_with_tag(&frame[..], tag);
        Ok(())
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Scalar> {
        self.group.member(source)?;
        let mut frame = [0u8; SCALAR_BYTES];
        self.world
            .process_at_rank(source as i32)
            .receive_into_with_tag(&mut frame[..], tag);
        Scalar::from_bytes(&frame)
    }

    fn recv_any(&self, tag: Tag) -> Result<(Rank, Scalar)> {
        let mut frame = [0u8; SCALAR_BYTES];
        let status = self
            .world
            .any_process()
            .receive_into_with_tag(&mut frame[..], tag);
        Ok((status.source_rank() as Rank, Scalar::from_bytes(&frame)?))
    }
}

//! Process identity within the group.

use crate::error::{Error, Result};

/// Zero-based process identity
pub type Rank = usize;

/// Rank that coordinates the group
pub const COORDINATOR: Rank = 0;

/// The part a process plays in one computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Acquires input, broadcasts, reduces and reports
    Coordinator,
    /// Receives parameters and returns one partial
    Worker,
}

/// `(rank, size)` for the flat group a process belongs to.
///
/// Obtained once from the runtime at startup and passed by value to every
/// component that needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupDescriptor {
    rank: Rank,
    size: usize,
}

impl GroupDescriptor {
    pub fn new(rank: Rank, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        if rank >= size {
            return Err(Error::InvalidRank { rank, size });
        }
        Ok(Self { rank, size })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn role(&self) -> Role {
        if self.rank == COORDINATOR {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }

    /// Highest rank in the group
    pub fn last_rank(&self) -> Rank {
        self.size - 1
    }

    /// Every rank other than the coordinator, ascending
    pub fn workers(&self) -> impl Iterator<Item = Rank> {
        (COORDINATOR + 1)..self.size
    }

    /// Descriptor of another member of the same group
    pub fn member(&self, rank: Rank) -> Result<Self> {
        Self::new(rank, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_group() {
        assert!(matches!(GroupDescriptor::new(0, 0), Err(Error::EmptyGroup)));
    }

    #[test]
    fn test_rejects_rank_out_of_range() {
        assert!(matches!(
            GroupDescriptor::new(4, 4),
            Err(Error::InvalidRank { rank: 4, size: 4 })
        ));
    }

    #[test]
    fn test_roles() {
        assert_eq!(GroupDescriptor::new(0, 3).unwrap().role(), Role::Coordinator);
        assert_eq!(GroupDescriptor::new(1, 3).unwrap().role(), Role::Worker);
        assert_eq!(GroupDescriptor::new(0, 1).unwrap().role(), Role::Coordinator);
    }

    #[test]
    fn test_workers_excludes_coordinator() {
        let group = GroupDescriptor::new(2, 4).unwrap();
        assert_eq!(group.workers().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(GroupDescriptor::new(0, 1).unwrap().workers().count(), 0);
    }
}

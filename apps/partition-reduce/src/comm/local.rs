//! Threads runtime: all ranks live in this process.

use std::sync::Arc;

use tracing::trace;

use super::mailbox::Mailbox;
use super::{Communicator, Envelope, Scalar, Tag};
use crate::error::{Error, Result};
use crate::group::{GroupDescriptor, Rank};

/// Factory for an in-process group of `size` ranks
pub struct LocalGroup;

impl LocalGroup {
    /// One communicator per rank, index = rank.
    ///
    /// Each communicator is meant to be moved into its own thread.
    pub fn create(size: usize) -> Result<Vec<LocalComm>> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        let mailboxes: Arc<[Mailbox]> = (0..size).map(|_| Mailbox::default()).collect();
        (0..size)
            .map(|rank| {
                Ok(LocalComm {
                    group: GroupDescriptor::new(rank, size)?,
                    mailboxes: Arc::clone(&mailboxes),
                })
            })
            .collect()
    }
}

/// One rank's endpoint in a [`LocalGroup`]
#[derive(Debug)]
pub struct LocalComm {
    group: GroupDescriptor,
    mailboxes: Arc<[Mailbox]>,
}

impl Communicator for LocalComm {
    fn group(&self) -> GroupDescriptor {
        self.group
    }

    fn send(&self, dest: Rank, tag: Tag, value: Scalar) -> Result<()> {
        let mailbox = self.mailboxes.get(dest).ok_or(Error::InvalidRank {
            rank: dest,
            size: self.group.size(),
        })?;
        trace!(from = self.group.rank(), to = dest, tag, ?value, "send");
        mailbox.deliver(Envelope {
            source: self.group.rank(),
            tag,
            value,
        });
        Ok(())
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Scalar> {
        self.group.member(source)?;
        let envelope = self.mailboxes[self.group.rank()].take(Some(source), tag)?;
        trace!(at = self.group.rank(), from = source, tag, value = ?envelope.value, "recv");
        Ok(envelope.value)
    }

    fn recv_any(&self, tag: Tag) -> Result<(Rank, Scalar)> {
        let envelope = self.mailboxes[self.group.rank()].take(None, tag)?;
        trace!(at = self.group.rank(), from = envelope.source, tag, value = ?envelope.value, "recv");
        Ok((envelope.source, envelope.value))
    }
}

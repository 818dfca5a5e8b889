//! Per-rank inbox with MPI-style matching.

use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex, PoisonError};

use super::{Envelope, Tag};
use crate::error::{Error, Result};
use crate::group::Rank;

#[derive(Debug, Default)]
struct Inbox {
    queue: VecDeque<Envelope>,
    /// Peers whose link broke, with the reason
    failed: HashMap<Rank, String>,
}

/// Messages delivered to one rank, oldest first.
///
/// A receive takes the oldest envelope matching its `(source, tag)` filter,
/// which keeps per-pair FIFO order while letting other traffic wait. Once a
/// peer's link fails, receives that could only be satisfied by that peer
/// return [`Error::LinkFailed`] instead of blocking.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    inbox: Mutex<Inbox>,
    arrived: Condvar,
}

impl Mailbox {
    pub(crate) fn deliver(&self, envelope: Envelope) {
        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        inbox.queue.push_back(envelope);
        self.arrived.notify_all();
    }

    /// Mark the link to `peer` as broken and wake every waiting receive.
    pub(crate) fn fail(&self, peer: Rank, reason: String) {
        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        inbox.failed.entry(peer).or_insert(reason);
        self.arrived.notify_all();
    }

    /// Block until a matching envelope is queued. `source: None` matches any rank.
    ///
    /// Envelopes already queued are handed out even after their sender failed.
    /// A filter with no queued match fails as soon as its source (or, for
    /// `None`, any peer) has a broken link.
    pub(crate) fn take(&self, source: Option<Rank>, tag: Tag) -> Result<Envelope> {
        let matches = |env: &Envelope| env.tag == tag && source.map_or(true, |s| env.source == s);

        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(pos) = inbox.queue.iter().position(matches) {
                if let Some(envelope) = inbox.queue.remove(pos) {
                    return Ok(envelope);
                }
            }
            let broken = match source {
                Some(peer) => inbox.failed.get_key_value(&peer),
                None => inbox.failed.iter().min_by_key(|(peer, _)| **peer),
            };
            if let Some((&peer, reason)) = broken {
                return Err(Error::LinkFailed {
                    peer,
                    reason: reason.clone(),
                });
            }
            inbox = self
                .arrived
                .wait(inbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

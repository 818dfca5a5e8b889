//! TCP runtime: one OS process per rank, star topology around rank 0.
//!
//! ```text
//!            ┌──────────┐
//!            │  Rank 0  │  TcpHub::bind -> accept_workers
//!            └────┬─────┘
//!        ┌────────┼────────┐
//!   ┌────┴───┐┌───┴────┐┌──┴─────┐
//!   │ Rank 1 ││ Rank 2 ││ Rank 3 │  TcpComm::connect
//!   └────────┘└────────┘└────────┘
//! ```
//!
//! Wire frame: `tag: i32 LE` followed by the 9-byte [`Scalar`] encoding.
//! Workers open with a handshake frame announcing their rank. A reader thread
//! per link drains frames into the local mailbox, so receives match on
//! `(source, tag)` exactly as in the threads runtime.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::mailbox::Mailbox;
use super::{Communicator, Envelope, Scalar, Tag, SCALAR_BYTES};
use crate::error::{Error, Result};
use crate::group::{GroupDescriptor, Rank, COORDINATOR};

const FRAME_BYTES: usize = 4 + SCALAR_BYTES;

/// Tag of the rank announcement a worker sends right after connecting
const HELLO_TAG: Tag = -1;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_BACKOFF: Duration = Duration::from_millis(100);

fn write_frame(mut stream: &TcpStream, tag: Tag, value: Scalar) -> Result<()> {
    let mut frame = [0u8; FRAME_BYTES];
    frame[..4].copy_from_slice(&tag.to_le_bytes());
    frame[4..].copy_from_slice(&value.to_bytes());
    stream.write_all(&frame)?;
    Ok(())
}

/// Next frame, or `None` when the peer closed the link between frames
fn read_frame(mut stream: &TcpStream) -> Result<Option<(Tag, Scalar)>> {
    let mut frame = [0u8; FRAME_BYTES];
    match stream.read_exact(&mut frame) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let mut tag = [0u8; 4];
    tag.copy_from_slice(&frame[..4]);
    let mut body = [0u8; SCALAR_BYTES];
    body.copy_from_slice(&frame[4..]);

    Ok(Some((Tag::from_le_bytes(tag), Scalar::from_bytes(&body)?)))
}

/// Drain `stream` into `mailbox` until the peer hangs up.
///
/// A broken link (I/O error or undecodable frame) is recorded in the mailbox
/// so pending and later receives from `peer` fail instead of blocking.
fn spawn_reader(peer: Rank, stream: TcpStream, mailbox: Arc<Mailbox>) -> Result<()> {
    thread::Builder::new()
        .name(format!("link-rank-{peer}"))
        .spawn(move || loop {
            match read_frame(&stream) {
                Ok(Some((tag, value))) => mailbox.deliver(Envelope {
                    source: peer,
                    tag,
                    value,
                }),
                Ok(None) => {
                    debug!(peer, "link closed");
                    break;
                }
                Err(e) => {
                    warn!(peer, error = %e, "link failed");
                    mailbox.fail(peer, e.to_string());
                    break;
                }
            }
        })?;
    Ok(())
}

/// Rank 0's listening socket before the group is complete
pub struct TcpHub {
    listener: TcpListener,
    group: GroupDescriptor,
}

impl TcpHub {
    pub fn bind(addr: impl ToSocketAddrs, size: usize) -> Result<Self> {
        let group = GroupDescriptor::new(COORDINATOR, size)?;
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, group })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for every worker rank to connect and announce itself.
    pub fn accept_workers(self) -> Result<TcpComm> {
        let mailbox = Arc::new(Mailbox::default());
        let mut links = HashMap::new();

        while links.len() < self.group.size() - 1 {
            let (stream, addr) = self.listener.accept()?;
            stream.set_nodelay(true)?;

            let rank = match read_frame(&stream)? {
                Some((HELLO_TAG, Scalar::Int(rank))) => usize::try_from(rank)
                    .map_err(|_| Error::Handshake(format!("negative rank {rank} from {addr}")))?,
                other => {
                    return Err(Error::Handshake(format!(
                        "expected rank announcement from {addr}, got {other:?}"
                    )))
                }
            };
            if rank == COORDINATOR || rank >= self.group.size() {
                return Err(Error::Handshake(format!(
                    "{addr} announced rank {rank} in a group of {}",
                    self.group.size()
                )));
            }
            if links.contains_key(&rank) {
                return Err(Error::Handshake(format!("rank {rank} connected twice")));
            }

            debug!(rank, %addr, "worker connected");
            spawn_reader(rank, stream.try_clone()?, Arc::clone(&mailbox))?;
            links.insert(rank, Mutex::new(stream));
        }

        Ok(TcpComm {
            group: self.group,
            links,
            mailbox,
        })
    }
}

/// One rank's endpoint in a TCP group
pub struct TcpComm {
    group: GroupDescriptor,
    links: HashMap<Rank, Mutex<TcpStream>>,
    mailbox: Arc<Mailbox>,
}

impl TcpComm {
    /// Bootstrap this rank: rank 0 hosts the group at `addr` and waits for
    /// every worker, the others connect to it.
    pub fn establish(addr: &str, group: GroupDescriptor) -> Result<Self> {
        if group.rank() == COORDINATOR {
            let hub = TcpHub::bind(addr, group.size())?;
            debug!(addr = %hub.local_addr()?, workers = group.size() - 1, "waiting for workers");
            hub.accept_workers()
        } else {
            Self::connect(addr, group)
        }
    }

    /// Join the group hosted at `addr` as `group.rank()`.
    pub fn connect(addr: impl ToSocketAddrs + Clone, group: GroupDescriptor) -> Result<Self> {
        if group.rank() == COORDINATOR {
            return Err(Error::Handshake(
                "rank 0 hosts the group; bind a TcpHub instead".to_string(),
            ));
        }

        let stream = connect_with_retry(addr)?;
        stream.set_nodelay(true)?;
        write_frame(&stream, HELLO_TAG, Scalar::Int(group.rank() as i64))?;

        let mailbox = Arc::new(Mailbox::default());
        spawn_reader(COORDINATOR, stream.try_clone()?, Arc::clone(&mailbox))?;

        let mut links = HashMap::new();
        links.insert(COORDINATOR, Mutex::new(stream));
        Ok(Self {
            group,
            links,
            mailbox,
        })
    }
}

fn connect_with_retry(addr: impl ToSocketAddrs + Clone) -> Result<TcpStream> {
    let mut attempt = 1;
    loop {
        match TcpStream::connect(addr.clone()) {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < CONNECT_ATTEMPTS && e.kind() == ErrorKind::ConnectionRefused => {
                trace!(attempt, "coordinator not listening yet");
                attempt += 1;
                thread::sleep(CONNECT_BACKOFF);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

impl Communicator for TcpComm {
    fn group(&self) -> GroupDescriptor {
        self.group
    }

    fn send(&self, dest: Rank, tag: Tag, value: Scalar) -> Result<()> {
        if dest == self.group.rank() {
            self.mailbox.deliver(Envelope {
                source: dest,
                tag,
                value,
            });
            return Ok(());
        }
        let link = self.links.get(&dest).ok_or(Error::NoRoute {
            from: self.group.rank(),
            to: dest,
        })?;
        trace!(from = self.group.rank(), to = dest, tag, ?value, "send");
        let stream = link.lock().unwrap_or_else(PoisonError::into_inner);
        write_frame(&stream, tag, value)
    }

    fn recv(&self, source: Rank, tag: Tag) -> Result<Scalar> {
        self.group.member(source)?;
        Ok(self.mailbox.take(Some(source), tag)?.value)
    }

    fn recv_any(&self, tag: Tag) -> Result<(Rank, Scalar)> {
        let envelope = self.mailbox.take(None, tag)?;
        Ok((envelope.source, envelope.value))
    }
}

/// Half-closes every link so peers read a clean end of stream.
impl Drop for TcpComm {
    fn drop(&mut self) {
        for (peer, link) in &self.links {
            let stream = link.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = stream.shutdown(Shutdown::Write) {
                trace!(peer, error = %e, "shutdown on drop");
            }
        }
    }
}

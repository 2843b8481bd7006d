//! Rank-to-rank message passing for distributed pieces.
//!
//! Messages are contiguous byte buffers addressed by `(source, destination,
//! tag)`. Each call succeeds or fails as a whole. Three backends:
//!
//! * [`NoComm`]: a single rank talking to itself.
//! * [`LocalTransport`]: N ranks inside one process, one per thread.
//! * `MpiTransport` (feature `mpi-support`): one rank per MPI process.
//!
//! Tags at or above [`RESERVED_TAG_BASE`] are used by the collectives.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::mesh_error::MeshFlowError;

/// First tag reserved for collective operations.
pub const RESERVED_TAG_BASE: u16 = 0xFF00;
const GATHER_TAG: u16 = RESERVED_TAG_BASE;
const BROADCAST_TAG: u16 = RESERVED_TAG_BASE + 1;

/// Blocking point-to-point transport plus the two collectives the pipeline
/// needs.
pub trait Transport {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn send(&self, dest: usize, tag: u16, payload: &[u8]) -> Result<(), MeshFlowError>;

    /// Block until a message from `src` with `tag` arrives.
    fn receive(&self, src: usize, tag: u16) -> Result<Vec<u8>, MeshFlowError>;

    /// Collect one payload per rank on `root`, in rank order. Other ranks get
    /// `None`.
    fn gather(&self, root: usize, payload: &[u8]) -> Result<Option<Vec<Vec<u8>>>, MeshFlowError> {
        check_rank(root, self.size())?;
        if self.rank() != root {
            self.send(root, GATHER_TAG, payload)?;
            return Ok(None);
        }
        let mut out = Vec::with_capacity(self.size());
        for r in 0..self.size() {
            if r == root {
                out.push(payload.to_vec());
            } else {
                out.push(self.receive(r, GATHER_TAG)?);
            }
        }
        Ok(Some(out))
    }

    /// Every rank returns `root`'s `value`.
    fn broadcast_scalar(&self, root: usize, value: f64) -> Result<f64, MeshFlowError> {
        check_rank(root, self.size())?;
        if self.rank() == root {
            for r in (0..self.size()).filter(|&r| r != root) {
                self.send(r, BROADCAST_TAG, &value.to_le_bytes())?;
            }
            return Ok(value);
        }
        let bytes = self.receive(root, BROADCAST_TAG)?;
        let arr: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MeshFlowError::Transport(format!("scalar of {} bytes", bytes.len())))?;
        Ok(f64::from_le_bytes(arr))
    }
}

fn check_rank(rank: usize, size: usize) -> Result<(), MeshFlowError> {
    if rank >= size {
        return Err(MeshFlowError::InvalidRank { rank, size });
    }
    Ok(())
}

/// Serialize a value for the wire.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, MeshFlowError> {
    bincode::serialize(value).map_err(|e| MeshFlowError::Transport(e.to_string()))
}

/// Inverse of [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MeshFlowError> {
    bincode::deserialize(bytes).map_err(|e| MeshFlowError::Transport(e.to_string()))
}

/// Serial transport: rank 0 of 1.
#[derive(Debug, Default)]
pub struct NoComm {
    queue: Mutex<VecDeque<(u16, Vec<u8>)>>,
}

impl NoComm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dest: usize, tag: u16, payload: &[u8]) -> Result<(), MeshFlowError> {
        check_rank(dest, 1)?;
        self.queue.lock().push_back((tag, payload.to_vec()));
        Ok(())
    }

    fn receive(&self, src: usize, tag: u16) -> Result<Vec<u8>, MeshFlowError> {
        check_rank(src, 1)?;
        let mut q = self.queue.lock();
        let pos = q
            .iter()
            .position(|(t, _)| *t == tag)
            .ok_or_else(|| MeshFlowError::Transport(format!("no message with tag {tag}")))?;
        q.remove(pos)
            .map(|(_, m)| m)
            .ok_or_else(|| MeshFlowError::Transport(format!("no message with tag {tag}")))
    }
}

type Key = (usize, usize, u16); // (src, dst, tag)

type Mailbox = HashMap<Key, VecDeque<Vec<u8>>>;

struct Shared {
    size: usize,
    mailbox: Mutex<Mailbox>,
    arrived: Condvar,
}

/// One rank of an in-process group; move each handle to its own thread.
#[derive(Clone)]
pub struct LocalTransport {
    rank: usize,
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

impl LocalTransport {
    /// Handles for ranks `0..n`, sharing one mailbox.
    pub fn group(n: usize) -> Vec<LocalTransport> {
        let shared = Arc::new(Shared {
            size: n,
            mailbox: Mutex::new(HashMap::new()),
            arrived: Condvar::new(),
        });
        (0..n)
            .map(|rank| LocalTransport {
                rank,
                shared: Arc::clone(&shared),
                timeout: None,
            })
            .collect()
    }

    /// Fail receives that wait longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn pop(mailbox: &mut Mailbox, key: &Key) -> Option<Vec<u8>> {
        let queue = mailbox.get_mut(key)?;
        let msg = queue.pop_front();
        if queue.is_empty() {
            mailbox.remove(key);
        }
        msg
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn send(&self, dest: usize, tag: u16, payload: &[u8]) -> Result<(), MeshFlowError> {
        check_rank(dest, self.shared.size)?;
        self.shared
            .mailbox
            .lock()
            .entry((self.rank, dest, tag))
            .or_default()
            .push_back(payload.to_vec());
        self.shared.arrived.notify_all();
        Ok(())
    }

    fn receive(&self, src: usize, tag: u16) -> Result<Vec<u8>, MeshFlowError> {
        check_rank(src, self.shared.size)?;
        let key = (src, self.rank, tag);
        let mut mailbox = self.shared.mailbox.lock();
        loop {
            if let Some(msg) = Self::pop(&mut mailbox, &key) {
                return Ok(msg);
            }
            match self.timeout {
                Some(t) => {
                    if self.shared.arrived.wait_for(&mut mailbox, t).timed_out() {
                        return Self::pop(&mut mailbox, &key).ok_or_else(|| {
                            MeshFlowError::Transport(format!(
                                "rank {} timed out waiting for rank {src} (tag {tag})",
                                self.rank
                            ))
                        });
                    }
                }
                None => self.shared.arrived.wait(&mut mailbox),
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// One MPI process of `MPI_COMM_WORLD`.
    pub struct MpiTransport {
        _universe: Universe,
        world: SimpleCommunicator,
    }

    impl MpiTransport {
        /// Initialize MPI. Fails if it was already initialized.
        pub fn new() -> Result<Self, MeshFlowError> {
            let universe = mpi::initialize()
                .ok_or_else(|| MeshFlowError::Transport("MPI already initialized".into()))?;
            let world = universe.world();
            Ok(Self {
                _universe: universe,
                world,
            })
        }
    }

    impl Transport for MpiTransport {
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn send(&self, dest: usize, tag: u16, payload: &[u8]) -> Result<(), MeshFlowError> {
            check_rank(dest, self.size())?;
            self.world
                .process_at_rank(dest as i32)
                .send_with_tag(payload, i32::from(tag));
            Ok(())
        }

        fn receive(&self, src: usize, tag: u16) -> Result<Vec<u8>, MeshFlowError> {
            check_rank(src, self.size())?;
            let (msg, _status) = self
                .world
                .process_at_rank(src as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag));
            Ok(msg)
        }

        fn broadcast_scalar(&self, root: usize, value: f64) -> Result<f64, MeshFlowError> {
            check_rank(root, self.size())?;
            let mut v = value;
            self.world
                .process_at_rank(root as i32)
                .broadcast_into(&mut v);
            Ok(v)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiTransport;

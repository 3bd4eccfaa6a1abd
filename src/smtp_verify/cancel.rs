use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cancellation signal shared by the probes of one race.
///
/// Sessions register a handle on their socket; [`cancel`](Self::cancel)
/// shuts every registered socket down so a probe blocked on a read wakes up
/// instead of waiting for its timeout.
#[derive(Debug, Default)]
pub struct ProbeCancel {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    sockets: Mutex<HashMap<u64, TcpStream>>,
}

impl ProbeCancel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for stream in self.sockets().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Number of sockets currently registered.
    pub fn active(&self) -> usize {
        self.sockets().len()
    }

    pub(crate) fn register(self: &Arc<Self>, stream: &TcpStream) -> io::Result<Registration> {
        let handle = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut sockets = self.sockets();
            // checked under the lock so a concurrent cancel() cannot miss us
            if self.is_cancelled() {
                let _ = handle.shutdown(Shutdown::Both);
            }
            sockets.insert(id, handle);
        }
        Ok(Registration {
            id,
            owner: Arc::clone(self),
        })
    }

    fn sockets(&self) -> MutexGuard<'_, HashMap<u64, TcpStream>> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes the socket handle from its [`ProbeCancel`] when dropped.
#[derive(Debug)]
pub(crate) struct Registration {
    id: u64,
    owner: Arc<ProbeCancel>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.owner.sockets().remove(&self.id);
    }
}

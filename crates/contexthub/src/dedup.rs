//! Keyed write lock that collapses concurrent creates of the same resource.
//!
//! One task at a time may run the create operation for a given
//! (project, filename) key. Losers wait for the in-flight operation to settle
//! and then look the resource up instead of writing it a second time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// One logical create target: a filename within a project.
pub type WriteKey = (Uuid, String);

/// Map of in-flight create operations.
///
/// The check for an existing claim and the registration of a new one happen
/// under a single std-mutex acquisition with no await point in between, so two
/// tasks can never both become the writer for a key.
#[derive(Debug, Default)]
pub struct WriteLockMap {
    pending: Mutex<HashMap<WriteKey, watch::Receiver<bool>>>,
}

/// Outcome of [`WriteLockMap::claim`].
pub enum Claim<'a> {
    /// The caller is the writer for this key; the claim releases on drop.
    Writer(WriteClaim<'a>),
    /// Another task is writing this key; the receiver resolves when it
    /// settles.
    Waiter(watch::Receiver<bool>),
}

/// RAII handle held by the winning writer. Dropping it removes the key and
/// wakes every waiter, whichever path the operation exited through.
pub struct WriteClaim<'a> {
    locks: &'a WriteLockMap,
    key: WriteKey,
    // Dropped after the key is removed; waiters observe the closed channel.
    _settled: watch::Sender<bool>,
}

impl Drop for WriteClaim<'_> {
    fn drop(&mut self) {
        let mut pending = self
            .locks
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.remove(&self.key);
    }
}

impl WriteLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically either register the caller as the writer for `key` or hand
    /// back a waiter handle for the operation already in flight.
    pub fn claim(&self, key: WriteKey) -> Claim<'_> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = pending.get(&key) {
            return Claim::Waiter(rx.clone());
        }
        let (tx, rx) = watch::channel(false);
        pending.insert(key.clone(), rx);
        Claim::Writer(WriteClaim {
            locks: self,
            key,
            _settled: tx,
        })
    }

    /// Run `create` at most once concurrently per `key`.
    ///
    /// A caller that loses the claim race awaits the in-flight operation and
    /// then `probe`s for the resource it would have created; a hit is returned
    /// without a second write. When the probe comes up empty (the other writer
    /// failed), the caller competes for the claim again and creates itself.
    pub async fn create_once<O, E, Probe, PFut, Create, CFut>(
        &self,
        key: WriteKey,
        probe: Probe,
        create: Create,
    ) -> Result<O, E>
    where
        Probe: Fn() -> PFut,
        PFut: Future<Output = Result<Option<O>, E>>,
        Create: FnOnce() -> CFut,
        CFut: Future<Output = Result<O, E>>,
    {
        let claim = loop {
            match self.claim(key.clone()) {
                Claim::Writer(claim) => break claim,
                Claim::Waiter(mut settled) => {
                    debug!(project = %key.0, filename = %key.1, "create already in flight, waiting");
                    // The writer's sender closes when its operation settles.
                    let _ = settled.changed().await;
                    if let Some(existing) = probe().await? {
                        return Ok(existing);
                    }
                }
            }
        };
        let result = create().await;
        drop(claim);
        result
    }

    /// Number of keys currently claimed.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! In-process network for tests and single-process deployments.
//!
//! [`LocalNetwork`] routes calls by address string to registered
//! [`RpcHandler`]s and can inject the faults an adversarial network
//! produces: unreachable addresses, dropped calls and duplicated calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::NetError;
use crate::{RpcHandler, Transport};

/// Delivery statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    /// Calls handed to a handler.
    pub delivered: u64,
    /// Calls dropped by fault injection.
    pub dropped: u64,
    /// Calls to addresses that were down or unregistered.
    pub unreachable: u64,
}

/// In-memory RPC network.
pub struct LocalNetwork {
    handlers: RwLock<HashMap<String, Arc<dyn RpcHandler>>>,
    down: RwLock<HashSet<String>>,
    drop_next: AtomicU64,
    duplicate_next: AtomicU64,
    /// Probability of dropping any call, with its seeded RNG.
    drop_rate: f64,
    rng: Mutex<StdRng>,
    delivered: AtomicU64,
    dropped: AtomicU64,
    unreachable: AtomicU64,
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalNetwork {
    /// A network that delivers every call.
    pub fn new() -> Self {
        Self::lossy(0.0, 0)
    }

    /// A network that drops each call with probability `drop_rate`.
    pub fn lossy(drop_rate: f64, seed: u64) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            down: RwLock::new(HashSet::new()),
            drop_next: AtomicU64::new(0),
            duplicate_next: AtomicU64::new(0),
            drop_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            unreachable: AtomicU64::new(0),
        }
    }

    /// Route calls for `addr` to `handler`, replacing any previous handler.
    pub fn register(&self, addr: impl Into<String>, handler: Arc<dyn RpcHandler>) {
        self.handlers
            .write()
            .expect("handlers lock poisoned")
            .insert(addr.into(), handler);
    }

    /// Mark `addr` unreachable (`true`) or reachable again (`false`).
    pub fn set_down(&self, addr: &str, down: bool) {
        let mut set = self.down.write().expect("down lock poisoned");
        if down {
            set.insert(addr.to_string());
        } else {
            set.remove(addr);
        }
    }

    /// Drop the next `n` calls, whatever their destination.
    pub fn drop_next(&self, n: u64) {
        self.drop_next.store(n, Ordering::SeqCst);
    }

    /// Deliver each of the next `n` calls twice, returning the second reply.
    pub fn duplicate_next(&self, n: u64) {
        self.duplicate_next.store(n, Ordering::SeqCst);
    }

    pub fn stats(&self) -> NetStats {
        NetStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            unreachable: self.unreachable.load(Ordering::Relaxed),
        }
    }

    /// Decrement `counter` if positive; returns whether it was.
    fn take(counter: &AtomicU64) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn should_drop(&self) -> bool {
        if Self::take(&self.drop_next) {
            return true;
        }
        self.drop_rate > 0.0
            && self.rng.lock().expect("rng lock poisoned").random::<f64>() < self.drop_rate
    }

    fn route(&self, addr: &str) -> Result<Arc<dyn RpcHandler>, NetError> {
        if self.down.read().expect("down lock poisoned").contains(addr) {
            return Err(NetError::Unreachable(addr.to_string()));
        }
        self.handlers
            .read()
            .expect("handlers lock poisoned")
            .get(addr)
            .cloned()
            .ok_or_else(|| NetError::Unreachable(addr.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for LocalNetwork {
    async fn call(&self, addr: &str, method: u64, args: Vec<u8>) -> Result<Vec<u8>, NetError> {
        let handler = match self.route(addr) {
            Ok(h) => h,
            Err(e) => {
                self.unreachable.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        if self.should_drop() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(addr, method, "local network dropped call");
            return Err(NetError::Dropped);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if Self::take(&self.duplicate_next) {
            trace!(addr, method, "local network duplicated call");
            let _ = handler.handle(method, args.clone()).await;
        }
        Ok(handler.handle(method, args).await)
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("no pool configured for kind {0}")]
    NotConfigured(u32),
    #[error("pool for kind {0} exhausted (max size {1})")]
    Exhausted(u32, usize),
}

/// Lifecycle hooks for pooled instances. Acquire makes an instance
/// active/visible, release hides it again.
pub trait Poolable {
    fn on_acquire(&mut self) {}
    fn on_release(&mut self) {}
}

/// Sizing for one pool kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub kind: u32,
    pub default_capacity: usize,
    pub max_size: usize,
}

/// Index-based handle into a pool arena. Handles stay valid across
/// release, but `get` on a released handle returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    kind: u32,
    slot: u32,
}

impl PoolHandle {
    pub fn kind(&self) -> u32 {
        self.kind
    }
}

struct KindPool<T> {
    slots: Vec<T>,
    checked_out: Vec<bool>,
    free: Vec<u32>,
    max_size: usize,
}

/// Typed reusable-instance pool keyed by an integer kind.
///
/// Slots live in a fixed-growth arena per kind; the free list recycles
/// indices so acquire after prewarm never allocates.
pub struct ObjectPool<T> {
    kinds: HashMap<u32, KindPool<T>>,
    factory: Box<dyn Fn(u32) -> T + Send>,
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new(configs: &[PoolConfig], factory: Box<dyn Fn(u32) -> T + Send>) -> Self {
        let mut kinds = HashMap::new();
        for config in configs {
            kinds.insert(
                config.kind,
                KindPool {
                    slots: Vec::with_capacity(config.default_capacity),
                    checked_out: Vec::with_capacity(config.default_capacity),
                    free: Vec::new(),
                    max_size: config.max_size,
                },
            );
        }
        Self { kinds, factory }
    }

    /// Eagerly create up to `count` instances so first use does not
    /// allocate. Capped at the kind's max size.
    pub fn prewarm(&mut self, kind: u32, count: usize) -> Result<(), PoolError> {
        let pool = self.kinds.get_mut(&kind).ok_or(PoolError::NotConfigured(kind))?;
        let room = pool.max_size.saturating_sub(pool.slots.len());
        for _ in 0..count.min(room) {
            let slot = pool.slots.len() as u32;
            let mut instance = (self.factory)(kind);
            instance.on_release();
            pool.slots.push(instance);
            pool.checked_out.push(false);
            pool.free.push(slot);
        }
        debug!(kind, size = pool.slots.len(), "pool prewarmed");
        Ok(())
    }

    /// Check out an instance, activating it.
    pub fn acquire(&mut self, kind: u32) -> Result<PoolHandle, PoolError> {
        let pool = self.kinds.get_mut(&kind).ok_or(PoolError::NotConfigured(kind))?;
        let slot = match pool.free.pop() {
            Some(slot) => slot,
            None => {
                if pool.slots.len() >= pool.max_size {
                    return Err(PoolError::Exhausted(kind, pool.max_size));
                }
                let slot = pool.slots.len() as u32;
                pool.slots.push((self.factory)(kind));
                pool.checked_out.push(false);
                slot
            }
        };
        pool.checked_out[slot as usize] = true;
        pool.slots[slot as usize].on_acquire();
        Ok(PoolHandle { kind, slot })
    }

    /// Return an instance to the free set. Releasing a handle that is not
    /// checked out is a warned no-op; the free set is never corrupted.
    pub fn release(&mut self, handle: PoolHandle) {
        let Some(pool) = self.kinds.get_mut(&handle.kind) else {
            warn!(kind = handle.kind, "release for unconfigured pool kind ignored");
            return;
        };
        let slot = handle.slot as usize;
        if slot >= pool.slots.len() || !pool.checked_out[slot] {
            warn!(kind = handle.kind, slot, "double or stale release ignored");
            return;
        }
        pool.checked_out[slot] = false;
        pool.slots[slot].on_release();
        pool.free.push(handle.slot);
    }

    /// Access a checked-out instance. Released or foreign handles yield
    /// `None`.
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let pool = self.kinds.get(&handle.kind)?;
        let slot = handle.slot as usize;
        if *pool.checked_out.get(slot)? {
            pool.slots.get(slot)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let pool = self.kinds.get_mut(&handle.kind)?;
        let slot = handle.slot as usize;
        if *pool.checked_out.get(slot)? {
            pool.slots.get_mut(slot)
        } else {
            None
        }
    }

    /// Number of instances currently checked out for a kind.
    pub fn outstanding(&self, kind: u32) -> usize {
        self.kinds
            .get(&kind)
            .map(|p| p.checked_out.iter().filter(|&&c| c).count())
            .unwrap_or(0)
    }
}

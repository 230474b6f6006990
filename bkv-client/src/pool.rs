//! # Resource Pool
//!
//! Purpose: Manage a bounded set of expensive, stateful resources under
//! concurrent access with blocking, timeout-bounded acquisition.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep at most `max_size` resources alive,
//!    recycling idle ones across leases.
//! 2. **Minimal Locking**: Hold the mutex only to move resources between
//!    states; factory and destroyer callbacks run outside it.
//! 3. **Bounded Wait**: `acquire` parks on a condition variable with a
//!    deadline; callers never hang past the configured timeout.
//! 4. **RAII Leases**: A lease is a guard; every exit path (including
//!    panics) returns or destroys the resource exactly once.
//!
//! Resources are created lazily: the factory runs on demand during
//! acquisition, never at pool construction. Selection among idle resources
//! carries no ordering contract, and waiter wakeup is eventually fair only
//! in the sense that a wait is bounded by the acquire timeout.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

type Factory<R> = Box<dyn Fn() -> Option<R> + Send + Sync>;
type Destroyer<R> = Box<dyn Fn(R) + Send + Sync>;

struct PoolState<R> {
    idle: VecDeque<R>,
    /// Idle + leased resources, plus slots reserved for in-flight factory calls.
    total: usize,
    disposed: bool,
}

struct PoolInner<R> {
    state: Mutex<PoolState<R>>,
    available: Condvar,
    max_size: usize,
    acquire_timeout: Duration,
    factory: Factory<R>,
    destroyer: Destroyer<R>,
}

impl<R> Drop for PoolInner<R> {
    fn drop(&mut self) {
        // Runs after every guard is gone; destroys whatever dispose() did
        // not already see.
        let state = self.state.get_mut();
        for resource in state.idle.drain(..) {
            (self.destroyer)(resource);
        }
    }
}

/// Bounded pool of reusable resources.
///
/// Cloning yields another handle to the same pool.
pub struct ResourcePool<R> {
    inner: Arc<PoolInner<R>>,
}

impl<R> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        ResourcePool {
            inner: self.inner.clone(),
        }
    }
}

impl<R> ResourcePool<R> {
    /// Creates a pool that lends out at most `max_size` resources.
    ///
    /// The factory returns `None` when a resource cannot be created; the
    /// destroyer releases a resource's underlying handle.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero. A zero-sized pool is a programming
    /// error, not a runtime condition.
    pub fn new<F, D>(max_size: usize, acquire_timeout: Duration, factory: F, destroyer: D) -> Self
    where
        F: Fn() -> Option<R> + Send + Sync + 'static,
        D: Fn(R) + Send + Sync + 'static,
    {
        assert!(max_size > 0, "pool size must be at least 1");
        ResourcePool {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    idle: VecDeque::with_capacity(max_size),
                    total: 0,
                    disposed: false,
                }),
                available: Condvar::new(),
                max_size,
                acquire_timeout,
                factory: Box::new(factory),
                destroyer: Box::new(destroyer),
            }),
        }
    }

    /// Leases a resource, blocking up to the acquire timeout.
    ///
    /// Returns `None` when the timeout elapses, when the factory fails, or
    /// immediately once the pool has been disposed.
    pub fn acquire(&self) -> Option<PoolGuard<R>> {
        let deadline = Instant::now() + self.inner.acquire_timeout;
        let mut state = self.inner.state.lock();
        loop {
            if state.disposed {
                return None;
            }
            if let Some(resource) = state.idle.pop_front() {
                return Some(PoolGuard::new(self.inner.clone(), resource));
            }
            if state.total < self.inner.max_size {
                state.total += 1;
                drop(state);
                match (self.inner.factory)() {
                    Some(resource) => return Some(PoolGuard::new(self.inner.clone(), resource)),
                    None => {
                        let mut state = self.inner.state.lock();
                        state.total -= 1;
                        drop(state);
                        // A waiter may be parked on the slot this call held.
                        self.inner.available.notify_one();
                        return None;
                    }
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            let _ = self.inner.available.wait_until(&mut state, deadline);
        }
    }

    /// Leases a resource, runs `f` on it, and releases it.
    ///
    /// Returns `None` exactly when acquisition failed; `f`'s own outcome
    /// travels inside the returned value.
    pub fn consume<T>(&self, f: impl FnOnce(&mut PoolGuard<R>) -> T) -> Option<T> {
        let mut guard = self.acquire()?;
        Some(f(&mut guard))
    }

    /// Tears the pool down.
    ///
    /// Idle resources are destroyed immediately; leased resources are
    /// destroyed when their guards release them. Waiting acquirers are woken
    /// and fail fast. Idempotent.
    pub fn dispose(&self) {
        let drained: Vec<R> = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                Vec::new()
            } else {
                state.disposed = true;
                let drained: Vec<R> = state.idle.drain(..).collect();
                state.total -= drained.len();
                drained
            }
        };
        if !drained.is_empty() {
            tracing::trace!(count = drained.len(), "destroying idle pooled resources");
        }
        for resource in drained {
            (self.inner.destroyer)(resource);
        }
        self.inner.available.notify_all();
    }
}

/// RAII lease over a pooled resource.
///
/// Dropping the guard returns the resource to the pool, or destroys it when
/// the guard was invalidated or the pool was disposed in the interim.
pub struct PoolGuard<R> {
    inner: Arc<PoolInner<R>>,
    resource: Option<R>,
    recycle: bool,
}

impl<R> PoolGuard<R> {
    fn new(inner: Arc<PoolInner<R>>, resource: R) -> Self {
        PoolGuard {
            inner,
            resource: Some(resource),
            recycle: true,
        }
    }

    /// Marks the resource as unusable; it will be destroyed on release
    /// instead of recycled.
    pub fn invalidate(&mut self) {
        self.recycle = false;
    }
}

impl<R> Deref for PoolGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource.as_ref().expect("resource exists")
    }
}

impl<R> DerefMut for PoolGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource.as_mut().expect("resource exists")
    }
}

impl<R> Drop for PoolGuard<R> {
    fn drop(&mut self) {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => return,
        };

        let mut state = self.inner.state.lock();
        if state.disposed || !self.recycle {
            state.total -= 1;
            drop(state);
            (self.inner.destroyer)(resource);
        } else {
            state.idle.push_back(resource);
            drop(state);
        }
        self.inner.available.notify_one();
    }
}

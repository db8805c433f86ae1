//! Resource permits guarding scarce external resources.
//!
//! A [`ResourcePermit`] is a named bounded counter. Stages that declare a
//! permit acquire it before running in a parallel pipeline, so at most
//! `capacity` flows touch the resource at once.

use crate::error::{Error, Result};
use crate::observability::{record_permit_wait, record_permits_available};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A named bounded counting permit.
///
/// # Example
///
/// ```rust
/// use stagehand::permit::ResourcePermit;
///
/// let gpu = ResourcePermit::new("gpu", 2).unwrap();
/// {
///     let _guard = gpu.guard();
///     assert_eq!(gpu.available(), 1);
/// }
/// assert_eq!(gpu.available(), 2);
/// ```
pub struct ResourcePermit {
    name: String,
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl ResourcePermit {
    /// Create a permit with `capacity` units.
    ///
    /// Fails with [`Error::InvalidCapacity`] when `capacity` is zero.
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(Error::InvalidCapacity { name });
        }
        Ok(Self {
            name,
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        })
    }

    /// Create a permit already wrapped for sharing between stages.
    pub fn shared(name: impl Into<String>, capacity: usize) -> Result<Arc<Self>> {
        Self::new(name, capacity).map(Arc::new)
    }

    /// Get the permit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the total number of units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of units currently free.
    pub fn available(&self) -> usize {
        *self.state()
    }

    /// Get the number of units currently held.
    pub fn outstanding(&self) -> usize {
        self.capacity - self.available()
    }

    /// Block until a unit is free, then take it.
    ///
    /// There is no timeout: if holders never release, this waits forever.
    /// Use [`acquire_timeout`](Self::acquire_timeout) to bound the wait.
    pub fn acquire(&self) {
        let start = Instant::now();
        let mut available = self.state();
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        self.taken(*available, start);
    }

    /// Take a unit if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut available = self.state();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        record_permits_available(&self.name, *available);
        true
    }

    /// Block for at most `timeout` waiting for a free unit.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let mut available = self.state();
        while *available == 0 {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(Error::PermitTimeout {
                    name: self.name.clone(),
                });
            }
            let (guard, _) = self
                .released
                .wait_timeout(available, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            available = guard;
        }
        *available -= 1;
        self.taken(*available, start);
        Ok(())
    }

    /// Return a unit.
    ///
    /// Fails with [`Error::PermitOverflow`] if every unit is already free.
    pub fn release(&self) -> Result<()> {
        let mut available = self.state();
        if *available >= self.capacity {
            return Err(Error::PermitOverflow {
                name: self.name.clone(),
                capacity: self.capacity,
            });
        }
        *available += 1;
        record_permits_available(&self.name, *available);
        tracing::trace!(permit = %self.name, available = *available, "permit released");
        drop(available);
        self.released.notify_one();
        Ok(())
    }

    /// Acquire a unit and return a guard that releases it on drop.
    pub fn guard(&self) -> PermitGuard<'_> {
        self.acquire();
        PermitGuard { permit: self }
    }

    fn state(&self) -> MutexGuard<'_, usize> {
        self.available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn taken(&self, available: usize, since: Instant) {
        record_permit_wait(&self.name, since.elapsed());
        record_permits_available(&self.name, available);
        tracing::trace!(permit = %self.name, available, "permit acquired");
    }
}

impl std::fmt::Debug for ResourcePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePermit")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

impl std::fmt::Display for ResourcePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}/{} available)",
            self.name,
            self.available(),
            self.capacity
        )
    }
}

/// Holds one unit of a [`ResourcePermit`] until dropped.
#[must_use = "the permit is released as soon as the guard is dropped"]
pub struct PermitGuard<'a> {
    permit: &'a ResourcePermit,
}

impl PermitGuard<'_> {
    /// The permit this guard holds a unit of.
    pub fn permit(&self) -> &ResourcePermit {
        self.permit
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        // Paired with the acquire in `guard`; only a stray manual release
        // can leave the count at capacity here.
        if let Err(err) = self.permit.release() {
            tracing::warn!(permit = %self.permit.name, error = %err, "permit guard could not release");
        }
    }
}

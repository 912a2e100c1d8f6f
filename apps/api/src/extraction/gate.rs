//! Single-flight GPU gate.
//!
//! A counted permit pool around the accelerator. With one permit (the default) at most
//! one generation is in flight process-wide; more permits admit one caller per device.
//! The permit is an RAII guard, so it is returned on success, on error and on unwind.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate `{0}` is closed; the model has been released")]
    Closed(String),
}

#[derive(Clone)]
pub struct GpuGate {
    name: Arc<str>,
    permits: usize,
    semaphore: Arc<Semaphore>,
}

impl GpuGate {
    /// Creates a gate admitting `permits` concurrent holders (at least one).
    pub fn new(name: &str, permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            name: Arc::from(name),
            permits,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// One shared device: strict mutual exclusion.
    pub fn single(name: &str) -> Self {
        Self::new(name, 1)
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `f` while holding a permit. Only the future returned by `f` is inside the
    /// critical section; callers keep intake and persistence outside it.
    pub async fn with_exclusive_access<F, Fut, T>(&self, f: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let queued = Instant::now();
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GateError::Closed(self.name.to_string()))?;
        debug!(
            gate = %self.name,
            waited_ms = queued.elapsed().as_millis() as u64,
            available = self.available(),
            "gate acquired"
        );
        let output = f().await;
        debug!(gate = %self.name, "gate released");
        Ok(output)
    }

    /// Waits for every holder to finish, runs `f` with the whole pool, then closes the
    /// gate so later callers fail fast instead of touching a released device.
    pub async fn drain_and_close<F, Fut, T>(&self, f: F) -> Result<T, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _all = self
            .semaphore
            .acquire_many(self.permits as u32)
            .await
            .map_err(|_| GateError::Closed(self.name.to_string()))?;
        let output = f().await;
        self.semaphore.close();
        Ok(output)
    }
}

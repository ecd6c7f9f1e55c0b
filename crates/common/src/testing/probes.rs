//! Instrumented operations for exercising the resilience layer

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

/// Tracks how many operations run at once
///
/// Clones share counters, so one probe can be moved into many futures.
///
/// # Examples
///
/// ```
/// use taiga_mcp_common::testing::ConcurrencyProbe;
///
/// let probe = ConcurrencyProbe::new();
/// {
///     let _a = probe.enter();
///     let _b = probe.enter();
///     assert_eq!(probe.active(), 2);
/// }
/// assert_eq!(probe.active(), 0);
/// assert_eq!(probe.peak(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    entered: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as running until the guard is dropped
    pub fn enter(&self) -> ProbeGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.entered.fetch_add(1, Ordering::SeqCst);
        ProbeGuard { active: Arc::clone(&self.active) }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running operations seen
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }
}

/// Leaves the probe on drop
#[derive(Debug)]
pub struct ProbeGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Operation that fails a fixed number of times, then succeeds
#[derive(Debug, Clone)]
pub struct FlakyOperation {
    failures: u32,
    error: ApiError,
    calls: Arc<AtomicU32>,
}

impl FlakyOperation {
    pub fn new(failures: u32, error: ApiError) -> Self {
        Self { failures, error, calls: Arc::new(AtomicU32::new(0)) }
    }

    /// Returns the 1-based call number on success
    pub async fn call(&self) -> ApiResult<u32> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(self.error.clone())
        } else {
            Ok(call)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

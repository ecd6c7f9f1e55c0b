//! Testing utilities for code built on the resilience layer
//!
//! - [`ConcurrencyProbe`]: observes how many operations overlap
//! - [`FlakyOperation`]: fails a fixed number of times, then succeeds
//!
//! The clock abstraction lives in [`crate::resilience`] and is re-exported
//! here for convenience.

pub mod probes;

pub use probes::{ConcurrencyProbe, FlakyOperation, ProbeGuard};

pub use crate::resilience::{Clock, MockClock, SystemClock};

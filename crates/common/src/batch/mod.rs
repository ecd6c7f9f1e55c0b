//! Bounded-concurrency fan-out over many API calls
//!
//! [`BatchExecutor`] runs one operation per input (or per chunk of inputs)
//! with a semaphore-enforced ceiling on in-flight work, keeps every output
//! at the position of its input, and publishes [`BatchProgress`] snapshots
//! to an optional callback.

mod config;
mod executor;
mod progress;

pub use config::{BatchConfig, BatchConfigBuilder};
pub use executor::{BatchExecutor, ProgressCallback};
pub use progress::{BatchProgress, BatchResult};

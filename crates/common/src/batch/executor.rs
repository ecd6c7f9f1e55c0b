use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use super::config::BatchConfig;
use super::progress::{BatchProgress, BatchResult};
use crate::error::{ApiError, ApiResult, ConfigError};

/// Receives a progress snapshot before each item starts and after it finishes
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

struct ProgressTracker {
    progress: Mutex<BatchProgress>,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self { progress: Mutex::new(BatchProgress::new(total)), callback }
    }

    fn item_started(&self, index: usize) {
        let mut progress = self.progress.lock();
        progress.current_index = index;
        self.publish(&progress);
    }

    fn item_finished(&self, index: usize, success: bool) {
        let mut progress = self.progress.lock();
        progress.current_index = index;
        if success {
            progress.completed += 1;
        } else {
            progress.failed += 1;
        }
        self.publish(&progress);
    }

    // Runs under the progress lock so callbacks never interleave.
    fn publish(&self, progress: &BatchProgress) {
        if let Some(callback) = &self.callback {
            callback(*progress);
        }
    }
}

/// Runs an operation over many inputs with bounded concurrency
///
/// Operations are driven inside the caller's task; at most
/// `max_concurrency` of them hold a permit at any moment. Outputs keep the
/// position of their input regardless of completion order.
///
/// # Examples
///
/// ```rust
/// use taiga_mcp_common::batch::{BatchConfig, BatchExecutor};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = BatchExecutor::new(BatchConfig::builder().max_concurrency(4).build()?)?;
/// let result = executor.execute(vec![1, 2, 3], |n| async move { Ok(n * 2) }).await?;
/// assert_eq!(result.successful_results(), vec![&2, &4, &6]);
/// # Ok(())
/// # }
/// ```
pub struct BatchExecutor {
    config: BatchConfig,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("config", &self.config)
            .field("has_progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl BatchExecutor {
    /// Create an executor after validating `config`
    pub fn new(config: BatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, progress_callback: None })
    }

    /// Configuration this executor runs with
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Install the progress callback used by subsequent batches
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
    }

    /// Builder form of [`BatchExecutor::set_progress_callback`]
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.set_progress_callback(callback);
        self
    }

    /// Run `operation` once per item
    ///
    /// With `fail_fast` the first failure is returned as `Err`. Operations
    /// still in flight at that point are cancelled by being dropped, and
    /// items that have not started never run, so callers must not rely on
    /// side effects of the other items. Otherwise every outcome is kept in
    /// place and the call returns `Ok`.
    #[instrument(skip_all, fields(items = items.len(), max_concurrency = self.config.max_concurrency, fail_fast = self.config.fail_fast))]
    pub async fn execute<I, O, F, Fut>(
        &self,
        items: Vec<I>,
        operation: F,
    ) -> ApiResult<BatchResult<O>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = ApiResult<O>>,
    {
        let total = items.len();
        if total == 0 {
            return Ok(BatchResult::empty());
        }

        let semaphore = Semaphore::new(self.config.max_concurrency);
        let tracker = ProgressTracker::new(total, self.progress_callback.clone());
        let operation = &operation;

        let mut in_flight: FuturesUnordered<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let semaphore = &semaphore;
                let tracker = &tracker;
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return (index, Err(ApiError::unknown("batch semaphore closed")));
                    };
                    tracker.item_started(index);
                    let result = operation(item).await;
                    tracker.item_finished(index, result.is_ok());
                    (index, result)
                }
            })
            .collect();

        let mut slots: Vec<Option<ApiResult<O>>> =
            std::iter::repeat_with(|| None).take(total).collect();

        while let Some((index, result)) = in_flight.next().await {
            if self.config.fail_fast {
                if let Err(err) = &result {
                    warn!(index, error = %err, "Batch aborted on first failure");
                    return Err(err.clone());
                }
            }
            slots[index] = Some(result);
        }

        let results = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(ApiError::unknown("batch item produced no result")))
            })
            .collect();
        let batch = BatchResult::from_results(results);

        debug!(
            succeeded = batch.success_count(),
            failed = batch.failure_count(),
            "Batch finished"
        );
        Ok(batch)
    }

    /// Run `operation` once per contiguous chunk of `chunk_size` items
    ///
    /// Chunk outputs are flattened back to item positions. A failed chunk
    /// marks every one of its positions with the chunk's error, and a chunk
    /// returning the wrong number of outputs counts as a validation failure.
    #[instrument(skip_all, fields(items = items.len(), chunk_size = self.config.chunk_size))]
    pub async fn execute_chunked<I, O, F, Fut>(
        &self,
        items: Vec<I>,
        operation: F,
    ) -> ApiResult<BatchResult<O>>
    where
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = ApiResult<Vec<O>>>,
    {
        let chunk_size = self.config.chunk_size;
        let mut chunks = Vec::with_capacity(items.len().div_ceil(chunk_size));
        let mut remaining = items.into_iter();
        loop {
            let chunk: Vec<I> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            chunks.push(chunk);
        }

        let chunk_lengths: Vec<usize> = chunks.iter().map(Vec::len).collect();
        let operation = &operation;

        let chunk_batch = self
            .execute(chunks, |chunk: Vec<I>| {
                let expected = chunk.len();
                let pending = operation(chunk);
                async move {
                    let outputs = pending.await?;
                    if outputs.len() == expected {
                        Ok(outputs)
                    } else {
                        Err(ApiError::validation(format!(
                            "chunk operation returned {} results for {} items",
                            outputs.len(),
                            expected
                        )))
                    }
                }
            })
            .await?;

        let mut results = Vec::with_capacity(chunk_lengths.iter().sum());
        for (chunk_result, length) in chunk_batch.results.into_iter().zip(chunk_lengths) {
            match chunk_result {
                Ok(outputs) => results.extend(outputs.into_iter().map(Ok)),
                Err(err) => results.extend((0..length).map(|_| Err(err.clone()))),
            }
        }

        Ok(BatchResult::from_results(results))
    }
}

use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Immutable progress snapshot published to the progress callback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Index of the item most recently started or finished
    pub current_index: usize,
}

impl BatchProgress {
    /// Progress of a batch of `total` items before any has started
    pub fn new(total: usize) -> Self {
        Self { total, ..Self::default() }
    }

    /// Items that reached a terminal state
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    /// Percentage of processed items; zero for an empty batch
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed() as f64 * 100.0 / self.total as f64
    }

    /// True once every item reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.processed() == self.total
    }
}

/// Positional outcome of a batch
///
/// `results[i]` holds the outcome for input `i`; every failure also appears
/// in `errors` together with its index, in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T> {
    pub results: Vec<ApiResult<T>>,
    pub errors: Vec<(usize, ApiError)>,
}

impl<T> BatchResult<T> {
    /// Build a result from positional outcomes, deriving the error list
    pub fn from_results(results: Vec<ApiResult<T>>) -> Self {
        let errors = results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| result.as_ref().err().map(|err| (index, err.clone())))
            .collect();
        Self { results, errors }
    }

    /// Result of a batch with no items
    pub fn empty() -> Self {
        Self { results: Vec::new(), errors: Vec::new() }
    }

    /// Successful outputs in input order
    pub fn successful_results(&self) -> Vec<&T> {
        self.results.iter().filter_map(|result| result.as_ref().ok()).collect()
    }

    /// Number of items that succeeded
    pub fn success_count(&self) -> usize {
        self.results.len() - self.errors.len()
    }

    /// Number of items that failed
    pub fn failure_count(&self) -> usize {
        self.errors.len()
    }

    /// True when no item failed
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of items in the batch
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True for a batch with no items
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

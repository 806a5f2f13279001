//! Bounded-parallel task runner

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::errors::CliError;

/// In-flight limit when the caller sets none
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

/// Runs async work over a list of items with at most `max_in_flight`
/// futures active at once.
///
/// Failure policy: after the first failure no new items are started, work
/// already in flight is allowed to settle, then the first error is returned.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyRunner {
    max_in_flight: usize,
}

impl ConcurrencyRunner {
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            max_in_flight: max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT).max(1),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Run `work(index, item)` for every item. Results keep input order.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, work: F) -> Result<Vec<T>, CliError>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = Result<T, CliError>>,
    {
        let total = items.len();
        let failed = AtomicBool::new(false);
        let failed = &failed;
        let work = &work;

        let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<CliError> = None;
        let mut settled = 0usize;

        // the flag is checked before a future is created, so every created
        // future runs to completion
        let mut outcomes = stream::iter(items.into_iter().enumerate())
            .take_while(move |_| future::ready(!failed.load(Ordering::SeqCst)))
            .map(move |(index, item)| async move {
                let result = work(index, item).await;
                if result.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                (index, result)
            })
            .buffer_unordered(self.max_in_flight);

        while let Some((index, outcome)) = outcomes.next().await {
            settled += 1;
            match outcome {
                Ok(value) => results[index] = Some(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            debug!(
                "Runner stopped after a failure, {} of {} items not started",
                total - settled,
                total
            );
            return Err(e);
        }

        Ok(results.into_iter().flatten().collect())
    }
}

impl Default for ConcurrencyRunner {
    fn default() -> Self {
        Self::new(None)
    }
}

//! Fixed-delay scheduling of processing ticks.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::ReaderError;

/// Runs a task repeatedly until cancelled.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    cancel: CancellationToken,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler stopped by `cancel`.
    #[must_use]
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Get a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop issuing ticks. A running tick completes first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run `task` now and then `interval` after each completion.
    ///
    /// Non-fatal task errors are logged and the schedule continues. The
    /// task does blocking file and sink I/O, so it runs on a blocking-safe
    /// section of the worker; a multi-threaded runtime is required.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of `task`.
    pub async fn every<F>(&self, interval: Duration, mut task: F) -> Result<(), ReaderError>
    where
        F: FnMut() -> Result<(), ReaderError>,
    {
        let mut ticks: u64 = 0;
        while !self.cancel.is_cancelled() {
            ticks += 1;
            match tokio::task::block_in_place(&mut task) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    tracing::error!(error = %err, tick = ticks, "Processing failed, stopping");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(error = %err, tick = ticks, "Processing failed, retrying on next tick");
                }
            }

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        tracing::debug!(ticks, "Scheduler stopped");
        Ok(())
    }
}

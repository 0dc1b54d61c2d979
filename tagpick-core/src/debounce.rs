//! Debounced query pipeline
//!
//! Turns a stream of raw query-text changes into a stream of settled values.
//! A value is emitted only after no new input has arrived for the full
//! quiescence window; every new input resets the window. Dropping the
//! debouncer cancels any pending emission.

use crate::error::{PickerError, PickerResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Default quiescence window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Debounces raw query text into settled values
///
/// Owns a background task running the timer loop. Feed inputs with
/// [`submit`](Self::submit); settled values arrive on the receiver returned
/// by [`new`](Self::new). At most one value is emitted per quiescence
/// period, and it is always the most recent input at emission time.
#[derive(Debug)]
pub struct QueryDebouncer {
    input_tx: mpsc::UnboundedSender<String>,
    task: tokio::task::JoinHandle<()>,
}

impl QueryDebouncer {
    /// Start the debounce task with the given quiescence window
    ///
    /// Returns the debouncer handle and the receiver for settled values.
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel::<String>();

        let task = tokio::spawn(async move {
            let mut pending: Option<String> = None;
            let sleep = tokio::time::sleep(window);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    received = input_rx.recv() => {
                        match received {
                            Some(value) => {
                                // Newest input wins; restart the window
                                pending = Some(value);
                                sleep.as_mut().reset(Instant::now() + window);
                            }
                            // Handle dropped: discard any pending value
                            None => break,
                        }
                    }
                    _ = &mut sleep, if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            debug!(query = %value, "query settled");
                            if settled_tx.send(value).is_err() {
                                // Consumer gone, nothing left to do
                                break;
                            }
                        }
                    }
                }
            }
        });

        (Self { input_tx, task }, settled_rx)
    }

    /// Feed a raw input value into the pipeline
    pub fn submit(&self, value: impl Into<String>) -> PickerResult<()> {
        self.input_tx
            .send(value.into())
            .map_err(|_| PickerError::Pipeline("debounce task stopped".to_string()))
    }
}

impl Drop for QueryDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn coalesces_rapid_inputs_into_one_emission() {
        let start = Instant::now();
        let (debouncer, mut settled) = QueryDebouncer::new(Duration::from_millis(400));

        debouncer.submit("a").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit("al").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.submit("alp").unwrap();

        let value = settled.recv().await.unwrap();
        assert_eq!(value, "alp");
        assert!(start.elapsed() >= Duration::from_millis(600));

        // Nothing else was emitted for the burst
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn each_input_restarts_the_window() {
        let start = Instant::now();
        let (debouncer, mut settled) = QueryDebouncer::new(Duration::from_millis(400));

        debouncer.submit("a").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.submit("ab").unwrap();

        let value = settled.recv().await.unwrap();
        assert_eq!(value, "ab");
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn quiet_input_settles_after_one_window() {
        let (debouncer, mut settled) = QueryDebouncer::new(Duration::from_millis(400));

        debouncer.submit("beta").unwrap();
        let value = settled.recv().await.unwrap();
        assert_eq!(value, "beta");
        drop(debouncer);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn drop_before_window_emits_nothing() {
        let (debouncer, mut settled) = QueryDebouncer::new(Duration::from_millis(400));

        debouncer.submit("abandoned").unwrap();
        drop(debouncer);

        assert_eq!(settled.recv().await, None);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn submit_fails_once_the_task_is_gone() {
        let (debouncer, settled) = QueryDebouncer::new(Duration::from_millis(50));
        drop(settled);

        // Let the task notice the closed output side
        debouncer.submit("x").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert!(matches!(
            debouncer.submit("y"),
            Err(PickerError::Pipeline(_))
        ));
    }
}

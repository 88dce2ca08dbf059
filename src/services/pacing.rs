//! Cooperative waiting and cancellation.
//!
//! Every delay in the engine goes through a [`Pacer`], which races the delay against
//! the run's cancellation signal. "Poll until something appears" is expressed once,
//! as [`Pacer::await_condition`], instead of a hand-written loop at each call site.

use crate::services::inspector::InspectorError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Sending side of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation. The run stops at its next suspension point.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never be cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; never resolves if the handle is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected cancellation handle and token
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Result of a cancellable wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wait<T> {
    Satisfied(T),
    TimedOut,
    Cancelled,
}

impl<T> Wait<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Wait::Cancelled)
    }
}

/// Whether a pause ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Cancelled,
}

/// Delay and polling primitive bound to one run's cancellation signal.
#[derive(Debug, Clone)]
pub struct Pacer {
    cancel: CancelToken,
}

impl Pacer {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// A pacer that ignores cancellation, used while unwinding navigation
    pub fn uninterruptible() -> Self {
        Self::new(CancelToken::never())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for `duration`, waking early if the run is cancelled.
    pub async fn pause(&self, duration: Duration) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Cancelled;
        }
        if duration.is_zero() {
            return Flow::Continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => Flow::Continue,
            _ = self.cancel.cancelled() => Flow::Cancelled,
        }
    }

    /// Sleep for `duration` regardless of cancellation.
    pub async fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Poll `probe` up to `max_attempts` times, pausing `interval` between attempts.
    ///
    /// Resolves to the first `Some` value, `TimedOut` after the last attempt, or
    /// `Cancelled` as soon as cancellation is observed. Errors from the probe are
    /// propagated immediately.
    pub async fn await_condition<T, F, Fut>(
        &self,
        mut probe: F,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<Wait<T>, InspectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, InspectorError>>,
    {
        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return Ok(Wait::Cancelled);
            }

            if let Some(value) = probe().await? {
                return Ok(Wait::Satisfied(value));
            }

            if attempt < max_attempts && self.pause(interval).await == Flow::Cancelled {
                return Ok(Wait::Cancelled);
            }
        }

        Ok(Wait::TimedOut)
    }

    /// Like [`await_condition`](Self::await_condition) for boolean probes.
    pub async fn await_true<F, Fut>(
        &self,
        mut probe: F,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<Wait<()>, InspectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, InspectorError>>,
    {
        self.await_condition(
            || {
                let fut = probe();
                async move { fut.await.map(|ready| ready.then_some(())) }
            },
            interval,
            max_attempts,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_await_condition_satisfied_on_third_attempt() {
        let (_handle, token) = cancellation();
        let pacer = Pacer::new(token);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let outcome = pacer
            .await_condition(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok::<_, InspectorError>((n == 3).then_some(n)) }
                },
                Duration::from_millis(500),
                5,
            )
            .await
            .unwrap();

        assert_eq!(outcome, Wait::Satisfied(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_condition_times_out_after_max_attempts() {
        let pacer = Pacer::uninterruptible();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let outcome: Wait<()> = pacer
            .await_condition(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, InspectorError>(None) }
                },
                Duration::from_millis(100),
                4,
            )
            .await
            .unwrap();

        assert_eq!(outcome, Wait::TimedOut);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_pause() {
        let (handle, token) = cancellation();
        let pacer = Pacer::new(token);

        let canceller = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let flow = pacer.pause(Duration::from_secs(3600)).await;
        assert_eq!(flow, Flow::Cancelled);
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_probe() {
        let (handle, token) = cancellation();
        handle.cancel();
        let pacer = Pacer::new(token);

        let outcome = pacer
            .await_true(
                || async { Ok::<_, InspectorError>(true) },
                Duration::from_millis(1),
                3,
            )
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_errors_propagate() {
        let pacer = Pacer::uninterruptible();
        let result: Result<Wait<()>, _> = pacer
            .await_condition(
                || async { Err::<Option<()>, _>(InspectorError::Detached("tab closed".to_string())) },
                Duration::from_millis(1),
                3,
            )
            .await;

        assert!(matches!(result, Err(InspectorError::Detached(_))));
    }

    #[test]
    fn test_never_token_is_not_cancelled() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());

        let mut wait = tokio_test::task::spawn(async move { token.cancelled().await });
        tokio_test::assert_pending!(wait.poll());
    }

    #[test]
    fn test_cancelled_wakes_on_cancel() {
        let (handle, token) = cancellation();
        let mut wait = tokio_test::task::spawn(async move { token.cancelled().await });

        tokio_test::assert_pending!(wait.poll());
        handle.cancel();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }
}

//! Callback execution
//!
//! The timer loop only sees [`Invoker`]: one method that runs the callback to
//! completion and reports how it went. Two adapters cover plain closures and
//! closures returning a future.

use std::future::Future;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::{BoxError, CallbackError};
use crate::timing::clock::Instant;

/// Runs a timer callback exactly once per call
///
/// `invoke` must not resolve until the callback has fully finished,
/// successfully or not. The timer relies on this for non-overlap.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self) -> Result<(), CallbackError>;
}

/// Adapter for callbacks that complete immediately
///
/// Panics are caught and reported as [`CallbackError::Panicked`].
pub struct SyncInvoker<F, E> {
    callback: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> SyncInvoker<F, E>
where
    F: Fn() -> Result<(), E> + Send + Sync,
    E: Into<BoxError>,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _error: PhantomData,
        }
    }
}

#[async_trait]
impl<F, E> Invoker for SyncInvoker<F, E>
where
    F: Fn() -> Result<(), E> + Send + Sync,
    E: Into<BoxError>,
{
    async fn invoke(&self) -> Result<(), CallbackError> {
        match catch_unwind(AssertUnwindSafe(|| (self.callback)())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CallbackError::failed(err)),
            Err(payload) => Err(CallbackError::from_panic(payload)),
        }
    }
}

/// Adapter for callbacks that must be awaited
///
/// The returned future is awaited inline on the timer's own task. Panics,
/// whether raised by the closure or while polling its future, are caught
/// and reported as [`CallbackError::Panicked`].
pub struct AsyncInvoker<F, Fut, E> {
    callback: F,
    _future: PhantomData<fn() -> (Fut, E)>,
}

impl<F, Fut, E> AsyncInvoker<F, Fut, E>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError>,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, E> Invoker for AsyncInvoker<F, Fut, E>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError>,
{
    async fn invoke(&self) -> Result<(), CallbackError> {
        let call = AssertUnwindSafe(async { (self.callback)().await }).catch_unwind();
        match call.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CallbackError::failed(err)),
            Err(payload) => Err(CallbackError::from_panic(payload)),
        }
    }
}

/// Record of one completed invocation
#[derive(Debug)]
pub struct Invocation {
    /// Tick index the invocation ran for
    pub tick: u64,
    pub started_at: Instant,
    /// Completion instant, or the failure instant for a failed callback
    pub completed_at: Instant,
    pub result: Result<(), CallbackError>,
}

impl Invocation {
    pub fn duration(&self) -> Duration {
        self.completed_at.saturating_duration_since(self.started_at)
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sync_invoker_runs_callback_once() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let invoker = SyncInvoker::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<(), std::io::Error>(())
        });

        invoker.invoke().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_invoker_reports_error() {
        let invoker = SyncInvoker::new(|| Err("backend unavailable"));

        let err = invoker.invoke().await.unwrap_err();
        assert!(!err.is_panic());
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_sync_invoker_catches_panic() {
        let invoker = SyncInvoker::new(|| -> Result<(), BoxError> { panic!("tick exploded") });

        let err = invoker.invoke().await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("tick exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_invoker_waits_for_completion() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let invoker = AsyncInvoker::new(move || {
            let count = count_clone.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                count.fetch_add(1, Ordering::SeqCst);
                Ok::<(), std::io::Error>(())
            }
        });

        let start = Instant::now();
        invoker.invoke().await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(Instant::now() - start >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_async_invoker_reports_error() {
        let invoker = AsyncInvoker::new(|| async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "timed out"))
        });

        let err = invoker.invoke().await.unwrap_err();
        assert!(!err.is_panic());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_invoker_catches_panic_after_await() {
        let explode = true;
        let invoker = AsyncInvoker::new(move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if explode {
                panic!("lost connection mid-tick");
            }
            Ok::<(), BoxError>(())
        });

        let err = invoker.invoke().await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("lost connection mid-tick"));

        // the invoker stays usable after a caught panic
        assert!(invoker.invoke().await.unwrap_err().is_panic());
    }

    #[tokio::test]
    async fn test_async_invoker_catches_panic_in_closure() {
        let invoker = AsyncInvoker::new(|| -> std::future::Ready<Result<(), BoxError>> {
            panic!("could not build request")
        });

        let err = invoker.invoke().await.unwrap_err();
        assert!(err.is_panic());
        assert!(err.to_string().contains("could not build request"));
    }

    #[test]
    fn test_invocation_duration() {
        let start = Instant::now();
        let invocation = Invocation {
            tick: 3,
            started_at: start,
            completed_at: start + Duration::from_millis(120),
            result: Ok(()),
        };

        assert!(invocation.is_ok());
        assert_eq!(invocation.duration(), Duration::from_millis(120));
    }
}

//! Cooperative cancellation primitives.
//!
//! A [`CancelSource`] holds a shared stop flag; [`CancelToken`]s are
//! cheap handles that async fragments check at logical suspension
//! points. Cancellation is cooperative only: it never unwinds a commit
//! that has already happened.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use thiserror::Error;

/// Failure of an asynchronous effect.
///
/// Cancellation is a distinguished variant so retry loops and callers can
/// tell it apart from ordinary effect failures.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("async effect cancelled")]
    Cancelled,

    #[error("async effect failed: {0}")]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl EffectError {
    /// Whether this error is the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EffectError::Cancelled)
    }
}

/// Shared stop flag. The only object in the crate touched across
/// threads; access is relaxed atomic.
///
/// # Example
///
/// ```rust
/// use flywheel::cancel::CancelSource;
///
/// let source = CancelSource::new();
/// let token = source.token();
/// assert!(!token.stop_requested());
///
/// source.request_stop();
/// assert!(token.stop_requested());
///
/// source.reset();
/// assert!(!token.stop_requested());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelSource {
    stop: Arc<AtomicBool>,
}

impl CancelSource {
    /// Create a source with the flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Clear the flag for reuse.
    pub fn reset(&self) {
        self.stop.store(false, Ordering::Relaxed);
    }

    /// A cheap token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            stop: Some(Arc::clone(&self.stop)),
        }
    }
}

/// Cheap read-only handle to a [`CancelSource`].
///
/// The default token is detached: it never reports a stop request.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    stop: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// A token attached to no source; `stop_requested` is always false.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Relaxed))
    }
}

/// Fail with [`EffectError::Cancelled`] when the token has observed a
/// stop request.
pub fn throw_if_cancelled(token: &CancelToken) -> Result<(), EffectError> {
    if token.stop_requested() {
        Err(EffectError::Cancelled)
    } else {
        Ok(())
    }
}

/// Awaitable cancellation check.
///
/// Resolves without suspending: `Err(Cancelled)` when cancellation is
/// already requested, `Ok(())` otherwise. Fragments sprinkle
/// `cancelled(token).await?` at their logical suspension points.
pub fn cancelled(token: CancelToken) -> CancellationCheck {
    CancellationCheck { token }
}

/// Future returned by [`cancelled`].
pub struct CancellationCheck {
    token: CancelToken,
}

impl Future for CancellationCheck {
    type Output = Result<(), EffectError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        Poll::Ready(throw_if_cancelled(&self.token))
    }
}

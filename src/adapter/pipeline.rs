//! Async effect pipelines.
//!
//! A pipeline is a sequence of fragments bound to one `(from, to)` pair.
//! Fragments run in declaration order after the base commit; the final
//! output is the last `Some` any fragment produced (a later `None` does
//! not erase an earlier `Some`). `retry` folds the sequence built so far
//! into a single looping fragment.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::adapter::AsyncAdapter;
use crate::cancel::{CancelToken, EffectError};
use crate::core::State;

/// What one fragment resolves to: an optional output, or a failure
/// (including cancellation).
pub type FragmentOutput<O> = Result<Option<O>, EffectError>;

/// A stored pipeline fragment.
///
/// Fragments borrow the event, context, and publisher for the duration of
/// one invocation and return a boxed future tied to those borrows.
pub type Fragment<E, O, C, P> = Arc<
    dyn for<'a> Fn(&'a E, &'a mut C, CancelToken, &'a mut P) -> BoxFuture<'a, FragmentOutput<O>>
        + Send
        + Sync,
>;

/// Fluent pipeline declaration for one `(from, to)` binding.
///
/// Obtained from
/// [`AsyncAdapter::from`](crate::adapter::AsyncAdapter::from); `attach`
/// composes the accumulated fragments and registers the binding.
pub struct PipelineBuilder<'b, S: State, E, O, C, P> {
    adapter: &'b mut AsyncAdapter<S, E, O, C, P>,
    from: S,
    to: S,
    fragments: Vec<Fragment<E, O, C, P>>,
}

impl<'b, S, E, O, C, P> PipelineBuilder<'b, S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + Send + Sync + 'static,
    O: Send + 'static,
    C: Send + 'static,
    P: Send + 'static,
{
    pub(crate) fn new(adapter: &'b mut AsyncAdapter<S, E, O, C, P>, from: S, to: S) -> Self {
        Self {
            adapter,
            from,
            to,
            fragments: Vec::new(),
        }
    }

    /// Append an async effect that produces no output.
    pub fn await_fn<F>(mut self, effect: F) -> Self
    where
        F: for<'a> Fn(
                &'a E,
                &'a mut C,
                CancelToken,
                &'a mut P,
            ) -> BoxFuture<'a, Result<(), EffectError>>
            + Send
            + Sync
            + 'static,
    {
        self.fragments.push(Arc::new(move |event, ctx, token, publisher| {
            let fut = effect(event, ctx, token, publisher);
            Box::pin(async move {
                fut.await?;
                Ok(None)
            })
        }));
        self
    }

    /// Append an async effect that may produce an output.
    pub fn then<F>(mut self, effect: F) -> Self
    where
        F: for<'a> Fn(&'a E, &'a mut C, CancelToken, &'a mut P) -> BoxFuture<'a, FragmentOutput<O>>
            + Send
            + Sync
            + 'static,
    {
        self.fragments.push(Arc::new(effect));
        self
    }

    /// Append a synchronous step that produces a required output.
    pub fn emit<F>(mut self, effect: F) -> Self
    where
        F: Fn(&E, &mut C, &mut P) -> O + Send + Sync + 'static,
    {
        self.fragments.push(Arc::new(move |event, ctx, _token, publisher| {
            let value = effect(event, ctx, publisher);
            Box::pin(async move { Ok(Some(value)) })
        }));
        self
    }

    /// Fold the fragments declared so far into a retry loop.
    ///
    /// Runs the inner sequence up to `attempts` times; an attempt that
    /// yields `Some` ends the loop with that output. `backoff` runs
    /// between attempts. Observing a stop request between steps or
    /// attempts resolves the whole fragment to `Ok(None)`.
    pub fn retry<F>(mut self, attempts: u32, backoff: F) -> Self
    where
        F: for<'a> Fn(
                u32,
                &'a E,
                &'a mut C,
                CancelToken,
                &'a mut P,
            ) -> BoxFuture<'a, Result<(), EffectError>>
            + Send
            + Sync
            + 'static,
    {
        let sequence: Arc<[Fragment<E, O, C, P>]> = self.fragments.drain(..).collect();
        let backoff = Arc::new(backoff);
        self.fragments.push(Arc::new(move |event, ctx, token, publisher| {
            let sequence = Arc::clone(&sequence);
            let backoff = Arc::clone(&backoff);
            Box::pin(async move {
                for attempt in 1..=attempts {
                    let mut result = None;
                    for step in sequence.iter() {
                        if let Some(value) =
                            step(event, &mut *ctx, token.clone(), &mut *publisher).await?
                        {
                            result = Some(value);
                        }
                        if token.stop_requested() {
                            return Ok(None);
                        }
                    }
                    if result.is_some() {
                        return Ok(result);
                    }
                    if attempt < attempts {
                        backoff(attempt, event, &mut *ctx, token.clone(), &mut *publisher).await?;
                    }
                    if token.stop_requested() {
                        return Ok(None);
                    }
                }
                Ok(None)
            })
        }));
        self
    }

    /// Compose the fragment sequence and register the binding.
    pub fn attach(self) {
        let fragments = Arc::new(self.fragments);
        let composed: Fragment<E, O, C, P> = Arc::new(move |event, ctx, token, publisher| {
            let fragments = Arc::clone(&fragments);
            Box::pin(async move {
                let mut output = None;
                for fragment in fragments.iter() {
                    if let Some(value) =
                        fragment(event, &mut *ctx, token.clone(), &mut *publisher).await?
                    {
                        output = Some(value);
                    }
                    if token.stop_requested() {
                        break;
                    }
                }
                Ok(output)
            })
        });
        self.adapter.register(self.from, self.to, composed);
    }
}

//! Async effect adapter.
//!
//! The adapter overlays per-`(from, to)` asynchronous pipelines on a
//! built [`Machine`]. The base machine commits the selected transition
//! synchronously, so any observer that inspects state between suspension
//! points already sees the post-commit state; only then does the user's
//! composed effect run and, if it produces an output, override the
//! commit's.
//!
//! The adapter is single-threaded cooperative: suspensions occur only at
//! awaits inside user fragments, and two concurrent `dispatch_async`
//! calls on one adapter are not supported.

mod pipeline;

pub use pipeline::{Fragment, FragmentOutput, PipelineBuilder};

use std::collections::HashMap;
use std::marker::PhantomData;

use futures::future::BoxFuture;
use tracing::debug;

use crate::cancel::{CancelSource, CancelToken, EffectError};
use crate::core::{Alternative, State};
use crate::machine::{Machine, NullPublisher};

/// Async overlay over a built machine.
///
/// Owns the machine; use [`machine`](Self::machine) /
/// [`machine_mut`](Self::machine_mut) for direct access and
/// [`into_machine`](Self::into_machine) to unwrap it.
pub struct AsyncAdapter<S: State, E, O, C = (), P = NullPublisher> {
    machine: Machine<S, E, O, C, P>,
    registry: HashMap<(S, S), Vec<Fragment<E, O, C, P>>>,
    cancel: Option<CancelSource>,
}

impl<S, E, O, C, P> AsyncAdapter<S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + Send + Sync + 'static,
    O: Send + 'static,
    C: Send + 'static,
    P: Send + 'static,
{
    /// Wrap a machine with no cancel source; tokens handed to fragments
    /// are detached.
    pub fn new(machine: Machine<S, E, O, C, P>) -> Self {
        Self {
            machine,
            registry: HashMap::new(),
            cancel: None,
        }
    }

    /// Wrap a machine, observing `source` for cancellation.
    pub fn with_cancel(machine: Machine<S, E, O, C, P>, source: &CancelSource) -> Self {
        Self {
            machine,
            registry: HashMap::new(),
            cancel: Some(source.clone()),
        }
    }

    /// The token fragments receive on each `dispatch_async`.
    pub fn token(&self) -> CancelToken {
        self.cancel
            .as_ref()
            .map(CancelSource::token)
            .unwrap_or_default()
    }

    /// The wrapped machine.
    pub fn machine(&self) -> &Machine<S, E, O, C, P> {
        &self.machine
    }

    /// Exclusive access to the wrapped machine.
    pub fn machine_mut(&mut self) -> &mut Machine<S, E, O, C, P> {
        &mut self.machine
    }

    /// Unwrap the machine, dropping all bindings.
    pub fn into_machine(self) -> Machine<S, E, O, C, P> {
        self.machine
    }

    /// Bind a single async fragment to `(from, to)`.
    ///
    /// Only the first binding per pair runs on dispatch; use the fluent
    /// surface to compose multi-fragment pipelines.
    pub fn bind_async<F>(&mut self, from: S, to: S, fragment: F)
    where
        F: for<'a> Fn(&'a E, &'a mut C, CancelToken, &'a mut P) -> BoxFuture<'a, FragmentOutput<O>>
            + Send
            + Sync
            + 'static,
    {
        self.register(from, to, std::sync::Arc::new(fragment));
    }

    pub(crate) fn register(&mut self, from: S, to: S, fragment: Fragment<E, O, C, P>) {
        self.registry.entry((from, to)).or_default().push(fragment);
    }

    /// Start a fluent pipeline declaration from `state`.
    pub fn from(&mut self, state: S) -> EffectFrom<'_, S, E, O, C, P> {
        EffectFrom {
            adapter: self,
            from: state,
        }
    }

    /// Dispatch one event, running the bound async pipeline if any.
    ///
    /// Selection and the base commit (exit hook, action, state change,
    /// enter hook, completions, deferral drain) happen synchronously
    /// before the first suspension of the effect. The effect's `Some`
    /// output overrides the commit's; cancellation and effect failures
    /// surface as `Err`, with the state already advanced.
    pub async fn dispatch_async(&mut self, event: E) -> Result<Option<O>, EffectError> {
        let selection = self.machine.select(&event);
        let Some(transition) = selection.transition() else {
            return Ok(None);
        };

        let from = self.machine.state().clone();
        let to = transition.to.clone();
        let action = self
            .registry
            .get(&(from.clone(), to.clone()))
            .and_then(|pipelines| pipelines.first())
            .cloned();

        let Some(action) = action else {
            return Ok(self.machine.commit(&selection, Some(&event)));
        };

        let completion_out = self.machine.commit(&selection, Some(&event));
        debug!(from = from.name(), to = to.name(), "async effect started");

        self.machine.begin_async_effect();
        let token = self.token();
        let (ctx, publisher) = self.machine.context_publisher_mut();
        let result = action(&event, ctx, token, publisher).await;
        self.machine.end_async_effect();

        match result {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => Ok(completion_out),
            Err(err) => {
                if err.is_cancelled() {
                    debug!(state = self.machine.state().name(), "async effect cancelled");
                }
                Err(err)
            }
        }
    }
}

/// Start of a fluent pipeline declaration: the source state.
pub struct EffectFrom<'b, S: State, E, O, C, P> {
    adapter: &'b mut AsyncAdapter<S, E, O, C, P>,
    from: S,
}

impl<'b, S, E, O, C, P> EffectFrom<'b, S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + Send + Sync + 'static,
    O: Send + 'static,
    C: Send + 'static,
    P: Send + 'static,
{
    /// Name the event alternative this pipeline documents itself against.
    ///
    /// Bindings key on `(from, to)` alone; the alternative is part of the
    /// declaration for readability and symmetry with the builder surface.
    pub fn on<T: Alternative<E>>(self) -> EffectOn<'b, T, S, E, O, C, P> {
        EffectOn {
            adapter: self.adapter,
            from: self.from,
            _alternative: PhantomData,
        }
    }
}

/// Middle of a fluent pipeline declaration.
pub struct EffectOn<'b, T, S: State, E, O, C, P> {
    adapter: &'b mut AsyncAdapter<S, E, O, C, P>,
    from: S,
    _alternative: PhantomData<T>,
}

impl<'b, T, S, E, O, C, P> EffectOn<'b, T, S, E, O, C, P>
where
    T: Alternative<E>,
    S: State + 'static,
    E: Clone + Send + Sync + 'static,
    O: Send + 'static,
    C: Send + 'static,
    P: Send + 'static,
{
    /// Name the destination state and open the pipeline.
    pub fn to(self, to: S) -> PipelineBuilder<'b, S, E, O, C, P> {
        PipelineBuilder::new(self.adapter, self.from, to)
    }
}

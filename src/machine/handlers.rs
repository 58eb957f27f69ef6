//! Per-state handler slots.
//!
//! Hooks attach to states rather than transitions: `on_enter`/`on_exit`
//! fire around a state change, `on_do` runs on demand via
//! [`update`](crate::machine::Machine::update), and `on_unhandled` is a
//! notification-only callback for events no transition accepted.

use crate::machine::publisher::NullPublisher;
use std::sync::Arc;

/// Stored enter/exit hook. Receives the context, the source and
/// destination states, and the triggering event when one exists
/// (completion transitions and construction pass `None`).
pub type EnterExitHook<S, E, C> = Arc<dyn Fn(&mut C, &S, &S, Option<&E>) + Send + Sync>;

/// Stored unhandled-event hook.
pub type UnhandledHook<S, E, C> = Arc<dyn Fn(&mut C, &S, &E) + Send + Sync>;

/// Stored state `do` action.
pub type DoAction<S, O, C, P> = Arc<dyn Fn(&mut C, &S, &mut P) -> Option<O> + Send + Sync>;

/// The handler slots of one state.
pub struct StateHandlers<S, E, O, C, P = NullPublisher> {
    pub on_enter: Option<EnterExitHook<S, E, C>>,
    pub on_exit: Option<EnterExitHook<S, E, C>>,
    pub on_do: Option<DoAction<S, O, C, P>>,
    pub on_unhandled: Option<UnhandledHook<S, E, C>>,
}

impl<S, E, O, C, P> Default for StateHandlers<S, E, O, C, P> {
    fn default() -> Self {
        Self {
            on_enter: None,
            on_exit: None,
            on_do: None,
            on_unhandled: None,
        }
    }
}

impl<S, E, O, C, P> Clone for StateHandlers<S, E, O, C, P> {
    fn clone(&self) -> Self {
        Self {
            on_enter: self.on_enter.as_ref().map(Arc::clone),
            on_exit: self.on_exit.as_ref().map(Arc::clone),
            on_do: self.on_do.as_ref().map(Arc::clone),
            on_unhandled: self.on_unhandled.as_ref().map(Arc::clone),
        }
    }
}

/// Object-centric handler for one state.
///
/// Implementors override whichever hooks they care about; the defaults do
/// nothing. [`on_state`](crate::builder::MachineBuilder::on_state) binds
/// all three slots to the handler object.
///
/// # Example
///
/// ```rust
/// use flywheel::machine::{NullPublisher, StateHandler};
///
/// struct Counter;
///
/// impl StateHandler<u8, u8, String, u32, NullPublisher> for Counter {
///     fn on_enter(&self, ctx: &mut u32, _from: &u8, _to: &u8, _event: Option<&u8>) {
///         *ctx += 1;
///     }
/// }
/// ```
pub trait StateHandler<S, E, O, C, P = NullPublisher>: Send + Sync {
    /// Called after the state change of a commit into this state.
    fn on_enter(&self, _ctx: &mut C, _from: &S, _to: &S, _event: Option<&E>) {}

    /// Called before the action of a commit out of this state.
    fn on_exit(&self, _ctx: &mut C, _from: &S, _to: &S, _event: Option<&E>) {}

    /// Called by `update()` while this state is current.
    fn on_do(&self, _ctx: &mut C, _state: &S, _publisher: &mut P) -> Option<O> {
        None
    }
}

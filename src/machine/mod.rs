//! The dispatch core: frozen tables, handler slots, publisher sinks, and
//! the machine that runs them.
//!
//! Everything here is synchronous. The async adapter in
//! [`crate::adapter`] layers coroutine-style effects on top of the same
//! commit semantics.

mod handlers;
#[allow(clippy::module_inception)]
mod machine;
mod publisher;
mod transition;

pub use handlers::{DoAction, EnterExitHook, StateHandler, StateHandlers, UnhandledHook};
pub use machine::Machine;
pub use publisher::{NullPublisher, Publish, QueuePublisher};
pub use transition::{Action, Completion, CompletionAction, Selection, Transition};

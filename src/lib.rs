//! Flywheel: typed event-dispatch state machines.
//!
//! A machine owns a current state, a user context, and frozen dispatch
//! tables built once through [`MachineBuilder`]. Dispatching an event
//! selects the first matching transition by (priority, declaration
//! order), commits it with a fixed effect order (exit hook, action, state
//! change, enter hook), then settles: anonymous completion transitions
//! fire until none is eligible, and events deferred for the settled state
//! are replayed.
//!
//! # Core Concepts
//!
//! - **State**: type-safe states via the [`State`](core::State) trait
//! - **Events**: one enum, matched by alternative or by value
//! - **Guards**: pure predicates consulted during selection
//! - **Completions**: transitions with no event trigger, run to fixpoint
//! - **Deferral**: events stored on entry and replayed on re-entry
//! - **Async adapter**: per-`(from, to)` effect pipelines with
//!   cooperative cancellation, layered over the same commit semantics
//!
//! # Example
//!
//! ```rust
//! use flywheel::builder::MachineBuilder;
//! use flywheel::{event_set, state_enum};
//!
//! state_enum! {
//!     enum Turnstile {
//!         Locked,
//!         Unlocked,
//!     }
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Coin;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Push;
//!
//! event_set! {
//!     enum Input {
//!         Coin(Coin),
//!         Push(Push),
//!     }
//! }
//!
//! let mut builder: MachineBuilder<Turnstile, Input, String, u32> = MachineBuilder::new();
//! builder.set_initial(Turnstile::Locked);
//! builder.on::<Coin>(Turnstile::Locked, Turnstile::Unlocked, |_coin, coins: &mut u32| {
//!     *coins += 1;
//!     Some("coin accepted".to_string())
//! });
//! builder.on::<Push>(Turnstile::Unlocked, Turnstile::Locked, |_push, _coins| {
//!     Some("pass through".to_string())
//! });
//!
//! let mut machine = builder.build(0).unwrap();
//! assert_eq!(
//!     machine.dispatch(&Input::Coin(Coin)).as_deref(),
//!     Some("coin accepted")
//! );
//! assert_eq!(machine.state(), &Turnstile::Unlocked);
//! assert_eq!(machine.context(), &1);
//! ```

pub mod adapter;
pub mod builder;
pub mod cancel;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use crate::core::{Alternative, CompletionGuard, Guard, State, TransitionTrace, Trigger};
pub use adapter::AsyncAdapter;
pub use builder::{BuildError, MachineBuilder};
pub use cancel::{cancelled, throw_if_cancelled, CancelSource, CancelToken, EffectError};
pub use machine::{
    Completion, Machine, NullPublisher, Publish, QueuePublisher, Selection, StateHandler,
    Transition,
};

//! Builder API for machine construction.
//!
//! This module provides the imperative builder surface, the fluent
//! declaration stages, and macros for generating state and event types
//! with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;
pub mod stages;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use stages::{CompletionStage, OnStage, OnValueStage, TransitionStage};

/// An action that produces a fixed output, ignoring event and context.
///
/// # Example
///
/// ```
/// use flywheel::builder::{emit_output, MachineBuilder};
/// use flywheel::{event_set, state_enum};
///
/// state_enum! {
///     enum Lamp {
///         Off,
///         On,
///     }
/// }
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Flip;
///
/// event_set! {
///     enum Input {
///         Flip(Flip),
///     }
/// }
///
/// let mut builder: MachineBuilder<Lamp, Input, String> = MachineBuilder::new();
/// builder.set_initial(Lamp::Off);
/// builder.on::<Flip>(Lamp::Off, Lamp::On, emit_output("lit".to_string()));
///
/// let mut machine = builder.build(()).unwrap();
/// assert_eq!(machine.dispatch(&Input::Flip(Flip)).as_deref(), Some("lit"));
/// ```
pub fn emit_output<T, C, O>(value: O) -> impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static
where
    O: Clone + Send + Sync + 'static,
{
    move |_event, _ctx| Some(value.clone())
}

/// An action that does nothing and produces no output. Useful when a
/// transition exists only for its state change and hooks.
pub fn no_output<T, C, O>() -> impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static {
    |_event, _ctx| None
}

//! Builder for constructing machines.
//!
//! The builder accumulates handlers, transitions, completions, the
//! publisher, and the initial state, then freezes everything into a
//! [`Machine`] with sorted tables. Setters chain on `&mut self`; `build`
//! consumes the builder.

use std::collections::HashMap;
use std::sync::Arc;

use crate::builder::error::BuildError;
use crate::builder::stages::{CompletionStage, TransitionStage};
use crate::core::{Alternative, Guard, State};
use crate::machine::{
    Action, Completion, Machine, NullPublisher, StateHandler, StateHandlers, Transition,
    UnhandledHook,
};

/// Lift a typed action onto the stored event-level signature. The caller
/// pairs this with an alternative guard, so extraction cannot miss during
/// dispatch.
pub(crate) fn lift_typed_action<T, E, O, C, P>(
    action: impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static,
) -> Action<E, O, C, P>
where
    T: Alternative<E>,
{
    Arc::new(move |event, ctx, _publisher| T::extract(event).and_then(|typed| action(typed, ctx)))
}

/// Publisher-threading variant of [`lift_typed_action`].
pub(crate) fn lift_typed_action_with<T, E, O, C, P>(
    action: impl Fn(&T, &mut C, &mut P) -> Option<O> + Send + Sync + 'static,
) -> Action<E, O, C, P>
where
    T: Alternative<E>,
{
    Arc::new(move |event, ctx, publisher| {
        T::extract(event).and_then(|typed| action(typed, ctx, publisher))
    })
}

/// Wrap a whole-event action onto the stored signature.
pub(crate) fn lift_event_action<E, O, C, P>(
    action: impl Fn(&E, &mut C) -> Option<O> + Send + Sync + 'static,
) -> Action<E, O, C, P> {
    Arc::new(move |event, ctx, _publisher| action(event, ctx))
}

/// Publisher-threading variant of [`lift_event_action`].
pub(crate) fn lift_event_action_with<E, O, C, P>(
    action: impl Fn(&E, &mut C, &mut P) -> Option<O> + Send + Sync + 'static,
) -> Action<E, O, C, P> {
    Arc::new(action)
}

/// Builder for [`Machine`].
///
/// # Example
///
/// ```rust
/// use flywheel::builder::MachineBuilder;
/// use flywheel::{event_set, state_enum};
///
/// state_enum! {
///     enum Door {
///         Open,
///         Closed,
///     }
/// }
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Slam;
///
/// event_set! {
///     enum Input {
///         Slam(Slam),
///     }
/// }
///
/// let mut builder: MachineBuilder<Door, Input, String, u32> = MachineBuilder::new();
/// builder.set_initial(Door::Open);
/// builder.on::<Slam>(Door::Open, Door::Closed, |_slam, count: &mut u32| {
///     *count += 1;
///     Some("slammed".to_string())
/// });
///
/// let mut machine = builder.build(0).unwrap();
/// let out = machine.dispatch(&Input::Slam(Slam));
/// assert_eq!(out.as_deref(), Some("slammed"));
/// assert_eq!(machine.state(), &Door::Closed);
/// ```
pub struct MachineBuilder<S: State, E, O, C = (), P = NullPublisher> {
    initial: Option<S>,
    deferral_enabled: bool,
    publisher: Option<P>,
    handlers: HashMap<S, StateHandlers<S, E, O, C, P>>,
    machine_unhandled: Option<UnhandledHook<S, E, C>>,
    transitions: HashMap<S, Vec<Transition<S, E, O, C, P>>>,
    any_transitions: Vec<Transition<S, E, O, C, P>>,
    completions: HashMap<S, Vec<Completion<S, O, C, P>>>,
}

impl<S, E, O, C, P> MachineBuilder<S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            deferral_enabled: false,
            publisher: None,
            handlers: HashMap::new(),
            machine_unhandled: None,
            transitions: HashMap::new(),
            any_transitions: Vec::new(),
            completions: HashMap::new(),
        }
    }

    /// Set the initial state (required).
    pub fn set_initial(&mut self, state: S) -> &mut Self {
        self.initial = Some(state);
        self
    }

    /// Enable or disable deferral globally. Off by default; transitions
    /// marked `defer` behave like plain transitions while it is off.
    pub fn enable_deferral(&mut self, enabled: bool) -> &mut Self {
        self.deferral_enabled = enabled;
        self
    }

    /// Install the publisher the machine threads into publisher-aware
    /// actions. Defaults to `P::default()` when not called.
    pub fn set_publisher(&mut self, publisher: P) -> &mut Self {
        self.publisher = Some(publisher);
        self
    }

    /// Register an enter hook for `state`.
    pub fn on_enter(
        &mut self,
        state: S,
        hook: impl Fn(&mut C, &S, &S, Option<&E>) + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.entry(state).or_default().on_enter = Some(Arc::new(hook));
        self
    }

    /// Register an exit hook for `state`.
    pub fn on_exit(
        &mut self,
        state: S,
        hook: impl Fn(&mut C, &S, &S, Option<&E>) + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.entry(state).or_default().on_exit = Some(Arc::new(hook));
        self
    }

    /// Register the `do` action for `state`, run by
    /// [`update`](Machine::update).
    pub fn on_do(
        &mut self,
        state: S,
        action: impl Fn(&mut C, &S) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.entry(state).or_default().on_do =
            Some(Arc::new(move |ctx, state, _publisher| action(ctx, state)));
        self
    }

    /// Publisher-threading variant of [`on_do`](Self::on_do).
    pub fn on_do_with(
        &mut self,
        state: S,
        action: impl Fn(&mut C, &S, &mut P) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.entry(state).or_default().on_do = Some(Arc::new(action));
        self
    }

    /// Register the machine-level unhandled-event hook. Notification
    /// only; called when no transition matches and the current state has
    /// no state-level hook.
    pub fn on_unhandled(
        &mut self,
        hook: impl Fn(&mut C, &S, &E) + Send + Sync + 'static,
    ) -> &mut Self {
        self.machine_unhandled = Some(Arc::new(hook));
        self
    }

    /// Register a state-level unhandled-event hook. Shadows the
    /// machine-level hook while `state` is current.
    pub fn on_unhandled_in(
        &mut self,
        state: S,
        hook: impl Fn(&mut C, &S, &E) + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.entry(state).or_default().on_unhandled = Some(Arc::new(hook));
        self
    }

    /// Bind a handler object's enter/exit/do hooks to `state`.
    pub fn on_state(
        &mut self,
        state: S,
        handler: impl StateHandler<S, E, O, C, P> + 'static,
    ) -> &mut Self {
        let handler = Arc::new(handler);
        let slots = self.handlers.entry(state).or_default();

        let enter = Arc::clone(&handler);
        slots.on_enter = Some(Arc::new(move |ctx, from, to, event| {
            enter.on_enter(ctx, from, to, event)
        }));
        let exit = Arc::clone(&handler);
        slots.on_exit = Some(Arc::new(move |ctx, from, to, event| {
            exit.on_exit(ctx, from, to, event)
        }));
        slots.on_do = Some(Arc::new(move |ctx, state, publisher| {
            handler.on_do(ctx, state, publisher)
        }));
        self
    }

    /// Add a pre-built transition record. Routed to the per-state list,
    /// or to the any-source list when `from` is `None`.
    pub fn add_transition(&mut self, transition: Transition<S, E, O, C, P>) -> &mut Self {
        match &transition.from {
            Some(from) => {
                let key = from.clone();
                self.transitions.entry(key).or_default().push(transition);
            }
            None => self.any_transitions.push(transition),
        }
        self
    }

    /// Add a pre-built completion record.
    pub fn add_completion(&mut self, completion: Completion<S, O, C, P>) -> &mut Self {
        let key = completion.from.clone();
        self.completions.entry(key).or_default().push(completion);
        self
    }

    /// Declare a transition fired when the event holds alternative `T`.
    ///
    /// Guard, priority, suppression, and deferral are reachable through
    /// the fluent surface ([`from`](Self::from)); this shorthand covers
    /// the common case.
    pub fn on<T: Alternative<E>>(
        &mut self,
        from: S,
        to: S,
        action: impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self {
        let mut transition = Transition::new(from, to);
        transition.guard = Some(Guard::for_alternative::<T>());
        transition.action = Some(lift_typed_action::<T, _, _, _, _>(action));
        self.add_transition(transition)
    }

    /// Declare a transition fired when the event equals `value`.
    pub fn on_value(
        &mut self,
        from: S,
        to: S,
        value: E,
        action: impl Fn(&E, &mut C) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self
    where
        E: PartialEq + Send + Sync,
    {
        let mut transition = Transition::new(from, to);
        transition.guard = Some(Guard::for_value(value));
        transition.action = Some(lift_event_action(action));
        self.add_transition(transition)
    }

    /// Declare an any-source transition fired when the event holds
    /// alternative `T`.
    pub fn on_any<T: Alternative<E>>(
        &mut self,
        to: S,
        action: impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self {
        let mut transition = Transition::any(to);
        transition.guard = Some(Guard::for_alternative::<T>());
        transition.action = Some(lift_typed_action::<T, _, _, _, _>(action));
        self.add_transition(transition)
    }

    /// Declare an any-source transition fired when the event equals
    /// `value`.
    pub fn on_any_value(
        &mut self,
        to: S,
        value: E,
        action: impl Fn(&E, &mut C) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self
    where
        E: PartialEq + Send + Sync,
    {
        let mut transition = Transition::any(to);
        transition.guard = Some(Guard::for_value(value));
        transition.action = Some(lift_event_action(action));
        self.add_transition(transition)
    }

    /// Declare a completion transition from `from` to `to`.
    pub fn on_completion(
        &mut self,
        from: S,
        to: S,
        action: impl Fn(&mut C) -> Option<O> + Send + Sync + 'static,
    ) -> &mut Self {
        let mut completion = Completion::new(from, to);
        completion.action = Some(Arc::new(move |ctx, _publisher| action(ctx)));
        self.add_completion(completion)
    }

    /// Start a fluent transition declaration from `state`.
    pub fn from(&mut self, state: S) -> TransitionStage<'_, S, E, O, C, P> {
        TransitionStage::new(self, Some(state))
    }

    /// Start a fluent any-source transition declaration.
    pub fn any(&mut self) -> TransitionStage<'_, S, E, O, C, P> {
        TransitionStage::new(self, None)
    }

    /// Start a fluent completion declaration from `state`.
    pub fn completion(&mut self, state: S) -> CompletionStage<'_, S, E, O, C, P> {
        CompletionStage::new(self, state)
    }

    /// Freeze the builder into a machine.
    ///
    /// Stable-sorts every transition and completion list by priority
    /// descending (declaration order breaks ties), precomputes the
    /// completion step bound, fires the initial state's enter hook, and
    /// settles completions and deferrals once.
    pub fn build(mut self, ctx: C) -> Result<Machine<S, E, O, C, P>, BuildError>
    where
        P: Default,
    {
        let initial = self.initial.take().ok_or(BuildError::MissingInitialState)?;

        for list in self.transitions.values_mut() {
            list.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        self.any_transitions
            .sort_by(|a, b| b.priority.cmp(&a.priority));
        for list in self.completions.values_mut() {
            list.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        let total_completions: usize = self.completions.values().map(Vec::len).sum();
        let completion_limit = if total_completions > 0 {
            total_completions + 1
        } else {
            0
        };

        let publisher = self.publisher.unwrap_or_default();

        Ok(Machine::from_parts(
            initial,
            self.handlers,
            self.machine_unhandled,
            self.transitions,
            self.any_transitions,
            self.completions,
            self.deferral_enabled,
            completion_limit,
            ctx,
            publisher,
        ))
    }
}

impl<S, E, O, C, P> Default for MachineBuilder<S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event_set, state_enum};

    state_enum! {
        enum Mode {
            Off,
            On,
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Toggle;

    event_set! {
        enum Input {
            Toggle(Toggle),
        }
    }

    #[test]
    fn build_requires_initial_state() {
        let builder: MachineBuilder<Mode, Input, u32, ()> = MachineBuilder::new();
        let result = builder.build(());
        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn machine_without_transitions_is_legal() {
        let mut builder: MachineBuilder<Mode, Input, u32, ()> = MachineBuilder::new();
        builder.set_initial(Mode::Off);
        let mut machine = builder.build(()).unwrap();
        assert_eq!(machine.dispatch(&Input::Toggle(Toggle)), None);
        assert_eq!(machine.state(), &Mode::Off);
    }

    #[test]
    fn priority_sort_is_stable_per_source_state() {
        let mut builder: MachineBuilder<Mode, Input, &'static str, ()> = MachineBuilder::new();
        builder.set_initial(Mode::Off);
        // Declared first at priority 0; loses to priority 5, but beats the
        // later priority-0 declaration.
        builder
            .from(Mode::Off)
            .on::<Toggle>()
            .action(|_, _| Some("first"))
            .to(Mode::Off);
        builder
            .from(Mode::Off)
            .on::<Toggle>()
            .action(|_, _| Some("high"))
            .priority(5)
            .to(Mode::On);
        builder
            .from(Mode::Off)
            .on::<Toggle>()
            .action(|_, _| Some("second"))
            .to(Mode::Off);
        let mut machine = builder.build(()).unwrap();

        assert_eq!(machine.dispatch(&Input::Toggle(Toggle)), Some("high"));
        assert_eq!(machine.state(), &Mode::On);
    }

    #[test]
    fn any_source_considered_after_state_candidates() {
        let mut builder: MachineBuilder<Mode, Input, &'static str, ()> = MachineBuilder::new();
        builder.set_initial(Mode::Off);
        builder.on_any::<Toggle>(Mode::Off, |_, _| Some("any"));
        builder.on::<Toggle>(Mode::Off, Mode::On, |_, _| Some("direct"));
        let mut machine = builder.build(()).unwrap();

        // The per-state candidate wins even though the any-source row has
        // equal priority and was declared first.
        assert_eq!(machine.dispatch(&Input::Toggle(Toggle)), Some("direct"));
        assert_eq!(machine.state(), &Mode::On);

        assert_eq!(machine.dispatch(&Input::Toggle(Toggle)), Some("any"));
        assert_eq!(machine.state(), &Mode::Off);
    }

    #[test]
    fn on_state_binds_handler_object() {
        use crate::machine::{NullPublisher, StateHandler};

        #[derive(Default)]
        struct Ctx {
            entered: u32,
            exited: u32,
            polled: u32,
        }

        struct Tracker;

        impl StateHandler<Mode, Input, u32, Ctx, NullPublisher> for Tracker {
            fn on_enter(&self, ctx: &mut Ctx, _from: &Mode, _to: &Mode, _event: Option<&Input>) {
                ctx.entered += 1;
            }

            fn on_exit(&self, ctx: &mut Ctx, _from: &Mode, _to: &Mode, _event: Option<&Input>) {
                ctx.exited += 1;
            }

            fn on_do(&self, ctx: &mut Ctx, _state: &Mode, _publisher: &mut NullPublisher) -> Option<u32> {
                ctx.polled += 1;
                Some(ctx.polled)
            }
        }

        let mut builder: MachineBuilder<Mode, Input, u32, Ctx> = MachineBuilder::new();
        builder.set_initial(Mode::Off);
        builder.on_state(Mode::Off, Tracker);
        builder.on::<Toggle>(Mode::Off, Mode::On, |_, _| None);
        let mut machine = builder.build(Ctx::default()).unwrap();

        // Construction entered Mode::Off once.
        assert_eq!(machine.context().entered, 1);
        assert_eq!(machine.update(), Some(1));

        machine.dispatch(&Input::Toggle(Toggle));
        assert_eq!(machine.context().exited, 1);
        assert_eq!(machine.update(), None);
    }

    #[test]
    fn value_matched_transitions_require_equality() {
        let mut builder: MachineBuilder<Mode, Input, &'static str, ()> = MachineBuilder::new();
        builder.set_initial(Mode::Off);
        builder.on_value(Mode::Off, Mode::On, Input::Toggle(Toggle), |_, _| {
            Some("matched")
        });
        let mut machine = builder.build(()).unwrap();

        assert_eq!(machine.dispatch(&Input::Toggle(Toggle)), Some("matched"));
        assert_eq!(machine.state(), &Mode::On);
    }
}

//! Fluent declaration stages.
//!
//! `builder.from(s).on::<T>().action(..).priority(..).to(t)` and
//! `builder.completion(s).guard(..).action(..).to(t)` produce exactly the
//! same records as the imperative builder methods; the stages only carry
//! the optional knobs (guard, priority, suppression, deferral) that the
//! shorthands omit.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::machine::{
    lift_event_action, lift_event_action_with, lift_typed_action, lift_typed_action_with,
    MachineBuilder,
};
use crate::core::{Alternative, CompletionGuard, Guard, State};
use crate::machine::{Action, Completion, CompletionAction, Transition};

/// Start of a transition declaration: a source state, or any-source.
pub struct TransitionStage<'b, S: State, E, O, C, P> {
    builder: &'b mut MachineBuilder<S, E, O, C, P>,
    from: Option<S>,
}

impl<'b, S, E, O, C, P> TransitionStage<'b, S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    pub(crate) fn new(builder: &'b mut MachineBuilder<S, E, O, C, P>, from: Option<S>) -> Self {
        Self { builder, from }
    }

    /// Match events holding alternative `T`.
    pub fn on<T: Alternative<E>>(self) -> OnStage<'b, T, S, E, O, C, P> {
        OnStage {
            builder: self.builder,
            from: self.from,
            priority: 0,
            suppress_enter_exit: false,
            defer: false,
            guard: None,
            action: None,
            _alternative: PhantomData,
        }
    }

    /// Match events equal to `value`.
    pub fn on_value(self, value: E) -> OnValueStage<'b, S, E, O, C, P>
    where
        E: PartialEq + Send + Sync,
    {
        OnValueStage {
            builder: self.builder,
            from: self.from,
            value,
            priority: 0,
            suppress_enter_exit: false,
            defer: false,
            guard: None,
            action: None,
        }
    }
}

/// Declaration of a type-matched transition.
pub struct OnStage<'b, T, S: State, E, O, C, P> {
    builder: &'b mut MachineBuilder<S, E, O, C, P>,
    from: Option<S>,
    priority: i32,
    suppress_enter_exit: bool,
    defer: bool,
    guard: Option<Guard<E, C>>,
    action: Option<Action<E, O, C, P>>,
    _alternative: PhantomData<T>,
}

impl<T, S, E, O, C, P> OnStage<'_, T, S, E, O, C, P>
where
    T: Alternative<E>,
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    /// Attach the transition action.
    pub fn action(mut self, action: impl Fn(&T, &mut C) -> Option<O> + Send + Sync + 'static) -> Self {
        self.action = Some(lift_typed_action::<T, _, _, _, _>(action));
        self
    }

    /// Attach a publisher-threading transition action.
    pub fn action_with(
        mut self,
        action: impl Fn(&T, &mut C, &mut P) -> Option<O> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(lift_typed_action_with::<T, _, _, _, _>(action));
        self
    }

    /// Attach an extra guard, conjoined with the alternative match.
    pub fn guard(mut self, guard: impl Fn(&E, &C) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Guard::new(guard));
        self
    }

    /// Set the selection priority (higher wins; default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Skip enter/exit hooks when this ends up a self-transition.
    pub fn suppress_enter_exit(mut self, suppress: bool) -> Self {
        self.suppress_enter_exit = suppress;
        self
    }

    /// Mark the event for deferral instead of action invocation.
    pub fn defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    /// Set the destination state and register the transition.
    pub fn to(self, to: S) {
        let mut transition = match self.from {
            Some(from) => Transition::new(from, to),
            None => Transition::any(to),
        };
        transition.priority = self.priority;
        transition.suppress_enter_exit = self.suppress_enter_exit;
        transition.defer = self.defer;
        let type_guard = Guard::for_alternative::<T>();
        transition.guard = Some(match self.guard {
            Some(extra) => type_guard.and(extra),
            None => type_guard,
        });
        transition.action = self.action;
        self.builder.add_transition(transition);
    }
}

/// Declaration of a value-matched transition.
pub struct OnValueStage<'b, S: State, E, O, C, P> {
    builder: &'b mut MachineBuilder<S, E, O, C, P>,
    from: Option<S>,
    value: E,
    priority: i32,
    suppress_enter_exit: bool,
    defer: bool,
    guard: Option<Guard<E, C>>,
    action: Option<Action<E, O, C, P>>,
}

impl<S, E, O, C, P> OnValueStage<'_, S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    /// Attach the transition action.
    pub fn action(mut self, action: impl Fn(&E, &mut C) -> Option<O> + Send + Sync + 'static) -> Self {
        self.action = Some(lift_event_action(action));
        self
    }

    /// Attach a publisher-threading transition action.
    pub fn action_with(
        mut self,
        action: impl Fn(&E, &mut C, &mut P) -> Option<O> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(lift_event_action_with(action));
        self
    }

    /// Attach an extra guard, conjoined with the equality match.
    pub fn guard(mut self, guard: impl Fn(&E, &C) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Guard::new(guard));
        self
    }

    /// Set the selection priority (higher wins; default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Skip enter/exit hooks when this ends up a self-transition.
    pub fn suppress_enter_exit(mut self, suppress: bool) -> Self {
        self.suppress_enter_exit = suppress;
        self
    }

    /// Mark the event for deferral instead of action invocation.
    pub fn defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    /// Set the destination state and register the transition.
    pub fn to(self, to: S) {
        let mut transition = match self.from {
            Some(from) => Transition::new(from, to),
            None => Transition::any(to),
        };
        transition.priority = self.priority;
        transition.suppress_enter_exit = self.suppress_enter_exit;
        transition.defer = self.defer;
        let value_guard = Guard::for_value(self.value);
        transition.guard = Some(match self.guard {
            Some(extra) => value_guard.and(extra),
            None => value_guard,
        });
        transition.action = self.action;
        self.builder.add_transition(transition);
    }
}

/// Declaration of a completion transition.
pub struct CompletionStage<'b, S: State, E, O, C, P> {
    builder: &'b mut MachineBuilder<S, E, O, C, P>,
    from: S,
    priority: i32,
    suppress_enter_exit: bool,
    guard: Option<CompletionGuard<C>>,
    action: Option<CompletionAction<O, C, P>>,
}

impl<'b, S, E, O, C, P> CompletionStage<'b, S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    pub(crate) fn new(builder: &'b mut MachineBuilder<S, E, O, C, P>, from: S) -> Self {
        Self {
            builder,
            from,
            priority: 0,
            suppress_enter_exit: false,
            guard: None,
            action: None,
        }
    }

    /// Attach the completion action.
    pub fn action(mut self, action: impl Fn(&mut C) -> Option<O> + Send + Sync + 'static) -> Self {
        self.action = Some(Arc::new(move |ctx, _publisher| action(ctx)));
        self
    }

    /// Attach a publisher-threading completion action.
    pub fn action_with(
        mut self,
        action: impl Fn(&mut C, &mut P) -> Option<O> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Attach the completion guard.
    pub fn guard(mut self, guard: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(CompletionGuard::new(guard));
        self
    }

    /// Set the selection priority (higher wins; default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Skip enter/exit hooks when this ends up a self-transition.
    pub fn suppress_enter_exit(mut self, suppress: bool) -> Self {
        self.suppress_enter_exit = suppress;
        self
    }

    /// Set the destination state and register the completion.
    pub fn to(self, to: S) {
        let mut completion = Completion::new(self.from, to);
        completion.priority = self.priority;
        completion.suppress_enter_exit = self.suppress_enter_exit;
        completion.guard = self.guard;
        completion.action = self.action;
        self.builder.add_completion(completion);
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::MachineBuilder;
    use crate::{event_set, state_enum};

    state_enum! {
        enum Stage {
            Setup,
            PathA,
            PathB,
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Go {
        level: u32,
    }

    event_set! {
        enum Input {
            Go(Go),
        }
    }

    #[derive(Default)]
    struct Ctx {
        choose_a: bool,
    }

    #[test]
    fn fluent_guard_conjoins_with_type_match() {
        let mut builder: MachineBuilder<Stage, Input, &'static str, Ctx> = MachineBuilder::new();
        builder.set_initial(Stage::Setup);
        builder
            .from(Stage::Setup)
            .on::<Go>()
            .guard(|event, _ctx| matches!(event, Input::Go(go) if go.level > 3))
            .action(|_, _| Some("big"))
            .to(Stage::PathA);
        let mut machine = builder.build(Ctx::default()).unwrap();

        assert_eq!(machine.dispatch(&Input::Go(Go { level: 1 })), None);
        assert_eq!(machine.state(), &Stage::Setup);
        assert_eq!(machine.dispatch(&Input::Go(Go { level: 5 })), Some("big"));
        assert_eq!(machine.state(), &Stage::PathA);
    }

    #[test]
    fn completion_stage_registers_guarded_completions() {
        let mut builder: MachineBuilder<Stage, Input, &'static str, Ctx> = MachineBuilder::new();
        builder.set_initial(Stage::Setup);
        builder
            .completion(Stage::Setup)
            .guard(|ctx: &Ctx| ctx.choose_a)
            .action(|_ctx| Some("route to A"))
            .to(Stage::PathA);
        builder
            .completion(Stage::Setup)
            .guard(|ctx: &Ctx| !ctx.choose_a)
            .action(|_ctx| Some("route to B"))
            .to(Stage::PathB);

        // Completions run at construction; choose_a routes immediately.
        let machine = builder.build(Ctx { choose_a: true }).unwrap();
        assert_eq!(machine.state(), &Stage::PathA);
    }

    #[test]
    fn any_stage_matches_from_every_state() {
        let mut builder: MachineBuilder<Stage, Input, &'static str, Ctx> = MachineBuilder::new();
        builder.set_initial(Stage::Setup);
        builder
            .any()
            .on::<Go>()
            .action(|_, _| Some("caught"))
            .to(Stage::PathB);
        let mut machine = builder.build(Ctx::default()).unwrap();

        assert_eq!(machine.dispatch(&Input::Go(Go { level: 0 })), Some("caught"));
        assert_eq!(machine.state(), &Stage::PathB);
        assert_eq!(machine.dispatch(&Input::Go(Go { level: 0 })), Some("caught"));
    }

    #[test]
    fn value_stage_with_defer_flag_builds() {
        let mut builder: MachineBuilder<Stage, Input, &'static str, Ctx> = MachineBuilder::new();
        builder.set_initial(Stage::Setup);
        builder
            .from(Stage::Setup)
            .on_value(Input::Go(Go { level: 1 }))
            .priority(2)
            .defer(true)
            .to(Stage::PathA);
        let machine = builder.build(Ctx::default()).unwrap();
        assert_eq!(machine.state(), &Stage::Setup);
    }
}

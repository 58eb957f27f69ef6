//! The dispatch core.
//!
//! A [`Machine`] owns its context, publisher, frozen dispatch tables, and
//! queues. Dispatch is strictly single-threaded and synchronous: one
//! event in, effects in a fixed order, optional output out.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use crate::core::{State, TraceEntry, TransitionTrace, Trigger};
use crate::machine::handlers::{StateHandlers, UnhandledHook};
use crate::machine::publisher::NullPublisher;
use crate::machine::transition::{Completion, Selection, Transition};

/// A built state machine.
///
/// Constructed through [`MachineBuilder`](crate::builder::MachineBuilder);
/// the tables are immutable for the machine's lifetime. The machine owns
/// its context exclusively and mutates it only from within the hooks,
/// guards, and actions it invokes.
///
/// # Effect ordering
///
/// Within one commit: exit hook, action, state change, enter hook,
/// completion loop, deferral drain. The order is total and observable.
///
/// # Panics
///
/// A panic raised from a transition action propagates to the caller. The
/// action runs before the state update, so the machine's state is
/// unchanged and no enter hook has fired when it unwinds. Panics from
/// unhandled-event hooks are swallowed; those hooks are notification-only.
pub struct Machine<S: State, E, O, C = (), P = NullPublisher> {
    current: S,
    handlers: HashMap<S, StateHandlers<S, E, O, C, P>>,
    machine_unhandled: Option<UnhandledHook<S, E, C>>,
    transitions: HashMap<S, Vec<Transition<S, E, O, C, P>>>,
    any_transitions: Vec<Transition<S, E, O, C, P>>,
    completions: HashMap<S, Vec<Completion<S, O, C, P>>>,
    pending: VecDeque<E>,
    deferrals: HashMap<S, VecDeque<E>>,
    deferral_enabled: bool,
    draining_deferrals: bool,
    completion_limit: usize,
    processing_completions: bool,
    async_inflight: bool,
    ctx: C,
    publisher: P,
    trace: TransitionTrace<S>,
}

#[allow(clippy::too_many_arguments)]
impl<S, E, O, C, P> Machine<S, E, O, C, P>
where
    S: State + 'static,
    E: Clone + 'static,
    O: 'static,
    C: 'static,
    P: 'static,
{
    pub(crate) fn from_parts(
        initial: S,
        handlers: HashMap<S, StateHandlers<S, E, O, C, P>>,
        machine_unhandled: Option<UnhandledHook<S, E, C>>,
        transitions: HashMap<S, Vec<Transition<S, E, O, C, P>>>,
        any_transitions: Vec<Transition<S, E, O, C, P>>,
        completions: HashMap<S, Vec<Completion<S, O, C, P>>>,
        deferral_enabled: bool,
        completion_limit: usize,
        ctx: C,
        publisher: P,
    ) -> Self {
        let mut machine = Self {
            current: initial,
            handlers,
            machine_unhandled,
            transitions,
            any_transitions,
            completions,
            pending: VecDeque::new(),
            deferrals: HashMap::new(),
            deferral_enabled,
            draining_deferrals: false,
            completion_limit,
            processing_completions: false,
            async_inflight: false,
            ctx,
            publisher,
            trace: TransitionTrace::new(),
        };

        // Entering the initial state counts as an entry: the enter hook
        // fires with from == to, then completions and deferrals settle.
        if let Some(hook) = machine
            .handlers
            .get(&machine.current)
            .and_then(|h| h.on_enter.clone())
        {
            let initial = machine.current.clone();
            hook(&mut machine.ctx, &initial, &initial, None);
        }
        machine.finalize_transition(None);
        machine
    }

    /// Run the selector for `event` without committing anything.
    ///
    /// Returns the first transition out of the current state whose guard
    /// is absent or holds, in (priority, declaration order); any-source
    /// transitions are considered only after the per-state candidates.
    pub fn select(&self, event: &E) -> Selection<S, E, O, C, P> {
        match self.find_transition(event) {
            Some(transition) => Selection::matched(transition.clone()),
            None => Selection::none(),
        }
    }

    /// Commit a previously selected transition.
    ///
    /// Honors deferral: when the matched transition is marked `defer` and
    /// deferral is enabled, the event is stored on the target state's
    /// queue and the action is not invoked; hooks still fire and the
    /// state still changes. Finishes with the finalize pipeline
    /// (completions, then deferral drain).
    pub fn commit(&mut self, selection: &Selection<S, E, O, C, P>, event: Option<&E>) -> Option<O> {
        let Some(transition) = selection.transition() else {
            return None;
        };
        if self.deferral_enabled && transition.defer {
            if let Some(event) = event {
                self.deferrals
                    .entry(transition.to.clone())
                    .or_default()
                    .push_back(event.clone());
                debug!(state = transition.to.name(), "event deferred");
                self.apply_transition(transition, Some(event), false);
                return self.finalize_transition(None);
            }
        }
        let out = self.apply_transition(transition, event, true);
        self.finalize_transition(out)
    }

    /// Dispatch one event.
    ///
    /// Selects, commits, and finalizes. When no transition matches, the
    /// current state's `on_unhandled` hook is notified if present, else
    /// the machine-level one, and `None` is returned.
    pub fn dispatch(&mut self, event: &E) -> Option<O> {
        self.handle_event(event)
    }

    /// Append an event to the pending queue without processing it.
    pub fn enqueue(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Drain the pending queue front to back, dispatching each event.
    ///
    /// Returns the outputs produced, in dispatch order. Events enqueued
    /// while draining extend the queue and are processed in order.
    pub fn dispatch_all(&mut self) -> Vec<O> {
        let mut outputs = Vec::new();
        while let Some(next) = self.pending.pop_front() {
            if let Some(out) = self.handle_event(&next) {
                outputs.push(out);
            }
        }
        outputs
    }

    /// Invoke the current state's `do` action, if any. Does not transition.
    pub fn update(&mut self) -> Option<O> {
        let action = self.handlers.get(&self.current).and_then(|h| h.on_do.clone());
        match action {
            Some(action) => action(&mut self.ctx, &self.current, &mut self.publisher),
            None => None,
        }
    }

    /// The current state.
    pub fn state(&self) -> &S {
        &self.current
    }

    /// Shared access to the context.
    pub fn context(&self) -> &C {
        &self.ctx
    }

    /// Exclusive access to the context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Shared access to the publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Exclusive access to the publisher.
    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// Split borrow of context and publisher, for effect invocation.
    pub fn context_publisher_mut(&mut self) -> (&mut C, &mut P) {
        (&mut self.ctx, &mut self.publisher)
    }

    /// The trace of committed transitions.
    pub fn trace(&self) -> &TransitionTrace<S> {
        &self.trace
    }

    /// Mark an asynchronous effect inflight. While set, completion
    /// processing must not run.
    pub fn begin_async_effect(&mut self) {
        self.async_inflight = true;
    }

    /// Clear the asynchronous-effect flag.
    pub fn end_async_effect(&mut self) {
        self.async_inflight = false;
    }

    /// Whether an asynchronous effect is inflight.
    pub fn async_state(&self) -> bool {
        self.async_inflight
    }

    fn handle_event(&mut self, event: &E) -> Option<O> {
        let selection = self.select(event);
        if selection.is_some() {
            self.commit(&selection, Some(event))
        } else {
            self.notify_unhandled(event);
            None
        }
    }

    fn find_transition(&self, event: &E) -> Option<&Transition<S, E, O, C, P>> {
        if let Some(candidates) = self.transitions.get(&self.current) {
            for candidate in candidates {
                if candidate
                    .guard
                    .as_ref()
                    .is_none_or(|g| g.check(event, &self.ctx))
                {
                    return Some(candidate);
                }
            }
        }
        self.any_transitions.iter().find(|candidate| {
            candidate
                .guard
                .as_ref()
                .is_none_or(|g| g.check(event, &self.ctx))
        })
    }

    fn apply_transition(
        &mut self,
        transition: &Transition<S, E, O, C, P>,
        event: Option<&E>,
        invoke_action: bool,
    ) -> Option<O> {
        let from = self.current.clone();
        let to = transition.to.clone();
        let skip_hooks = transition.suppress_enter_exit && to == from;

        if !skip_hooks {
            if let Some(hook) = self.handlers.get(&from).and_then(|h| h.on_exit.clone()) {
                hook(&mut self.ctx, &from, &to, event);
            }
        }

        let mut output = None;
        if invoke_action {
            if let (Some(action), Some(event)) = (transition.action.as_ref(), event) {
                output = action(event, &mut self.ctx, &mut self.publisher);
            }
        }

        self.current = to.clone();
        self.trace.record(TraceEntry {
            from: from.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
            trigger: Trigger::Event,
        });
        debug!(from = from.name(), to = to.name(), "transition committed");

        if !skip_hooks {
            if let Some(hook) = self.handlers.get(&to).and_then(|h| h.on_enter.clone()) {
                hook(&mut self.ctx, &from, &to, event);
            }
        }

        output
    }

    fn find_completion(&self) -> Option<&Completion<S, O, C, P>> {
        let candidates = self.completions.get(&self.current)?;
        candidates
            .iter()
            .find(|candidate| candidate.guard.as_ref().is_none_or(|g| g.check(&self.ctx)))
    }

    fn apply_completion(&mut self, completion: &Completion<S, O, C, P>) -> Option<O> {
        let from = self.current.clone();
        let to = completion.to.clone();
        let skip_hooks = completion.suppress_enter_exit && to == from;

        if !skip_hooks {
            if let Some(hook) = self.handlers.get(&from).and_then(|h| h.on_exit.clone()) {
                hook(&mut self.ctx, &from, &to, None);
            }
        }

        let output = completion
            .action
            .as_ref()
            .and_then(|action| action(&mut self.ctx, &mut self.publisher));

        self.current = to.clone();
        self.trace.record(TraceEntry {
            from: from.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
            trigger: Trigger::Completion,
        });
        trace!(from = from.name(), to = to.name(), "completion fired");

        if !skip_hooks {
            if let Some(hook) = self.handlers.get(&to).and_then(|h| h.on_enter.clone()) {
                hook(&mut self.ctx, &from, &to, None);
            }
        }

        output
    }

    /// Every commit funnels its output through this pipeline: completions
    /// run to fixpoint, an unset output adopts the last completion's, and
    /// deferrals for the settled state are replayed.
    fn finalize_transition(&mut self, result: Option<O>) -> Option<O> {
        let completion_out = self.process_completions();
        let result = result.or(completion_out);
        self.drain_deferrals_for_current_state();
        result
    }

    fn process_completions(&mut self) -> Option<O> {
        if self.completion_limit == 0 || self.processing_completions {
            return None;
        }
        debug_assert!(!self.async_inflight);
        self.processing_completions = true;
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut output = None;
            let mut steps = 0usize;
            loop {
                let Some(completion) = self.find_completion().cloned() else {
                    break;
                };
                // Step bound: protects against completion tables that
                // never stabilize.
                if steps > self.completion_limit {
                    break;
                }
                steps += 1;
                if let Some(value) = self.apply_completion(&completion) {
                    output = Some(value);
                }
            }
            output
        }));
        self.processing_completions = false;
        match result {
            Ok(output) => output,
            Err(payload) => resume_unwind(payload),
        }
    }

    fn drain_deferrals_for_current_state(&mut self) {
        if !self.deferral_enabled || self.draining_deferrals {
            return;
        }
        self.draining_deferrals = true;
        let result = catch_unwind(AssertUnwindSafe(|| loop {
            let next = match self.deferrals.get_mut(&self.current) {
                Some(queue) => match queue.pop_front() {
                    Some(event) => event,
                    None => break,
                },
                None => break,
            };
            self.handle_event(&next);
        }));
        self.draining_deferrals = false;
        if let Err(payload) = result {
            resume_unwind(payload);
        }
    }

    fn notify_unhandled(&mut self, event: &E) {
        debug!(state = self.current.name(), "no transition matched");
        let state_hook = self
            .handlers
            .get(&self.current)
            .and_then(|h| h.on_unhandled.clone());
        let machine_hook = self.machine_unhandled.as_ref().map(Arc::clone);
        // Notification only: panics from unhandled hooks are swallowed.
        let _ = catch_unwind(AssertUnwindSafe(|| {
            if let Some(hook) = state_hook {
                hook(&mut self.ctx, &self.current, event);
            } else if let Some(hook) = machine_hook {
                hook(&mut self.ctx, &self.current, event);
            }
        }));
    }
}

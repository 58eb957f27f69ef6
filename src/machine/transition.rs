//! Transition and completion records.
//!
//! These are the frozen rows of the dispatch tables. Guards and actions
//! are stored behind `Arc` so a matched row can be cheaply cloned into a
//! [`Selection`] without borrowing the table.

use crate::core::{CompletionGuard, Guard};
use crate::machine::publisher::NullPublisher;
use std::sync::Arc;

/// Stored transition action: event, context, publisher in; optional output out.
pub type Action<E, O, C, P> = Arc<dyn Fn(&E, &mut C, &mut P) -> Option<O> + Send + Sync>;

/// Stored completion action: context and publisher only.
pub type CompletionAction<O, C, P> = Arc<dyn Fn(&mut C, &mut P) -> Option<O> + Send + Sync>;

/// One declared transition.
///
/// `from == None` marks an any-source transition: it is considered for
/// every state, but only after the per-state candidates are exhausted.
/// Ties between equal priorities go to the earlier declaration (sorting
/// is stable).
pub struct Transition<S, E, O, C, P = NullPublisher> {
    /// Source state, or `None` for the any-source list.
    pub from: Option<S>,
    /// Destination state.
    pub to: S,
    /// Higher fires first; equal priorities keep declaration order.
    pub priority: i32,
    /// Skip the exit and enter hooks when this is a self-transition.
    pub suppress_enter_exit: bool,
    /// Store the event for replay instead of invoking the action.
    pub defer: bool,
    /// Selection predicate; absent means always eligible.
    pub guard: Option<Guard<E, C>>,
    /// Effect invoked during commit; absent means no output.
    pub action: Option<Action<E, O, C, P>>,
}

impl<S, E, O, C, P> Transition<S, E, O, C, P> {
    /// A bare transition from `from` to `to`: priority 0, hooks enabled,
    /// no deferral, no guard, no action.
    pub fn new(from: S, to: S) -> Self {
        Self {
            from: Some(from),
            to,
            priority: 0,
            suppress_enter_exit: false,
            defer: false,
            guard: None,
            action: None,
        }
    }

    /// A bare any-source transition to `to`.
    pub fn any(to: S) -> Self {
        Self {
            from: None,
            to,
            priority: 0,
            suppress_enter_exit: false,
            defer: false,
            guard: None,
            action: None,
        }
    }
}

impl<S: Clone, E, O, C, P> Clone for Transition<S, E, O, C, P> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            priority: self.priority,
            suppress_enter_exit: self.suppress_enter_exit,
            defer: self.defer,
            guard: self.guard.clone(),
            action: self.action.as_ref().map(Arc::clone),
        }
    }
}

/// One declared completion transition.
///
/// Completions have no event trigger: they are eligible whenever the
/// machine settles in their source state and their guard holds.
pub struct Completion<S, O, C, P = NullPublisher> {
    /// Source state.
    pub from: S,
    /// Destination state.
    pub to: S,
    /// Higher fires first; equal priorities keep declaration order.
    pub priority: i32,
    /// Skip the exit and enter hooks when this is a self-transition.
    pub suppress_enter_exit: bool,
    /// Selection predicate over context; absent means always eligible.
    pub guard: Option<CompletionGuard<C>>,
    /// Effect invoked during commit; absent means no output.
    pub action: Option<CompletionAction<O, C, P>>,
}

impl<S, O, C, P> Completion<S, O, C, P> {
    /// A bare completion from `from` to `to`.
    pub fn new(from: S, to: S) -> Self {
        Self {
            from,
            to,
            priority: 0,
            suppress_enter_exit: false,
            guard: None,
            action: None,
        }
    }
}

impl<S: Clone, O, C, P> Clone for Completion<S, O, C, P> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            priority: self.priority,
            suppress_enter_exit: self.suppress_enter_exit,
            guard: self.guard.clone(),
            action: self.action.as_ref().map(Arc::clone),
        }
    }
}

/// Result of running the selector: the matched transition, if any.
///
/// A `Selection` owns a clone of the matched row (cheap, the closures are
/// `Arc`-backed), so it can be held across a later [`commit`] call
/// without borrowing the machine.
///
/// [`commit`]: crate::machine::Machine::commit
pub struct Selection<S, E, O, C, P = NullPublisher> {
    transition: Option<Transition<S, E, O, C, P>>,
}

impl<S: Clone, E, O, C, P> Selection<S, E, O, C, P> {
    pub(crate) fn matched(transition: Transition<S, E, O, C, P>) -> Self {
        Self {
            transition: Some(transition),
        }
    }

    pub(crate) fn none() -> Self {
        Self { transition: None }
    }

    /// Whether the selector found a transition.
    pub fn is_some(&self) -> bool {
        self.transition.is_some()
    }

    /// Whether the matched transition is marked for deferral.
    pub fn deferred(&self) -> bool {
        self.transition.as_ref().is_some_and(|t| t.defer)
    }

    /// The matched transition record.
    pub fn transition(&self) -> Option<&Transition<S, E, O, C, P>> {
        self.transition.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_transition_defaults() {
        let t: Transition<u8, u8, u8, ()> = Transition::new(1, 2);
        assert_eq!(t.from, Some(1));
        assert_eq!(t.to, 2);
        assert_eq!(t.priority, 0);
        assert!(!t.suppress_enter_exit);
        assert!(!t.defer);
        assert!(t.guard.is_none());
        assert!(t.action.is_none());
    }

    #[test]
    fn any_transition_has_no_source() {
        let t: Transition<u8, u8, u8, ()> = Transition::any(3);
        assert_eq!(t.from, None);
        assert_eq!(t.to, 3);
    }

    #[test]
    fn selection_reports_deferral() {
        let mut t: Transition<u8, u8, u8, ()> = Transition::new(1, 2);
        t.defer = true;
        let sel = Selection::matched(t);
        assert!(sel.is_some());
        assert!(sel.deferred());

        let empty: Selection<u8, u8, u8, ()> = Selection::none();
        assert!(!empty.is_some());
        assert!(!empty.deferred());
    }

    #[test]
    fn cloned_transition_shares_action() {
        let mut t: Transition<u8, u8, u8, ()> = Transition::new(1, 2);
        t.action = Some(Arc::new(|_, _, _| Some(9)));
        let cloned = t.clone();
        let out = (cloned.action.unwrap())(&0, &mut (), &mut NullPublisher);
        assert_eq!(out, Some(9));
    }
}

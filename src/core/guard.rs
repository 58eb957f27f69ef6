//! Guard predicates for controlling transition selection.
//!
//! Guards are pure boolean functions consulted by the selector. They must
//! not mutate observable state; a rejecting guard is equivalent to the
//! candidate not existing.

use super::event::Alternative;
use std::sync::Arc;

/// Pure predicate over an event and the machine context.
///
/// A transition fires only when its guard is absent or evaluates true for
/// the incoming event. Guards compose with [`Guard::and`]; the builder
/// uses this to conjoin an alternative-matching guard with a user guard.
///
/// # Example
///
/// ```rust
/// use flywheel::core::Guard;
///
/// struct Ctx {
///     armed: bool,
/// }
///
/// let guard: Guard<u32, Ctx> = Guard::new(|event, ctx: &Ctx| ctx.armed && *event > 10);
///
/// assert!(guard.check(&25, &Ctx { armed: true }));
/// assert!(!guard.check(&25, &Ctx { armed: false }));
/// assert!(!guard.check(&5, &Ctx { armed: true }));
/// ```
pub struct Guard<E, C> {
    predicate: Arc<dyn Fn(&E, &C) -> bool + Send + Sync>,
}

impl<E, C> Guard<E, C> {
    /// Create a guard from a pure predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E, &C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Guard that holds when the event carries the given alternative.
    pub fn for_alternative<T>() -> Self
    where
        T: Alternative<E>,
    {
        Guard::new(|event, _ctx| T::holds(event))
    }

    /// Guard that holds when the event equals the given value.
    pub fn for_value(value: E) -> Self
    where
        E: PartialEq + Send + Sync + 'static,
    {
        Guard::new(move |event, _ctx| *event == value)
    }

    /// Conjunction: the combined guard holds only when both hold.
    pub fn and(self, other: Guard<E, C>) -> Self
    where
        E: 'static,
        C: 'static,
    {
        Guard::new(move |event, ctx| self.check(event, ctx) && other.check(event, ctx))
    }

    /// Evaluate the predicate.
    pub fn check(&self, event: &E, ctx: &C) -> bool {
        (self.predicate)(event, ctx)
    }
}

impl<E, C> Clone for Guard<E, C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

/// Pure predicate over the machine context only.
///
/// Completion transitions carry no event, so their guards see just the
/// context.
pub struct CompletionGuard<C> {
    predicate: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> CompletionGuard<C> {
    /// Create a completion guard from a pure predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        CompletionGuard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate.
    pub fn check(&self, ctx: &C) -> bool {
        (self.predicate)(ctx)
    }
}

impl<C> Clone for CompletionGuard<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Tick;

    #[derive(Clone, Debug, PartialEq)]
    enum Input {
        Tick(Tick),
        Level(u32),
    }

    impl Alternative<Input> for Tick {
        fn extract(event: &Input) -> Option<&Self> {
            match event {
                Input::Tick(inner) => Some(inner),
                _ => None,
            }
        }
    }

    #[test]
    fn guard_is_deterministic() {
        let guard: Guard<u32, ()> = Guard::new(|event, _| *event % 2 == 0);
        assert_eq!(guard.check(&4, &()), guard.check(&4, &()));
    }

    #[test]
    fn alternative_guard_matches_held_variant() {
        let guard: Guard<Input, ()> = Guard::for_alternative::<Tick>();
        assert!(guard.check(&Input::Tick(Tick), &()));
        assert!(!guard.check(&Input::Level(3), &()));
    }

    #[test]
    fn value_guard_requires_equality() {
        let guard: Guard<Input, ()> = Guard::for_value(Input::Level(3));
        assert!(guard.check(&Input::Level(3), &()));
        assert!(!guard.check(&Input::Level(4), &()));
        assert!(!guard.check(&Input::Tick(Tick), &()));
    }

    #[test]
    fn conjunction_requires_both() {
        let level: Guard<Input, u32> = Guard::new(|event, _| matches!(event, Input::Level(_)));
        let armed = Guard::new(|_, ctx: &u32| *ctx > 0);
        let combined = level.and(armed);

        assert!(combined.check(&Input::Level(1), &1));
        assert!(!combined.check(&Input::Level(1), &0));
        assert!(!combined.check(&Input::Tick(Tick), &1));
    }

    #[test]
    fn completion_guard_sees_context_only() {
        let guard: CompletionGuard<bool> = CompletionGuard::new(|ready| *ready);
        assert!(guard.check(&true));
        assert!(!guard.check(&false));
    }
}

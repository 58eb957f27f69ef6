//! Event alternative extraction.
//!
//! Events are sum types: one enum with a variant per event shape. The
//! selector matches transitions either on which alternative the event
//! currently holds (via this module's [`Alternative`] trait) or on whole
//! event equality (`on_value` paths, requiring `PartialEq`).

/// Identifies one alternative of an event enum.
///
/// Implemented by the payload type of each variant; `extract` returns the
/// payload when the event currently holds that variant. The
/// [`event_set!`](crate::event_set) macro generates implementations for
/// every variant of an event enum.
///
/// # Example
///
/// ```rust
/// use flywheel::core::Alternative;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Coin {
///     value: u32,
/// }
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Input {
///     Coin(Coin),
///     Push,
/// }
///
/// impl Alternative<Input> for Coin {
///     fn extract(event: &Input) -> Option<&Self> {
///         match event {
///             Input::Coin(coin) => Some(coin),
///             _ => None,
///         }
///     }
/// }
///
/// let event = Input::Coin(Coin { value: 25 });
/// assert!(Coin::holds(&event));
/// assert_eq!(Coin::extract(&event).unwrap().value, 25);
/// assert!(!Coin::holds(&Input::Push));
/// ```
pub trait Alternative<E>: Sized + 'static {
    /// Return the alternative's payload if `event` currently holds it.
    fn extract(event: &E) -> Option<&Self>;

    /// Check whether `event` currently holds this alternative.
    fn holds(event: &E) -> bool {
        Self::extract(event).is_some()
    }
}

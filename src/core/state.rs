//! Core State trait for state machine states.
//!
//! All machine states implement this trait. States are small value types
//! (typically field-less enums) that the dispatch tables key on.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// States are immutable values describing the current position in a state
/// machine. Transition and completion tables are keyed by source state,
/// which is why `Eq + Hash` are part of the bound.
///
/// # Required Traits
///
/// - `Clone`: states are cloned into trace records and hook arguments
/// - `Eq + Hash`: states key the per-source transition tables
/// - `Debug`: states must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: states must be serializable so traces
///   can be exported
///
/// The [`state_enum!`](crate::state_enum) macro generates a conforming
/// implementation for plain enums.
///
/// # Example
///
/// ```rust
/// use flywheel::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum DoorState {
///     Open,
///     Closed,
/// }
///
/// impl State for DoorState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///         }
///     }
/// }
///
/// assert_eq!(DoorState::Open.name(), "Open");
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Get the state's name for display/logging.
    ///
    /// Returns a static string reference for zero-cost naming.
    fn name(&self) -> &str;
}

//! Transition trace recording.
//!
//! The machine records every committed transition, whether fired by an
//! event or by a completion. Traces are serializable so a run can be
//! exported for inspection.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a recorded transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// A dispatched event selected the transition.
    Event,
    /// An anonymous completion transition fired.
    Completion,
}

/// Record of a single committed transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TraceEntry<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
    /// What fired the transition
    pub trigger: Trigger,
}

/// Ordered trace of committed transitions.
///
/// # Example
///
/// ```rust
/// use flywheel::core::{State, TraceEntry, TransitionTrace, Trigger};
/// use chrono::Utc;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Phase {
///     Load,
///     Run,
/// }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Load => "Load",
///             Self::Run => "Run",
///         }
///     }
/// }
///
/// let mut trace = TransitionTrace::new();
/// trace.record(TraceEntry {
///     from: Phase::Load,
///     to: Phase::Run,
///     timestamp: Utc::now(),
///     trigger: Trigger::Event,
/// });
///
/// let path = trace.path();
/// assert_eq!(path, vec![&Phase::Load, &Phase::Run]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransitionTrace<S: State> {
    entries: Vec<TraceEntry<S>>,
}

impl<S: State> TransitionTrace<S> {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a committed transition.
    pub fn record(&mut self, entry: TraceEntry<S>) {
        self.entries.push(entry);
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> &[TraceEntry<S>] {
        &self.entries
    }

    /// The path of states traversed: the first entry's source followed by
    /// every destination. Empty when nothing has committed yet.
    pub fn path(&self) -> Vec<&S> {
        let mut path = Vec::with_capacity(self.entries.len() + 1);
        if let Some(first) = self.entries.first() {
            path.push(&first.from);
        }
        path.extend(self.entries.iter().map(|entry| &entry.to));
        path
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether anything has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: State> Default for TransitionTrace<S> {
    fn default() -> Self {
        Self::new()
    }
}

// Input validation errors.
//
// The planner itself never fails: collisions, exhausted budgets and
// missing merge targets are all absorbed internally. The only caller-visible
// failure is a note list that breaks the ordering precondition, which is
// checked once at the boundary by `note::validate_notes` before planning.

use thiserror::Error;

/// A note list the planner cannot accept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A timestamp is NaN, infinite, or negative.
    #[error("note {index} has invalid timestamp {time_ms} ms")]
    InvalidTime { index: usize, time_ms: f64 },

    /// A note starts before the note preceding it.
    #[error("note {index} at {time_ms} ms precedes the previous note at {previous_ms} ms")]
    Unsorted {
        index: usize,
        time_ms: f64,
        previous_ms: f64,
    },
}

//! Runtime event stream payloads.

use crate::types::GestureSeq;

/// Events emitted from the single-writer organizer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizerEvent {
    /// Bucket contents or names changed.
    BucketsChanged {
        /// Gesture that caused it.
        seq: GestureSeq,
    },
    /// The selection changed.
    SelectionChanged {
        /// Gesture that caused it.
        seq: GestureSeq,
    },
    /// The filter changed.
    FilterChanged {
        /// Gesture that caused it.
        seq: GestureSeq,
    },
    /// A gesture was refused and changed nothing.
    Rejected {
        /// Gesture label.
        gesture: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// State through this gesture is saved.
    Persisted {
        /// Highest gesture known saved.
        seq: GestureSeq,
    },
    /// A save failed; in-memory state is unaffected.
    PersistFailed {
        /// Human-readable reason.
        message: String,
    },
}

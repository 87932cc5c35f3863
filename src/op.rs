//! Gesture model: every user action the organizer accepts.

use serde::{Deserialize, Serialize};

use crate::{
    core::transfer::Destination,
    filter::FilterKey,
    types::{BucketId, GestureSeq, StackId},
};

/// Stacks carried by a drag, resolved against the selection at drag start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    /// Stack the pointer grabbed.
    pub dragged: StackId,
    /// Every stack that moves with it.
    pub ids: Vec<StackId>,
    /// True when the dragged stack was not selected; on drop the selection
    /// becomes just that stack.
    pub collapse_selection: bool,
}

/// One discrete user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    /// Append a new empty bucket.
    CreateBucket {
        /// Display name.
        name: String,
    },
    /// Change a bucket's display name.
    RenameBucket {
        /// Bucket to rename.
        id: BucketId,
        /// New display name.
        name: String,
    },
    /// Remove a user bucket and return its stacks to the defaults.
    DeleteBucket {
        /// Bucket to delete.
        id: BucketId,
    },
    /// Drop a resolved drag payload.
    Drop {
        /// Dragged stacks.
        payload: DragPayload,
        /// Drop target.
        destination: Destination,
    },
    /// Drop raw drag data (a JSON array of stack ids).
    ///
    /// Carries no dragged stack, so the selection is left as it is.
    DropData {
        /// Encoded ids.
        data: String,
        /// Drop target.
        destination: Destination,
    },
    /// Peel one copy off a stack.
    Split {
        /// Stack to split.
        id: StackId,
    },
    /// Flip one stack's selection.
    ToggleSelection {
        /// Stack id.
        id: StackId,
    },
    /// Select-all-or-none over the current filter result.
    BulkToggleSelection,
    /// Empty the selection.
    ClearSelection,
    /// Flip one filter key.
    ToggleFilter {
        /// Key to flip.
        key: FilterKey,
    },
    /// Deactivate every filter key.
    ClearFilter,
}

impl Gesture {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateBucket { .. } => "create_bucket",
            Self::RenameBucket { .. } => "rename_bucket",
            Self::DeleteBucket { .. } => "delete_bucket",
            Self::Drop { .. } => "drop",
            Self::DropData { .. } => "drop_data",
            Self::Split { .. } => "split",
            Self::ToggleSelection { .. } => "toggle_selection",
            Self::BulkToggleSelection => "bulk_toggle_selection",
            Self::ClearSelection => "clear_selection",
            Self::ToggleFilter { .. } => "toggle_filter",
            Self::ClearFilter => "clear_filter",
        }
    }
}

/// Gesture that changed state, with its sequence and wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedGesture {
    /// Monotonic sequence within the session.
    pub seq: GestureSeq,
    /// Time applied, milliseconds since epoch.
    pub ts_ms: u64,
    /// The gesture itself.
    pub gesture: Gesture,
}

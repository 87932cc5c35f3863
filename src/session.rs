//! One deck's organizer: owns the buckets, selection, and filter, applies
//! gestures, and saves after every change.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::{
    card::{CardEntry, ExportLine, Stack},
    config::OrganizerConfig,
    core::{
        builder::build_stacks,
        store::{Bucket, BucketStore, BucketSummary, StoreError},
        transfer::{Destination, TransferError, TransferOutcome, TransferRequest},
    },
    filter::{FilterState, apply_filter},
    op::{AppliedGesture, DragPayload, Gesture},
    persist::{self, PersistResult, StateStore},
    selection::SelectionTracker,
    types::{BucketId, DeckKey, GestureSeq, StackId},
};

/// Why a gesture was refused. The session state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a gesture changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    BucketCreated(BucketId),
    BucketRenamed(BucketId),
    BucketDeleted { id: BucketId, redistributed: usize },
    Transfer(TransferOutcome),
    Selection { selected: usize },
    Filter,
    None,
}

/// Result of applying one gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub effect: Effect,
    /// Present when the gesture changed any state.
    pub applied: Option<AppliedGesture>,
    pub buckets_changed: bool,
    pub selection_changed: bool,
    pub rejected: Option<Rejection>,
    /// Set when the change stuck in memory but could not be saved.
    pub persist_warning: Option<String>,
}

impl Outcome {
    fn rejected(reason: Rejection) -> Self {
        Self {
            effect: Effect::None,
            applied: None,
            buckets_changed: false,
            selection_changed: false,
            rejected: Some(reason),
            persist_warning: None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.applied.is_some()
    }
}

pub struct Organizer {
    deck: DeckKey,
    config: OrganizerConfig,
    buckets: BucketStore,
    selection: SelectionTracker,
    filter: FilterState,
    store: Option<Box<dyn StateStore>>,
    next_seq: GestureSeq,
    restored: bool,
}

impl Organizer {
    /// Opens a session for `deck`.
    ///
    /// Saved state for the deck replaces the stacks built from `entries`
    /// entirely; without usable saved state the reserved buckets are seeded
    /// from `entries`.
    pub fn open(
        deck: impl Into<DeckKey>,
        entries: &[CardEntry],
        store: Option<Box<dyn StateStore>>,
        config: OrganizerConfig,
    ) -> Self {
        let deck = deck.into();
        let loaded = store
            .as_deref()
            .map(|s| persist::load_deck(s, &deck))
            .unwrap_or_default();

        let restored = loaded.buckets.is_some();
        let buckets = loaded.buckets.unwrap_or_else(|| {
            BucketStore::seeded(
                build_stacks(entries),
                &config.owned_bucket_name,
                &config.unowned_bucket_name,
            )
        });

        let mut selection = if config.persist_selection {
            loaded.selection.unwrap_or_default()
        } else {
            SelectionTracker::new()
        };
        let orphaned = selection.retain_existing(|id| buckets.contains_stack(id));
        if orphaned > 0 {
            debug!(deck = %deck, orphaned, "dropped selection ids with no stack");
        }

        info!(
            deck = %deck,
            restored,
            buckets = buckets.buckets().len(),
            cards = buckets.total_cards(),
            "organizer opened"
        );

        Self {
            deck,
            config,
            buckets,
            selection,
            filter: FilterState::new(),
            store,
            next_seq: 1,
            restored,
        }
    }

    pub fn deck(&self) -> &str {
        &self.deck
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Sequence of the most recent state-changing gesture, 0 before any.
    pub fn latest_seq(&self) -> GestureSeq {
        self.next_seq.saturating_sub(1)
    }

    /// True when the buckets came from saved state rather than the decklist.
    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn store(&self) -> &BucketStore {
        &self.buckets
    }

    pub fn buckets(&self) -> &[Bucket] {
        self.buckets.buckets()
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id) && self.buckets.contains_stack(id)
    }

    /// Selected ids that still name a stack, in display order.
    pub fn selected_ids(&self) -> Vec<StackId> {
        self.buckets
            .all_stacks()
            .filter(|s| self.selection.contains(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Every stack passing the current filter, across all buckets.
    pub fn visible_stacks(&self) -> Vec<&Stack> {
        apply_filter(self.buckets.all_stacks(), &self.filter)
    }

    /// Stacks of one bucket passing the current filter.
    pub fn visible_in(&self, bucket_id: &str) -> Option<Vec<&Stack>> {
        self.buckets
            .bucket(bucket_id)
            .map(|b| apply_filter(&b.cards, &self.filter))
    }

    pub fn export(&self, bucket_id: &str) -> Option<Vec<ExportLine>> {
        self.buckets.export(bucket_id)
    }

    pub fn summaries(&self) -> Vec<(BucketId, BucketSummary)> {
        self.buckets
            .buckets()
            .iter()
            .map(|b| (b.id.clone(), b.summary()))
            .collect()
    }

    /// Resolves which stacks a drag starting on `dragged` carries.
    ///
    /// A selected stack drags the whole selection; an unselected one drags
    /// alone. Nothing changes until the payload is dropped.
    pub fn drag_payload(&self, dragged: &str) -> Option<DragPayload> {
        if !self.buckets.contains_stack(dragged) {
            return None;
        }

        if self.selection.contains(dragged) {
            Some(DragPayload {
                dragged: dragged.to_string(),
                ids: self.selected_ids(),
                collapse_selection: false,
            })
        } else {
            Some(DragPayload {
                dragged: dragged.to_string(),
                ids: vec![dragged.to_string()],
                collapse_selection: true,
            })
        }
    }

    pub fn create_bucket(&mut self, name: impl Into<String>) -> Outcome {
        self.apply(Gesture::CreateBucket { name: name.into() })
    }

    pub fn rename_bucket(&mut self, id: impl Into<BucketId>, name: impl Into<String>) -> Outcome {
        self.apply(Gesture::RenameBucket {
            id: id.into(),
            name: name.into(),
        })
    }

    pub fn delete_bucket(&mut self, id: impl Into<BucketId>) -> Outcome {
        self.apply(Gesture::DeleteBucket { id: id.into() })
    }

    pub fn drop_payload(&mut self, payload: DragPayload, destination: Destination) -> Outcome {
        self.apply(Gesture::Drop {
            payload,
            destination,
        })
    }

    pub fn split(&mut self, id: impl Into<StackId>) -> Outcome {
        self.apply(Gesture::Split { id: id.into() })
    }

    pub fn toggle_selection(&mut self, id: impl Into<StackId>) -> Outcome {
        self.apply(Gesture::ToggleSelection { id: id.into() })
    }

    pub fn bulk_toggle_selection(&mut self) -> Outcome {
        self.apply(Gesture::BulkToggleSelection)
    }

    pub fn clear_selection(&mut self) -> Outcome {
        self.apply(Gesture::ClearSelection)
    }

    /// Applies one gesture to completion. Refused gestures leave every piece
    /// of state untouched and are reported in [`Outcome::rejected`].
    pub fn apply(&mut self, gesture: Gesture) -> Outcome {
        let selection_before = self.selection.clone();
        let kind = gesture.kind();

        let effect = match self.dispatch(&gesture) {
            Ok(effect) => effect,
            Err(reason) => {
                self.selection = selection_before;
                warn!(deck = %self.deck, gesture = kind, reason = %reason, "gesture ignored");
                return Outcome::rejected(reason);
            }
        };

        let buckets_changed = match &effect {
            Effect::BucketCreated(_) | Effect::BucketRenamed(_) | Effect::BucketDeleted { .. } => true,
            Effect::Transfer(outcome) => outcome.is_change(),
            Effect::Selection { .. } | Effect::Filter | Effect::None => false,
        };
        if buckets_changed {
            let buckets = &self.buckets;
            self.selection.retain_existing(|id| buckets.contains_stack(id));
        }
        let selection_changed = self.selection != selection_before;
        let filter_changed = matches!(effect, Effect::Filter);

        let applied = (buckets_changed || selection_changed || filter_changed).then(|| {
            let seq = self.next_seq;
            self.next_seq += 1;
            AppliedGesture {
                seq,
                ts_ms: now_ms(),
                gesture,
            }
        });

        let persist_warning = self.persist(buckets_changed, selection_changed);

        Outcome {
            effect,
            applied,
            buckets_changed,
            selection_changed,
            rejected: None,
            persist_warning,
        }
    }

    fn dispatch(&mut self, gesture: &Gesture) -> Result<Effect, Rejection> {
        match gesture {
            Gesture::CreateBucket { name } => Ok(Effect::BucketCreated(self.buckets.create_bucket(name.clone()))),
            Gesture::RenameBucket { id, name } => {
                self.buckets.rename_bucket(id, name.clone())?;
                Ok(Effect::BucketRenamed(id.clone()))
            }
            Gesture::DeleteBucket { id } => {
                let redistributed = self.buckets.delete_bucket(id)?;
                Ok(Effect::BucketDeleted {
                    id: id.clone(),
                    redistributed,
                })
            }
            Gesture::Drop {
                payload,
                destination,
            } => {
                let request = TransferRequest::new(payload.ids.iter().cloned(), destination.clone())?;
                let outcome = self.buckets.transfer(&request)?;
                // A dragged stack merged away is pruned with the other destroyed ids.
                if payload.collapse_selection {
                    self.selection.collapse_to(&payload.dragged);
                }
                Ok(Effect::Transfer(outcome))
            }
            Gesture::DropData { data, destination } => {
                let request = TransferRequest::from_drag_data(data, destination.clone())?;
                Ok(Effect::Transfer(self.buckets.transfer(&request)?))
            }
            Gesture::Split { id } => Ok(Effect::Transfer(self.buckets.split(id)?)),
            Gesture::ToggleSelection { id } => {
                if !self.buckets.contains_stack(id) {
                    return Err(StoreError::UnknownStack(id.clone()).into());
                }
                self.selection.toggle(id);
                Ok(Effect::Selection {
                    selected: self.selection.len(),
                })
            }
            Gesture::BulkToggleSelection => {
                let matching = apply_filter(self.buckets.all_stacks(), &self.filter);
                self.selection.bulk_toggle_by_filter(matching);
                Ok(Effect::Selection {
                    selected: self.selection.len(),
                })
            }
            Gesture::ClearSelection => {
                self.selection.clear();
                Ok(Effect::Selection { selected: 0 })
            }
            Gesture::ToggleFilter { key } => {
                self.filter.toggle(*key);
                Ok(Effect::Filter)
            }
            Gesture::ClearFilter => {
                if self.filter.is_empty() {
                    return Ok(Effect::None);
                }
                self.filter.clear();
                Ok(Effect::Filter)
            }
        }
    }

    fn persist(&mut self, buckets_changed: bool, selection_changed: bool) -> Option<String> {
        let store = self.store.as_mut()?;
        let save_selection = self.config.persist_selection && (buckets_changed || selection_changed);

        let mut result = Ok(());
        if buckets_changed {
            result = persist::save_buckets(&mut **store, &self.deck, &self.buckets);
        }
        if result.is_ok() && save_selection {
            result = persist::save_selection(&mut **store, &self.deck, &self.selection);
        }

        match result {
            Ok(()) => None,
            Err(err) => {
                warn!(deck = %self.deck, error = %err, "failed to save organizer state; keeping in-memory state");
                Some(err.to_string())
            }
        }
    }

    /// Hands the state store to the caller; the session stops saving.
    pub fn take_store(&mut self) -> Option<Box<dyn StateStore>> {
        self.store.take()
    }

    /// Writes both records regardless of what changed.
    pub fn save(&mut self) -> PersistResult<()> {
        let Some(store) = self.store.as_mut() else {
            return Ok(());
        };
        persist::save_buckets(&mut **store, &self.deck, &self.buckets)?;
        if self.config.persist_selection {
            persist::save_selection(&mut **store, &self.deck, &self.selection)?;
        }
        store.flush()
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

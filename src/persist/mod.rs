pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    core::store::{BucketStore, StoreSnapshotV1},
    selection::SelectionTracker,
    types::StackId,
};

/// Version number for serialized deck state records.
pub const STATE_FORMAT_VERSION: u16 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Independent record kinds stored per deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSlot {
    Buckets,
    Selection,
}

impl RecordSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buckets => "buckets",
            Self::Selection => "selection",
        }
    }
}

/// Keyed record storage. Keys are `(deck, slot)`; payloads are opaque text.
pub trait StateStore: Send {
    fn read(&self, deck: &str, slot: RecordSlot) -> PersistResult<Option<String>>;
    fn write(&mut self, deck: &str, slot: RecordSlot, payload: &str) -> PersistResult<()>;
    fn remove(&mut self, deck: &str, slot: RecordSlot) -> PersistResult<()>;
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketsRecord {
    format_version: u16,
    #[serde(flatten)]
    snapshot: StoreSnapshotV1,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SelectionRecord {
    format_version: u16,
    selected: Vec<StackId>,
}

/// Persisted state for one deck. Missing or unreadable records are `None`.
#[derive(Debug, Default)]
pub struct LoadedDeck {
    pub buckets: Option<BucketStore>,
    pub selection: Option<SelectionTracker>,
}

pub fn encode_buckets(snapshot: &StoreSnapshotV1) -> PersistResult<String> {
    Ok(serde_json::to_string(&BucketsRecord {
        format_version: STATE_FORMAT_VERSION,
        snapshot: snapshot.clone(),
    })?)
}

/// Decodes and validates a bucket record.
pub fn decode_buckets(payload: &str) -> PersistResult<BucketStore> {
    let record: BucketsRecord = serde_json::from_str(payload)?;
    if record.format_version != STATE_FORMAT_VERSION {
        return Err(PersistError::Message(format!(
            "unsupported bucket record version: {}",
            record.format_version
        )));
    }
    BucketStore::from_snapshot(record.snapshot)
        .map_err(|e| PersistError::Message(format!("invalid bucket record: {e}")))
}

pub fn encode_selection(selection: &SelectionTracker) -> PersistResult<String> {
    Ok(serde_json::to_string(&SelectionRecord {
        format_version: STATE_FORMAT_VERSION,
        selected: selection.sorted_ids(),
    })?)
}

pub fn decode_selection(payload: &str) -> PersistResult<SelectionTracker> {
    let record: SelectionRecord = serde_json::from_str(payload)?;
    if record.format_version != STATE_FORMAT_VERSION {
        return Err(PersistError::Message(format!(
            "unsupported selection record version: {}",
            record.format_version
        )));
    }
    Ok(SelectionTracker::from_ids(record.selected))
}

/// Loads both records for `deck`, treating any failure as an absent record.
pub fn load_deck(store: &dyn StateStore, deck: &str) -> LoadedDeck {
    let buckets = read_slot(store, deck, RecordSlot::Buckets, decode_buckets);
    let selection = read_slot(store, deck, RecordSlot::Selection, decode_selection);
    LoadedDeck { buckets, selection }
}

fn read_slot<T>(
    store: &dyn StateStore,
    deck: &str,
    slot: RecordSlot,
    decode: impl FnOnce(&str) -> PersistResult<T>,
) -> Option<T> {
    let payload = match store.read(deck, slot) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(deck = %deck, slot = slot.as_str(), "no saved record");
            return None;
        }
        Err(err) => {
            warn!(deck = %deck, slot = slot.as_str(), error = %err, "failed to read saved record");
            return None;
        }
    };

    match decode(&payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(deck = %deck, slot = slot.as_str(), error = %err, "discarding corrupt saved record");
            None
        }
    }
}

pub fn save_buckets(store: &mut dyn StateStore, deck: &str, buckets: &BucketStore) -> PersistResult<()> {
    let payload = encode_buckets(&buckets.export_snapshot())?;
    store.write(deck, RecordSlot::Buckets, &payload)
}

pub fn save_selection(
    store: &mut dyn StateStore,
    deck: &str,
    selection: &SelectionTracker,
) -> PersistResult<()> {
    let payload = encode_selection(selection)?;
    store.write(deck, RecordSlot::Selection, &payload)
}

/// Drops both saved records for `deck`.
pub fn forget_deck(store: &mut dyn StateStore, deck: &str) -> PersistResult<()> {
    store.remove(deck, RecordSlot::Buckets)?;
    store.remove(deck, RecordSlot::Selection)
}

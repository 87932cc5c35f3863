//! In-process record storage.

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use crate::types::DeckKey;

use super::{PersistError, PersistResult, RecordSlot, StateStore};

type Records = HashMap<(DeckKey, RecordSlot), String>;

/// Map-backed [`StateStore`]. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: Arc<Mutex<Records>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut Records) -> T) -> PersistResult<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| PersistError::Message("memory store lock poisoned".to_string()))?;
        Ok(f(&mut records))
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self, deck: &str, slot: RecordSlot) -> PersistResult<Option<String>> {
        self.with_records(|r| r.get(&(deck.to_string(), slot)).cloned())
    }

    fn write(&mut self, deck: &str, slot: RecordSlot, payload: &str) -> PersistResult<()> {
        self.with_records(|r| {
            r.insert((deck.to_string(), slot), payload.to_string());
        })
    }

    fn remove(&mut self, deck: &str, slot: RecordSlot) -> PersistResult<()> {
        self.with_records(|r| {
            r.remove(&(deck.to_string(), slot));
        })
    }
}

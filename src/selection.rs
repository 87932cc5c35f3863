//! Selected stack ids for the current deck.

use hashbrown::HashSet;

use crate::{card::Stack, types::StackId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionTracker {
    selected: HashSet<StackId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = StackId>) -> Self {
        Self {
            selected: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Flips membership of `id`, returning whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// Select-all-or-none over the stacks currently matching a filter.
    ///
    /// Returns true when the matches were selected, false when they were
    /// deselected.
    pub fn bulk_toggle_by_filter<'a, I>(&mut self, matching: I) -> bool
    where
        I: IntoIterator<Item = &'a Stack>,
    {
        let ids: Vec<&str> = matching.into_iter().map(|s| s.id.as_str()).collect();
        if ids.iter().all(|id| self.selected.contains(*id)) {
            for id in ids {
                self.selected.remove(id);
            }
            false
        } else {
            self.selected.extend(ids.into_iter().map(str::to_string));
            true
        }
    }

    /// Replaces the selection with the single id.
    pub fn collapse_to(&mut self, id: &str) {
        self.selected.clear();
        self.selected.insert(id.to_string());
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drops ids for stacks that no longer exist. Returns how many were dropped.
    pub fn retain_existing(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| exists(id));
        before - self.selected.len()
    }

    pub fn forget(&mut self, id: &str) -> bool {
        self.selected.remove(id)
    }

    /// Selected ids in a stable order for persistence.
    pub fn sorted_ids(&self) -> Vec<StackId> {
        let mut ids: Vec<StackId> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &StackId> {
        self.selected.iter()
    }
}

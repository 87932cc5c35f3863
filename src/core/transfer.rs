use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{BucketId, StackId};

use super::store::{BucketStore, StoreError, locate_in};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("malformed transfer payload: {0}")]
    Malformed(String),
    #[error("transfer payload names no stacks")]
    EmptyPayload,
    #[error("stack `{0}` is no longer in any bucket")]
    StaleStack(StackId),
    #[error("bucket `{0}` no longer exists")]
    StaleBucket(BucketId),
    #[error("merging into `{0}` overflows its count")]
    CountOverflow(StackId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drop target of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Empty area of a bucket.
    Bucket(BucketId),
    /// An existing stack; merges when names agree.
    Stack(StackId),
}

/// Stacks to move and where to put them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    source_ids: Vec<StackId>,
    destination: Destination,
}

impl TransferRequest {
    /// Builds a request, dropping repeated ids but keeping first-seen order.
    pub fn new<I, S>(source_ids: I, destination: Destination) -> Result<Self, TransferError>
    where
        I: IntoIterator<Item = S>,
        S: Into<StackId>,
    {
        let mut ids: Vec<StackId> = Vec::new();
        for id in source_ids {
            let id = id.into();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        Ok(Self {
            source_ids: ids,
            destination,
        })
    }

    /// Decodes drag data carrying a JSON array of stack ids.
    pub fn from_drag_data(data: &str, destination: Destination) -> Result<Self, TransferError> {
        let ids: Vec<StackId> =
            serde_json::from_str(data).map_err(|e| TransferError::Malformed(e.to_string()))?;
        if ids.iter().any(|id| id.is_empty()) {
            return Err(TransferError::Malformed("empty stack id".to_string()));
        }
        Self::new(ids, destination)
    }

    pub fn source_ids(&self) -> &[StackId] {
        &self.source_ids
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// What a committed transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Stacks now sit at the end of `bucket`.
    Moved {
        bucket: BucketId,
        moved: Vec<StackId>,
    },
    /// `absorbed` stacks were folded into `target` and no longer exist.
    Merged {
        target: StackId,
        absorbed: Vec<StackId>,
    },
    /// One copy left `original` as the new stack `created`.
    Split {
        original: StackId,
        created: StackId,
        original_removed: bool,
    },
    /// Nothing needed to change.
    Unchanged,
}

impl TransferOutcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Ids that no longer exist after this transition.
    pub fn destroyed_ids(&self) -> Vec<StackId> {
        match self {
            Self::Merged { absorbed, .. } => absorbed.clone(),
            Self::Split {
                original,
                original_removed: true,
                ..
            } => vec![original.clone()],
            _ => Vec::new(),
        }
    }
}

impl BucketStore {
    /// Applies a drop. Either the whole request commits or the store is untouched.
    pub fn transfer(&mut self, request: &TransferRequest) -> Result<TransferOutcome, TransferError> {
        match request.destination() {
            Destination::Bucket(bucket) => self.move_to_bucket(request.source_ids(), bucket),
            Destination::Stack(target) => self.move_to_stack(request.source_ids(), target),
        }
    }

    fn move_to_bucket(
        &mut self,
        ids: &[StackId],
        bucket_id: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let dest = self
            .bucket_index(bucket_id)
            .ok_or_else(|| TransferError::StaleBucket(bucket_id.to_string()))?;
        self.ensure_present(ids)?;

        let mut next = self.buckets().to_vec();
        let mut moved = Vec::new();
        for id in ids {
            let loc = locate_in(&next, id).ok_or_else(|| TransferError::StaleStack(id.clone()))?;
            if loc.bucket == dest {
                continue;
            }
            let stack = next[loc.bucket].cards.remove(loc.pos);
            next[dest].cards.push(stack);
            moved.push(id.clone());
        }

        if moved.is_empty() {
            debug!(bucket = %bucket_id, "all dragged stacks already in destination");
            return Ok(TransferOutcome::Unchanged);
        }

        self.commit(next)?;
        debug!(bucket = %bucket_id, count = moved.len(), "stacks moved");
        Ok(TransferOutcome::Moved {
            bucket: bucket_id.to_string(),
            moved,
        })
    }

    fn move_to_stack(&mut self, ids: &[StackId], target: &str) -> Result<TransferOutcome, TransferError> {
        let target_loc = self
            .locate(target)
            .ok_or_else(|| TransferError::StaleStack(target.to_string()))?;
        let sources: Vec<StackId> = ids.iter().filter(|id| *id != target).cloned().collect();
        if sources.is_empty() {
            return Ok(TransferOutcome::Unchanged);
        }
        self.ensure_present(&sources)?;

        let target_bucket = &self.buckets()[target_loc.bucket];
        let target_name = &target_bucket.cards[target_loc.pos].name;
        let same_name = sources
            .iter()
            .all(|id| self.stack(id).is_some_and(|s| &s.name == target_name));
        if !same_name {
            let bucket_id = target_bucket.id.clone();
            debug!(target = %target, bucket = %bucket_id, "names differ, moving instead of merging");
            return self.move_to_bucket(&sources, &bucket_id);
        }

        let mut next = self.buckets().to_vec();
        let (mut owned, mut unowned) = (0u32, 0u32);
        for id in &sources {
            let loc = locate_in(&next, id).ok_or_else(|| TransferError::StaleStack(id.clone()))?;
            let stack = next[loc.bucket].cards.remove(loc.pos);
            owned = owned
                .checked_add(stack.owned_count)
                .ok_or_else(|| TransferError::CountOverflow(target.to_string()))?;
            unowned = unowned
                .checked_add(stack.unowned_count)
                .ok_or_else(|| TransferError::CountOverflow(target.to_string()))?;
        }

        let loc = locate_in(&next, target).ok_or_else(|| TransferError::StaleStack(target.to_string()))?;
        let merged = &mut next[loc.bucket].cards[loc.pos];
        merged.owned_count = merged
            .owned_count
            .checked_add(owned)
            .ok_or_else(|| TransferError::CountOverflow(target.to_string()))?;
        merged.unowned_count = merged
            .unowned_count
            .checked_add(unowned)
            .ok_or_else(|| TransferError::CountOverflow(target.to_string()))?;

        self.commit(next)?;
        debug!(target = %target, absorbed = sources.len(), "stacks merged");
        Ok(TransferOutcome::Merged {
            target: target.to_string(),
            absorbed: sources,
        })
    }

    /// Peels one copy off stack `id` into a new stack placed right after it.
    ///
    /// Singletons are left alone. The copy comes out of the stack's own
    /// partition count when it has one, otherwise out of the other count.
    pub fn split(&mut self, id: &str) -> Result<TransferOutcome, TransferError> {
        let loc = self
            .locate(id)
            .ok_or_else(|| TransferError::StaleStack(id.to_string()))?;
        if self.buckets()[loc.bucket].cards[loc.pos].total() <= 1 {
            return Ok(TransferOutcome::Unchanged);
        }

        let mut next = self.buckets().to_vec();
        let created = self.next_split_id(id, &next);
        let original = &mut next[loc.bucket].cards[loc.pos];
        let take_owned = if original.is_owned {
            original.owned_count > 0
        } else {
            original.unowned_count == 0
        };

        let mut piece = original.clone();
        piece.id = created.clone();
        if take_owned {
            original.owned_count -= 1;
            piece.owned_count = 1;
            piece.unowned_count = 0;
        } else {
            original.unowned_count -= 1;
            piece.owned_count = 0;
            piece.unowned_count = 1;
        }
        let original_removed = original.is_empty();

        let cards = &mut next[loc.bucket].cards;
        cards.insert(loc.pos + 1, piece);
        if original_removed {
            cards.remove(loc.pos);
        }

        self.commit(next)?;
        debug!(original = %id, created = %created, "stack split");
        Ok(TransferOutcome::Split {
            original: id.to_string(),
            created,
            original_removed,
        })
    }

    fn ensure_present(&self, ids: &[StackId]) -> Result<(), TransferError> {
        match ids.iter().find(|id| !self.contains_stack(id)) {
            Some(stale) => Err(TransferError::StaleStack(stale.clone())),
            None => Ok(()),
        }
    }
}

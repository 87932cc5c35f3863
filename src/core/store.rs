use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    card::{ExportLine, Stack},
    types::{BucketId, OWNED_BUCKET_ID, Ownership, StackId, UNOWNED_BUCKET_ID, is_reserved_bucket},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("bucket `{0}` is reserved and cannot be deleted")]
    ReservedBucket(BucketId),
    #[error("unknown bucket `{0}`")]
    UnknownBucket(BucketId),
    #[error("unknown stack `{0}`")]
    UnknownStack(StackId),
    #[error("reserved bucket `{0}` is missing")]
    MissingReservedBucket(BucketId),
    #[error("bucket id `{0}` is used more than once")]
    DuplicateBucket(BucketId),
    #[error("stack id `{0}` is used more than once")]
    DuplicateStack(StackId),
    #[error("stack `{0}` holds no cards")]
    EmptyStack(StackId),
}

/// User-named container of stacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: BucketId,
    pub name: String,
    pub cards: Vec<Stack>,
}

impl Bucket {
    pub fn new(id: impl Into<BucketId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cards: Vec::new(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved_bucket(&self.id)
    }

    pub fn export(&self) -> Vec<ExportLine> {
        self.cards.iter().map(Stack::export_line).collect()
    }

    pub fn summary(&self) -> BucketSummary {
        let mut summary = BucketSummary {
            stacks: self.cards.len(),
            ..BucketSummary::default()
        };
        for stack in &self.cards {
            summary.owned += u64::from(stack.owned_count);
            summary.unowned += u64::from(stack.unowned_count);
            if let Some(price) = stack.price_usd {
                summary.unowned_value_usd += price * f64::from(stack.unowned_count);
            }
        }
        summary.total = summary.owned + summary.unowned;
        summary
    }
}

/// Aggregate counts shown next to a bucket header.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketSummary {
    pub stacks: usize,
    pub owned: u64,
    pub unowned: u64,
    pub total: u64,
    /// Market value of the copies still to be acquired.
    pub unowned_value_usd: f64,
}

/// Position of a stack inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackLocation {
    pub bucket: usize,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    pub buckets: Vec<Bucket>,
    #[serde(default)]
    pub next_bucket_seq: u64,
    #[serde(default)]
    pub next_split_seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketStore {
    buckets: Vec<Bucket>,
    next_bucket_seq: u64,
    next_split_seq: u64,
}

impl BucketStore {
    /// Seeds the two reserved buckets from builder output.
    pub fn seeded(stacks: Vec<Stack>, owned_name: &str, unowned_name: &str) -> Self {
        let mut owned = Bucket::new(OWNED_BUCKET_ID, owned_name);
        let mut unowned = Bucket::new(UNOWNED_BUCKET_ID, unowned_name);
        for stack in stacks {
            match stack.ownership() {
                Ownership::Owned => owned.cards.push(stack),
                Ownership::Unowned => unowned.cards.push(stack),
            }
        }

        Self {
            buckets: vec![owned, unowned],
            next_bucket_seq: 1,
            next_split_seq: 1,
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Result<Self, StoreError> {
        validate_buckets(&snapshot.buckets)?;
        Ok(Self {
            buckets: snapshot.buckets,
            next_bucket_seq: snapshot.next_bucket_seq.max(1),
            next_split_seq: snapshot.next_split_seq.max(1),
        })
    }

    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            buckets: self.buckets.clone(),
            next_bucket_seq: self.next_bucket_seq,
            next_split_seq: self.next_split_seq,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bucket(&self, id: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.id == id)
    }

    pub fn bucket_index(&self, id: &str) -> Option<usize> {
        self.buckets.iter().position(|b| b.id == id)
    }

    pub fn locate(&self, id: &str) -> Option<StackLocation> {
        locate_in(&self.buckets, id)
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.locate(id)
            .map(|loc| &self.buckets[loc.bucket].cards[loc.pos])
    }

    /// Bucket currently holding stack `id`.
    pub fn bucket_of(&self, id: &str) -> Option<&Bucket> {
        self.locate(id).map(|loc| &self.buckets[loc.bucket])
    }

    pub fn contains_stack(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    /// Every stack in bucket order, then stack order.
    pub fn all_stacks(&self) -> impl Iterator<Item = &Stack> {
        self.buckets.iter().flat_map(|b| b.cards.iter())
    }

    pub fn stack_ids(&self) -> HashSet<&str> {
        self.all_stacks().map(|s| s.id.as_str()).collect()
    }

    pub fn total_cards(&self) -> u64 {
        self.all_stacks().map(Stack::total).sum()
    }

    pub fn export(&self, bucket_id: &str) -> Option<Vec<ExportLine>> {
        self.bucket(bucket_id).map(Bucket::export)
    }

    /// Appends an empty bucket and returns its generated id.
    pub fn create_bucket(&mut self, name: impl Into<String>) -> BucketId {
        let id = loop {
            let candidate = format!("bucket-{}", self.next_bucket_seq);
            self.next_bucket_seq += 1;
            if self.bucket_index(&candidate).is_none() {
                break candidate;
            }
        };

        let bucket = Bucket::new(id.clone(), name);
        info!(bucket = %id, name = %bucket.name, "bucket created");
        self.buckets.push(bucket);
        id
    }

    pub fn rename_bucket(&mut self, id: &str, name: impl Into<String>) -> Result<(), StoreError> {
        let bucket = self
            .buckets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::UnknownBucket(id.to_string()))?;
        bucket.name = name.into();
        debug!(bucket = %id, name = %bucket.name, "bucket renamed");
        Ok(())
    }

    /// Removes a user bucket, returning its stacks to the reserved buckets by
    /// partition. Returns how many stacks were redistributed.
    pub fn delete_bucket(&mut self, id: &str) -> Result<usize, StoreError> {
        if is_reserved_bucket(id) {
            return Err(StoreError::ReservedBucket(id.to_string()));
        }
        let idx = self
            .bucket_index(id)
            .ok_or_else(|| StoreError::UnknownBucket(id.to_string()))?;

        let mut next = self.buckets.clone();
        let removed = next.remove(idx);
        let moved = removed.cards.len();
        for stack in removed.cards {
            let home = stack.ownership().home_bucket();
            let home_idx = next
                .iter()
                .position(|b| b.id == home)
                .ok_or_else(|| StoreError::MissingReservedBucket(home.to_string()))?;
            next[home_idx].cards.push(stack);
        }

        self.commit(next)?;
        info!(bucket = %id, redistributed = moved, "bucket deleted");
        Ok(moved)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_buckets(&self.buckets)
    }

    /// Replaces the whole bucket list after validating it.
    pub(super) fn commit(&mut self, next: Vec<Bucket>) -> Result<(), StoreError> {
        validate_buckets(&next)?;
        self.buckets = next;
        Ok(())
    }

    /// Reserves a split id derived from `base` that no stack in `buckets` uses.
    pub(super) fn next_split_id(&mut self, base: &str, buckets: &[Bucket]) -> StackId {
        loop {
            let candidate = format!("{base}-split-{}", self.next_split_seq);
            self.next_split_seq += 1;
            if locate_in(buckets, &candidate).is_none() {
                return candidate;
            }
        }
    }
}

pub(super) fn locate_in(buckets: &[Bucket], id: &str) -> Option<StackLocation> {
    buckets.iter().enumerate().find_map(|(bucket, b)| {
        b.cards
            .iter()
            .position(|s| s.id == id)
            .map(|pos| StackLocation { bucket, pos })
    })
}

/// Checks the structural invariants every committed bucket list must hold.
pub fn validate_buckets(buckets: &[Bucket]) -> Result<(), StoreError> {
    for reserved in [OWNED_BUCKET_ID, UNOWNED_BUCKET_ID] {
        if !buckets.iter().any(|b| b.id == reserved) {
            return Err(StoreError::MissingReservedBucket(reserved.to_string()));
        }
    }

    let mut bucket_ids = HashSet::with_capacity(buckets.len());
    let mut stack_ids = HashSet::new();
    for bucket in buckets {
        if !bucket_ids.insert(bucket.id.as_str()) {
            return Err(StoreError::DuplicateBucket(bucket.id.clone()));
        }
        for stack in &bucket.cards {
            if stack.is_empty() {
                return Err(StoreError::EmptyStack(stack.id.clone()));
            }
            if !stack_ids.insert(stack.id.as_str()) {
                return Err(StoreError::DuplicateStack(stack.id.clone()));
            }
        }
    }

    Ok(())
}

use hashbrown::HashSet;
use tracing::debug;

use crate::{
    card::{CardEntry, Stack},
    types::StackId,
};

/// Id of the owned-partition stack for `name`.
pub fn owned_stack_id(name: &str) -> StackId {
    format!("{name}-owned")
}

/// Id of the unowned-partition stack for `name`.
pub fn unowned_stack_id(name: &str) -> StackId {
    format!("{name}-unowned")
}

/// Converts enriched entries into ownership-partitioned stacks, in entry order.
///
/// Each card yields at most one owned stack followed by at most one unowned
/// stack. Cards with nothing on either side are dropped. When a name repeats,
/// only its first entry is used.
pub fn build_stacks(entries: &[CardEntry]) -> Vec<Stack> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    let mut out = Vec::with_capacity(entries.len() * 2);

    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            debug!(card = %entry.name, "duplicate decklist entry ignored");
            continue;
        }

        let (owned, unowned) = entry.partition_counts();
        if owned > 0 {
            out.push(partition_stack(entry, true, owned));
        }
        if unowned > 0 {
            out.push(partition_stack(entry, false, unowned));
        }
    }

    out
}

fn partition_stack(entry: &CardEntry, is_owned: bool, count: u32) -> Stack {
    let (id, owned_count, unowned_count) = if is_owned {
        (owned_stack_id(&entry.name), count, 0)
    } else {
        (unowned_stack_id(&entry.name), 0, count)
    };

    Stack {
        id,
        name: entry.name.clone(),
        owned_count,
        unowned_count,
        image_url: entry.image_url.clone(),
        rarity: entry.rarity,
        is_owned,
        price_usd: entry.price_usd,
    }
}

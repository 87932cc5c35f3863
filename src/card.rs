//! Enriched card entries, stacks, and export lines.

use serde::{Deserialize, Serialize};

use crate::types::{CardStatus, Ownership, Rarity, StackId};

/// One decklist row after enrichment against the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    /// Card name, unique within a decklist.
    pub name: String,
    /// Copies the deck requires.
    pub required_quantity: u32,
    /// Copies found in the collection.
    #[serde(default)]
    pub owned_quantity: u32,
    /// Copies still to be proxied.
    #[serde(default)]
    pub net_needed_quantity: u32,
    /// Match status.
    pub status: CardStatus,
    /// Card art location.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Rarity, when the card database knows it.
    #[serde(default)]
    pub rarity: Option<Rarity>,
    /// Unit market price in USD.
    #[serde(default)]
    pub price_usd: Option<f64>,
}

impl CardEntry {
    /// Returns `(owned, unowned)` copy counts implied by the status.
    pub fn partition_counts(&self) -> (u32, u32) {
        match self.status {
            CardStatus::Complete => (self.required_quantity, 0),
            CardStatus::ProxyNeeded => (self.owned_quantity, self.net_needed_quantity),
            CardStatus::Missing | CardStatus::ErrorNotFound => (0, self.required_quantity),
        }
    }
}

/// Organizable quantity of one named card under one ownership partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    /// Stable stack id.
    pub id: StackId,
    /// Card name.
    pub name: String,
    /// Owned copies in this stack.
    pub owned_count: u32,
    /// Unowned copies in this stack.
    pub unowned_count: u32,
    /// Card art location.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Rarity.
    #[serde(default)]
    pub rarity: Option<Rarity>,
    /// Partition flag fixed at creation.
    pub is_owned: bool,
    /// Unit market price in USD.
    #[serde(default)]
    pub price_usd: Option<f64>,
}

impl Stack {
    /// Total copies.
    pub fn total(&self) -> u64 {
        u64::from(self.owned_count) + u64::from(self.unowned_count)
    }

    /// True when the stack holds no copies and must leave its bucket.
    pub fn is_empty(&self) -> bool {
        self.owned_count == 0 && self.unowned_count == 0
    }

    /// Partition this stack was created under.
    pub fn ownership(&self) -> Ownership {
        Ownership::of(self.is_owned)
    }

    /// Flat export line for this stack.
    pub fn export_line(&self) -> ExportLine {
        ExportLine {
            name: self.name.clone(),
            quantity: self.total(),
        }
    }
}

/// Shape consumed by the PDF sheet generator and the plain-text exporter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportLine {
    /// Card name.
    pub name: String,
    /// Copies to print or list.
    pub quantity: u64,
}

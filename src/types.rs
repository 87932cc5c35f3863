//! Shared primitive ids, reserved bucket ids, and card enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Opaque, stable stack identifier.
pub type StackId = String;
/// Opaque bucket identifier.
pub type BucketId = String;
/// Deck identity used to key persisted state.
pub type DeckKey = String;
/// Monotonic gesture sequence number.
pub type GestureSeq = u64;

/// Reserved bucket holding owned-partition stacks.
pub const OWNED_BUCKET_ID: &str = "owned";
/// Reserved bucket holding unowned-partition stacks.
pub const UNOWNED_BUCKET_ID: &str = "unowned";

/// Returns true for the two non-deletable default buckets.
pub fn is_reserved_bucket(id: &str) -> bool {
    id == OWNED_BUCKET_ID || id == UNOWNED_BUCKET_ID
}

/// Card rarity as reported by the enrichment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    /// Rarest printing.
    Unique,
    /// Elite.
    Elite,
    /// Exceptional.
    Exceptional,
    /// Common printing.
    Ordinary,
}

impl Rarity {
    /// All rarities in display order.
    pub const ALL: [Rarity; 4] = [Self::Unique, Self::Elite, Self::Exceptional, Self::Ordinary];

    /// Wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "Unique",
            Self::Elite => "Elite",
            Self::Exceptional => "Exceptional",
            Self::Ordinary => "Ordinary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Collection match status computed by the enrichment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    /// Collection covers the full required quantity.
    Complete,
    /// Collection covers part of the required quantity.
    #[serde(rename = "Proxy_Needed")]
    ProxyNeeded,
    /// Card not in the collection.
    Missing,
    /// Card name could not be resolved against the card database.
    #[serde(rename = "Error_Not_Found")]
    ErrorNotFound,
}

/// Ownership partition of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// Owned-partition stack.
    Owned,
    /// Unowned-partition stack.
    Unowned,
}

impl Ownership {
    /// Partition for an `is_owned` flag.
    pub fn of(is_owned: bool) -> Self {
        if is_owned { Self::Owned } else { Self::Unowned }
    }

    /// Reserved bucket that receives stacks of this partition.
    pub fn home_bucket(self) -> &'static str {
        match self {
            Self::Owned => OWNED_BUCKET_ID,
            Self::Unowned => UNOWNED_BUCKET_ID,
        }
    }
}

/// Unit price tier used by the price filter category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    /// Under one dollar.
    Budget,
    /// One dollar up to, but excluding, ten dollars.
    Mid,
    /// Ten dollars and above.
    Premium,
}

impl PriceTier {
    /// Tier for a USD unit price. Negative and non-finite prices have no tier.
    pub fn of(price_usd: f64) -> Option<Self> {
        if !price_usd.is_finite() || price_usd < 0.0 {
            return None;
        }
        Some(if price_usd < 1.0 {
            Self::Budget
        } else if price_usd < 10.0 {
            Self::Mid
        } else {
            Self::Premium
        })
    }
}

/// Returned when a string key names no known rarity or filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

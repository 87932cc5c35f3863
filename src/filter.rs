//! Toggle filters over stacks: OR within a category, AND across categories.

use std::{fmt, str::FromStr};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    card::Stack,
    types::{Ownership, PriceTier, Rarity, UnknownKey},
};

/// One toggleable filter key as shown in the filter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKey {
    /// Rarity category.
    Rarity(Rarity),
    /// Ownership category.
    Ownership(Ownership),
    /// Price category.
    Price(PriceTier),
}

impl FromStr for FilterKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Owned" => Ok(Self::Ownership(Ownership::Owned)),
            "Unowned" => Ok(Self::Ownership(Ownership::Unowned)),
            "Budget" => Ok(Self::Price(PriceTier::Budget)),
            "Mid" => Ok(Self::Price(PriceTier::Mid)),
            "Premium" => Ok(Self::Price(PriceTier::Premium)),
            other => other.parse().map(Self::Rarity),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rarity(r) => f.write_str(r.as_str()),
            Self::Ownership(Ownership::Owned) => f.write_str("Owned"),
            Self::Ownership(Ownership::Unowned) => f.write_str("Unowned"),
            Self::Price(PriceTier::Budget) => f.write_str("Budget"),
            Self::Price(PriceTier::Mid) => f.write_str("Mid"),
            Self::Price(PriceTier::Premium) => f.write_str("Premium"),
        }
    }
}

/// Active filter keys, grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    rarities: HashSet<Rarity>,
    ownership: HashSet<Ownership>,
    prices: HashSet<PriceTier>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state with exactly `keys` active.
    pub fn with_keys(keys: impl IntoIterator<Item = FilterKey>) -> Self {
        let mut state = Self::new();
        for key in keys {
            state.set(key, true);
        }
        state
    }

    pub fn is_active(&self, key: FilterKey) -> bool {
        match key {
            FilterKey::Rarity(r) => self.rarities.contains(&r),
            FilterKey::Ownership(o) => self.ownership.contains(&o),
            FilterKey::Price(p) => self.prices.contains(&p),
        }
    }

    pub fn set(&mut self, key: FilterKey, active: bool) {
        fn apply<T: Eq + std::hash::Hash>(set: &mut HashSet<T>, value: T, active: bool) {
            if active {
                set.insert(value);
            } else {
                set.remove(&value);
            }
        }

        match key {
            FilterKey::Rarity(r) => apply(&mut self.rarities, r, active),
            FilterKey::Ownership(o) => apply(&mut self.ownership, o, active),
            FilterKey::Price(p) => apply(&mut self.prices, p, active),
        }
    }

    /// Flips `key`, returning its new state.
    pub fn toggle(&mut self, key: FilterKey) -> bool {
        let active = !self.is_active(key);
        self.set(key, active);
        active
    }

    pub fn clear(&mut self) {
        self.rarities.clear();
        self.ownership.clear();
        self.prices.clear();
    }

    /// True when no key in any category is active.
    pub fn is_empty(&self) -> bool {
        self.rarities.is_empty() && self.ownership.is_empty() && self.prices.is_empty()
    }

    pub fn matches(&self, stack: &Stack) -> bool {
        let rarity_ok = self.rarities.is_empty()
            || stack.rarity.is_some_and(|r| self.rarities.contains(&r));
        let ownership_ok = self.ownership.is_empty() || self.ownership.contains(&stack.ownership());
        let price_ok = self.prices.is_empty()
            || stack
                .price_usd
                .and_then(PriceTier::of)
                .is_some_and(|tier| self.prices.contains(&tier));

        rarity_ok && ownership_ok && price_ok
    }
}

/// Stacks passing `filter`, in input order.
pub fn apply_filter<'a, I>(stacks: I, filter: &FilterState) -> Vec<&'a Stack>
where
    I: IntoIterator<Item = &'a Stack>,
{
    stacks.into_iter().filter(|s| filter.matches(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_keys_round_trip_through_display() {
        for raw in ["Unique", "Elite", "Exceptional", "Ordinary", "Owned", "Unowned", "Budget", "Mid", "Premium"] {
            let key: FilterKey = raw.parse().expect("known key");
            assert_eq!(key.to_string(), raw);
        }
        assert!("Mythic".parse::<FilterKey>().is_err());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = FilterState::new();
        let key = FilterKey::Ownership(Ownership::Owned);
        assert!(state.toggle(key));
        assert!(!state.is_empty());
        assert!(!state.toggle(key));
        assert!(state.is_empty());
    }
}

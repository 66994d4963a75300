// Per-slot optimum table.
//
// For every (slot, token cost, trait count) key the finder records the best
// achievable item score and every item that reaches it. Keys that can never
// help a build (no matching item, or beaten by a key with the same tokens and
// more traits) go into the fail cache so the character search can skip them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::catalog::{CardId, Item, ItemId, ItemsBySlot, SlotType, TokenCost};
use crate::error::OptimizeError;
use crate::packs::CardWeights;

use super::config::same_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinderKey {
    pub slot: SlotType,
    pub cost: TokenCost,
    pub traits: u8,
}

impl FinderKey {
    pub fn new(slot: SlotType, cost: TokenCost, traits: u8) -> Self {
        Self { slot, cost, traits }
    }

    /// Every key an item of this slot type could occupy.
    pub fn all_for(slot: SlotType) -> impl Iterator<Item = FinderKey> {
        slot.cost_options().iter().flat_map(move |cost| {
            (0..=slot.max_traits()).map(move |traits| FinderKey::new(slot, *cost, traits))
        })
    }
}

impl fmt::Display for FinderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} with {} traits", self.slot, self.cost, self.traits)
    }
}

/// Best score for a key and every item that reaches it (ascending item id).
#[derive(Debug, Clone, PartialEq)]
pub struct SlotChoice<'a> {
    pub score: f64,
    pub items: Vec<&'a Item>,
}

impl SlotChoice<'_> {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }
}

pub struct ItemFinder<'a> {
    items: ItemsBySlot<'a>,
    weights: &'a CardWeights,
    trait_counts: HashMap<ItemId, u8>,
    table: Option<HashMap<FinderKey, SlotChoice<'a>>>,
    fail_cache: HashSet<FinderKey>,
}

impl<'a> ItemFinder<'a> {
    pub fn new(
        items: ItemsBySlot<'a>,
        weights: &'a CardWeights,
        is_trait: impl Fn(CardId) -> bool,
    ) -> Self {
        let trait_counts = items
            .values()
            .flatten()
            .map(|item| {
                let traits = item.cards.iter().filter(|card| is_trait(**card)).count();
                (item.id, traits as u8)
            })
            .collect();
        Self {
            items,
            weights,
            trait_counts,
            table: None,
            fail_cache: HashSet::new(),
        }
    }

    /// Slot types this finder was populated with, in a stable order.
    pub fn slots(&self) -> Vec<SlotType> {
        let mut slots: Vec<SlotType> = self.items.keys().copied().collect();
        slots.sort();
        slots
    }

    /// Score of `item` at `key`, or `None` if the item does not match the key.
    pub fn score_item(&self, item: &Item, key: &FinderKey) -> Option<f64> {
        if item.slot != key.slot || item.cost != key.cost {
            return None;
        }
        if self.trait_counts.get(&item.id).copied() != Some(key.traits) {
            return None;
        }
        Some(item.cards.iter().map(|card| self.weights.get(*card)).sum())
    }

    fn best_for(&self, key: &FinderKey) -> SlotChoice<'a> {
        let mut best = SlotChoice {
            score: 0.0,
            items: Vec::new(),
        };
        let Some(candidates) = self.items.get(&key.slot) else {
            return best;
        };
        for item in candidates.iter().copied() {
            let Some(score) = self.score_item(item, key) else {
                continue;
            };
            if best.items.is_empty() || (score > best.score && !same_score(score, best.score)) {
                best.score = score;
                best.items.clear();
                best.items.push(item);
            } else if same_score(score, best.score) {
                best.items.push(item);
            }
        }
        best.items.sort_by_key(|item| item.id);
        best
    }

    /// Evaluate every key for every slot and rebuild the fail cache.
    pub fn find_all(&mut self) {
        let mut table = HashMap::new();
        for slot in self.slots() {
            for key in FinderKey::all_for(slot) {
                table.insert(key, self.best_for(&key));
            }
        }

        let mut fail_cache = HashSet::new();
        for (key, choice) in &table {
            if choice.items.is_empty() {
                fail_cache.insert(*key);
                continue;
            }
            let dominated = (key.traits + 1..=key.slot.max_traits()).any(|traits| {
                let richer = &table[&FinderKey::new(key.slot, key.cost, traits)];
                !richer.items.is_empty()
                    && (richer.score > choice.score || same_score(richer.score, choice.score))
            });
            if dominated {
                fail_cache.insert(*key);
            }
        }

        self.table = Some(table);
        self.fail_cache = fail_cache;
    }

    pub fn is_computed(&self) -> bool {
        self.table.is_some()
    }

    /// Best score and tied items for a key.
    pub fn get(
        &self,
        slot: SlotType,
        cost: TokenCost,
        traits: u8,
    ) -> Result<&SlotChoice<'a>, OptimizeError> {
        let key = FinderKey::new(slot, cost, traits);
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OptimizeError::NotComputed(key.to_string()))?;
        if !self.items.contains_key(&slot) {
            return Err(OptimizeError::UnknownSlot(slot));
        }
        table
            .get(&key)
            .ok_or_else(|| OptimizeError::NotComputed(key.to_string()))
    }

    /// Keys that are unachievable or dominated.
    pub fn fail_cache(&self) -> &HashSet<FinderKey> {
        &self.fail_cache
    }

    pub fn is_pruned(&self, key: &FinderKey) -> bool {
        self.fail_cache.contains(key)
    }
}

// Character archetypes: the ordered slot list that shapes a build.

use serde::Serialize;

use super::item::SlotType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Archetype {
    pub name: String,
    pub slots: Vec<SlotType>,
}

impl Archetype {
    pub fn new(name: impl Into<String>, slots: Vec<SlotType>) -> Self {
        Self {
            name: name.into(),
            slots,
        }
    }

    /// Distinct slot types in first-seen order.
    pub fn slot_types(&self) -> Vec<SlotType> {
        let mut seen = Vec::new();
        for slot in &self.slots {
            if !seen.contains(slot) {
                seen.push(*slot);
            }
        }
        seen
    }

    /// Total number of token positions across all slots.
    pub fn token_positions(&self) -> u32 {
        self.slots.iter().map(|s| u32::from(s.token_positions())).sum()
    }

    /// Number of cards a full build of this archetype holds.
    pub fn card_count(&self) -> usize {
        self.slots.iter().map(|s| s.card_count()).sum()
    }
}

// Game data catalog: cards, items and archetypes, loaded once and read-only afterwards.

pub mod archetype;
pub mod card;
pub mod item;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::OptimizeError;

pub use archetype::Archetype;
pub use card::{Card, CardComponents, CardId, DamageType, Overload};
pub use item::{Item, ItemId, SlotType, Token, TokenCost, Tokens};

/// Normalize a user-facing name: lower-cased, trimmed, non-alphanumerics
/// removed and runs of whitespace collapsed to one space.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} name '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("unknown slot type '{0}'")]
    UnknownSlotType(String),
    #[error("'{owner}' references unknown card '{card}'")]
    UnknownCard { owner: String, card: String },
    #[error("card pack '{pack}': {reason}")]
    InvalidPack { pack: String, reason: String },
    #[error("item '{item}': {reason}")]
    InvalidItem { item: String, reason: String },
}

/// Items grouped by slot type, as handed to the item finder.
pub type ItemsBySlot<'a> = HashMap<SlotType, Vec<&'a Item>>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cards: Vec<Card>,
    items: Vec<Item>,
    archetypes: Vec<Archetype>,
    card_index: HashMap<String, CardId>,
    item_index: HashMap<String, ItemId>,
    archetype_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn card(&self, id: CardId) -> &Card {
        &self.cards[id.0 as usize]
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }

    pub fn card_by_name(&self, name: &str) -> Result<&Card, OptimizeError> {
        self.card_index
            .get(&normalize_name(name))
            .map(|id| self.card(*id))
            .ok_or_else(|| OptimizeError::UnknownCard(name.trim().to_string()))
    }

    pub fn item_by_name(&self, name: &str) -> Result<&Item, OptimizeError> {
        self.item_index
            .get(&normalize_name(name))
            .map(|id| self.item(*id))
            .ok_or_else(|| OptimizeError::UnknownItem(name.trim().to_string()))
    }

    pub fn archetype(&self, name: &str) -> Result<&Archetype, OptimizeError> {
        self.archetype_index
            .get(&normalize_name(name))
            .map(|idx| &self.archetypes[*idx])
            .ok_or_else(|| OptimizeError::UnknownArchetype(name.trim().to_string()))
    }

    /// Global trait predicate.
    pub fn is_trait(&self, card: CardId) -> bool {
        self.card(card).is_trait
    }

    /// Items whose slot type is one of `slots`, grouped by slot type.
    /// Every requested slot gets an entry, possibly empty.
    pub fn items_by_slot(&self, slots: &[SlotType]) -> ItemsBySlot<'_> {
        let mut grouped: ItemsBySlot<'_> = slots.iter().map(|s| (*s, Vec::new())).collect();
        for item in &self.items {
            if let Some(bucket) = grouped.get_mut(&item.slot) {
                bucket.push(item);
            }
        }
        grouped
    }

    /// Parse a catalog snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let snapshot: CatalogJson = serde_json::from_str(json)?;
        let mut builder = Catalog::builder();

        for card in snapshot.cards {
            builder.add_card(&card.name, card.is_trait, card.components)?;
        }

        for item in snapshot.items {
            let slot = SlotType::from_name(&item.slot)
                .ok_or_else(|| CatalogError::UnknownSlotType(item.slot.clone()))?;
            let cost = parse_tokens(&item.name, &item.tokens)?;
            let mut cards = Vec::with_capacity(item.cards.len());
            for card_name in &item.cards {
                let id = builder.card_id(card_name).ok_or_else(|| CatalogError::UnknownCard {
                    owner: item.name.clone(),
                    card: card_name.clone(),
                })?;
                cards.push(id);
            }
            builder.add_item(&item.name, slot, cost, cards)?;
        }

        for archetype in snapshot.archetypes {
            let mut slots = Vec::with_capacity(archetype.slots.len());
            for slot_name in &archetype.slots {
                let slot = SlotType::from_name(slot_name)
                    .ok_or_else(|| CatalogError::UnknownSlotType(slot_name.clone()))?;
                slots.push(slot);
            }
            builder.add_archetype(&archetype.name, slots)?;
        }

        Ok(builder.build())
    }

    /// Load a catalog snapshot file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.display(),
            cards = catalog.cards.len(),
            items = catalog.items.len(),
            archetypes = catalog.archetypes.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }
}

fn parse_tokens(item: &str, raw: &[i8]) -> Result<TokenCost, CatalogError> {
    let invalid = || CatalogError::InvalidItem {
        item: item.to_string(),
        reason: format!("invalid token cost {raw:?}"),
    };
    match raw {
        [major] => TokenCost::from_raw(*major, -1).ok_or_else(invalid),
        [major, minor] => TokenCost::from_raw(*major, *minor).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Incremental catalog construction with validation.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    pub fn card_id(&self, name: &str) -> Option<CardId> {
        self.catalog.card_index.get(&normalize_name(name)).copied()
    }

    pub fn add_card(
        &mut self,
        name: &str,
        is_trait: bool,
        components: CardComponents,
    ) -> Result<CardId, CatalogError> {
        let key = normalize_name(name);
        if self.catalog.card_index.contains_key(&key) {
            return Err(CatalogError::Duplicate {
                kind: "card",
                name: name.to_string(),
            });
        }
        let id = CardId(self.catalog.cards.len() as u32);
        self.catalog.cards.push(Card {
            id,
            name: name.to_string(),
            is_trait,
            components,
        });
        self.catalog.card_index.insert(key, id);
        Ok(id)
    }

    pub fn add_item(
        &mut self,
        name: &str,
        slot: SlotType,
        cost: TokenCost,
        cards: Vec<CardId>,
    ) -> Result<ItemId, CatalogError> {
        let key = normalize_name(name);
        if self.catalog.item_index.contains_key(&key) {
            return Err(CatalogError::Duplicate {
                kind: "item",
                name: name.to_string(),
            });
        }
        if cards.len() != slot.card_count() {
            return Err(CatalogError::InvalidItem {
                item: name.to_string(),
                reason: format!(
                    "{slot} items hold {} cards, got {}",
                    slot.card_count(),
                    cards.len()
                ),
            });
        }
        if !cost.fits(slot) {
            return Err(CatalogError::InvalidItem {
                item: name.to_string(),
                reason: format!("token cost {cost} does not fit a {slot} slot"),
            });
        }
        if let Some(bad) = cards.iter().find(|c| c.0 as usize >= self.catalog.cards.len()) {
            return Err(CatalogError::UnknownCard {
                owner: name.to_string(),
                card: format!("#{}", bad.0),
            });
        }
        let id = ItemId(self.catalog.items.len() as u32);
        self.catalog.items.push(Item {
            id,
            name: name.to_string(),
            slot,
            cost,
            cards,
        });
        self.catalog.item_index.insert(key, id);
        Ok(id)
    }

    pub fn add_archetype(
        &mut self,
        name: &str,
        slots: Vec<SlotType>,
    ) -> Result<(), CatalogError> {
        let key = normalize_name(name);
        if self.catalog.archetype_index.contains_key(&key) {
            return Err(CatalogError::Duplicate {
                kind: "archetype",
                name: name.to_string(),
            });
        }
        self.catalog
            .archetype_index
            .insert(key, self.catalog.archetypes.len());
        self.catalog.archetypes.push(Archetype::new(name, slots));
        Ok(())
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}

// ── Snapshot JSON shape ──────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogJson {
    #[serde(default)]
    cards: Vec<CardJson>,
    #[serde(default)]
    items: Vec<ItemJson>,
    #[serde(default)]
    archetypes: Vec<ArchetypeJson>,
}

#[derive(Deserialize)]
struct CardJson {
    name: String,
    #[serde(default, rename = "trait")]
    is_trait: bool,
    #[serde(flatten)]
    components: CardComponents,
}

#[derive(Deserialize)]
struct ItemJson {
    name: String,
    slot: String,
    tokens: Vec<i8>,
    cards: Vec<String>,
}

#[derive(Deserialize)]
struct ArchetypeJson {
    name: String,
    slots: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "cards": [
            {"name": "Bash", "damage": 4, "damage_type": "crushing", "direct": true, "range": 1},
            {"name": "Firebolt", "damage": 3, "overload": 3, "damage_type": "fire", "direct": true, "range": 5},
            {"name": "Run", "move": 3},
            {"name": "Clumsy", "trait": true}
        ],
        "items": [
            {"name": "Club", "slot": "Weapon", "tokens": [1, 2],
             "cards": ["Bash", "Bash", "Bash", "Bash", "Run", "Clumsy"]},
            {"name": "Sandals", "slot": "boots", "tokens": [0],
             "cards": ["Run", "Run", "Clumsy"]}
        ],
        "archetypes": [
            {"name": "Dwarf Warrior", "slots": ["Weapon", "Boots"]}
        ]
    }"#;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Dwarf   Warrior "), "dwarf warrior");
        assert_eq!(normalize_name("Step_Movement!"), "stepmovement");
        assert_eq!(normalize_name("Direct\tMagic\nDamage"), "direct magic damage");
        assert_eq!(normalize_name("Hero's Gear"), "heros gear");
    }

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json(SNAPSHOT).unwrap();
        assert_eq!(catalog.cards().len(), 4);
        assert_eq!(catalog.items().len(), 2);

        let club = catalog.item_by_name("club").unwrap();
        assert_eq!(club.slot, SlotType::Weapon);
        assert_eq!(club.cost.raw(), (2, 1));
        assert_eq!(club.cards.len(), 6);

        let sandals = catalog.item_by_name("Sandals").unwrap();
        assert_eq!(sandals.cost.raw(), (0, -1));

        let firebolt = catalog.card_by_name("firebolt").unwrap();
        assert_eq!(firebolt.average_damage(), 5.0);
        assert!(catalog.is_trait(catalog.card_by_name("Clumsy").unwrap().id));

        let archetype = catalog.archetype("  DWARF  warrior").unwrap();
        assert_eq!(archetype.slots, vec![SlotType::Weapon, SlotType::Boots]);
    }

    #[test]
    fn test_unknown_lookups() {
        let catalog = Catalog::from_json(SNAPSHOT).unwrap();
        assert!(matches!(
            catalog.archetype("Elf Wizard"),
            Err(OptimizeError::UnknownArchetype(name)) if name == "Elf Wizard"
        ));
        assert!(matches!(
            catalog.item_by_name("Spear"),
            Err(OptimizeError::UnknownItem(_))
        ));
        assert!(matches!(
            catalog.card_by_name("Zap"),
            Err(OptimizeError::UnknownCard(_))
        ));
    }

    #[test]
    fn test_items_by_slot_filters_and_keeps_empty_slots() {
        let catalog = Catalog::from_json(SNAPSHOT).unwrap();
        let grouped = catalog.items_by_slot(&[SlotType::Weapon, SlotType::Helmet]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&SlotType::Weapon].len(), 1);
        assert!(grouped[&SlotType::Helmet].is_empty());
        assert!(!grouped.contains_key(&SlotType::Boots));
    }

    #[test]
    fn test_rejects_wrong_card_count() {
        let json = r#"{
            "cards": [{"name": "Bash"}],
            "items": [{"name": "Club", "slot": "Weapon", "tokens": [2, 2], "cards": ["Bash"]}]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidItem { .. }));
    }

    #[test]
    fn test_rejects_cost_shape_mismatch() {
        let json = r#"{
            "cards": [{"name": "Run"}],
            "items": [{"name": "Boots", "slot": "Boots", "tokens": [1, 1], "cards": ["Run", "Run", "Run"]}]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidItem { .. }));
    }

    #[test]
    fn test_rejects_main_cost_the_search_never_offers() {
        let json = r#"{
            "cards": [{"name": "Chop"}],
            "items": [{"name": "Lopsided", "slot": "Weapon", "tokens": [2, 0], "cards": ["Chop", "Chop", "Chop", "Chop", "Chop", "Chop"]}]
        }"#;
        assert!(matches!(
            Catalog::from_json(json).unwrap_err(),
            CatalogError::InvalidItem { item, .. } if item == "Lopsided"
        ));

        let mut b = Catalog::builder();
        let chop = b.add_card("Chop", false, CardComponents::default()).unwrap();
        let lopsided = TokenCost::from_raw(2, 0).unwrap();
        assert!(b.add_item("Lopsided", SlotType::Weapon, lopsided, vec![chop; 6]).is_err());
        let fair = TokenCost::from_raw(2, 1).unwrap();
        assert!(b.add_item("Fair", SlotType::Weapon, fair, vec![chop; 6]).is_ok());
    }

    #[test]
    fn test_rejects_unknown_card_and_slot() {
        let json = r#"{
            "cards": [{"name": "Run"}],
            "items": [{"name": "Boots", "slot": "Boots", "tokens": [1], "cards": ["Run", "Run", "Walk"]}]
        }"#;
        assert!(matches!(
            Catalog::from_json(json).unwrap_err(),
            CatalogError::UnknownCard { card, .. } if card == "Walk"
        ));

        let json = r#"{"archetypes": [{"name": "X", "slots": ["Belt"]}]}"#;
        assert!(matches!(
            Catalog::from_json(json).unwrap_err(),
            CatalogError::UnknownSlotType(_)
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_overload() {
        let json = r#"{"cards": [{"name": "Run"}, {"name": "run"}]}"#;
        assert!(matches!(
            Catalog::from_json(json).unwrap_err(),
            CatalogError::Duplicate { kind: "card", .. }
        ));

        let json = r#"{"cards": [{"name": "Zap", "damage": 2, "overload": 2}]}"#;
        assert!(matches!(
            Catalog::from_json(json).unwrap_err(),
            CatalogError::Json(_)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.archetypes().len(), 1);

        let missing = Catalog::load(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }
}

// Card packs: named card weightings and the weighted pack expressions users query with.
//
// Expression grammar (comma separated terms, whitespace ignored):
//   <pack>            registered pack, weight 1
//   <pack> = <w>      registered pack scaled by w
//   : <card>          singleton pack for one card, weight 1
//   : <card> = <w>    singleton pack scaled by w
// Contributions are summed and then divided by the sum of the term weights.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;

use crate::catalog::{normalize_name, Card, CardId, Catalog, CatalogError};
use crate::error::OptimizeError;

/// A `card -> weight` map. Cards that are absent weigh zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardWeights(HashMap<CardId, f64>);

impl CardWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, card: CardId) -> f64 {
        self.0.get(&card).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, card: CardId, weight: f64) {
        self.0.insert(card, weight);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CardId, f64)> + '_ {
        self.0.iter().map(|(card, weight)| (*card, *weight))
    }

    /// Every weight multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|(c, w)| (*c, w * factor)).collect())
    }
}

impl FromIterator<(CardId, f64)> for CardWeights {
    fn from_iter<T: IntoIterator<Item = (CardId, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardPack {
    pub name: String,
    pub weights: CardWeights,
}

/// Summary of a registered pack, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct PackInfo {
    pub name: String,
    pub cards: usize,
}

/// Packs derived from card properties.
#[derive(Debug, Clone, Copy)]
enum AutoPack {
    Traits,
    Cards,
    Damage,
    MagicDamage,
    DirectMagicDamage,
    StepMovement,
    Range,
    Healing,
    Armor,
}

impl AutoPack {
    const ALL: [AutoPack; 9] = [
        AutoPack::Traits,
        AutoPack::Cards,
        AutoPack::Damage,
        AutoPack::MagicDamage,
        AutoPack::DirectMagicDamage,
        AutoPack::StepMovement,
        AutoPack::Range,
        AutoPack::Healing,
        AutoPack::Armor,
    ];

    /// Registered names; the first one is canonical.
    fn names(self) -> &'static [&'static str] {
        match self {
            AutoPack::Traits => &["traits", "is_trait"],
            AutoPack::Cards => &["cards"],
            AutoPack::Damage => &["damage"],
            AutoPack::MagicDamage => &["magic damage", "magic_damage"],
            AutoPack::DirectMagicDamage => &["direct magic damage", "direct_magic_damage"],
            AutoPack::StepMovement => &["step movement", "step_movement"],
            AutoPack::Range => &["range", "max_range"],
            AutoPack::Healing => &["healing"],
            AutoPack::Armor => &["armor"],
        }
    }

    fn weight(self, card: &Card) -> f64 {
        let c = &card.components;
        let raw = match self {
            AutoPack::Traits => f64::from(u8::from(card.is_trait)),
            AutoPack::Cards => f64::from(u8::from(!card.is_trait)),
            AutoPack::Damage => card.average_damage(),
            AutoPack::MagicDamage => {
                if c.damage_type.is_some_and(|t| t.is_magic()) {
                    card.average_damage()
                } else {
                    0.0
                }
            }
            AutoPack::DirectMagicDamage => {
                if card.is_direct_magic_attack() {
                    card.average_damage()
                } else {
                    0.0
                }
            }
            AutoPack::StepMovement => c.step_move_points.map_or(0.0, f64::from),
            AutoPack::Range => c.max_range.map_or(0.0, f64::from),
            AutoPack::Healing => c.heal.unwrap_or(0.0),
            AutoPack::Armor => c.armor.unwrap_or(0.0),
        };
        raw.max(0.0)
    }

    fn build(self, catalog: &Catalog) -> CardPack {
        let weights = catalog
            .cards()
            .iter()
            .map(|card| (card.id, self.weight(card)))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        CardPack {
            name: self.names()[0].to_string(),
            weights,
        }
    }
}

/// What a single expression term refers to.
#[derive(Debug, Clone, PartialEq)]
enum TermTarget {
    Pack(String),
    Card(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    target: TermTarget,
    weight: f64,
}

fn parse_term(raw: &str) -> Result<Term, OptimizeError> {
    let (is_card, body) = match raw.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (name, weight) = match body.split_once('=') {
        Some((name, weight)) => {
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| OptimizeError::InvalidWeight(raw.to_string()))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(OptimizeError::InvalidWeight(raw.to_string()));
            }
            (name.trim(), weight)
        }
        None => (body.trim(), 1.0),
    };
    let target = if is_card {
        if name.is_empty() {
            return Err(OptimizeError::UnknownCard(raw.to_string()));
        }
        TermTarget::Card(name.to_string())
    } else {
        if name.is_empty() {
            return Err(OptimizeError::UnknownPack(raw.to_string()));
        }
        TermTarget::Pack(name.to_string())
    };
    Ok(Term { target, weight })
}

fn parse_expression(expression: &str) -> Result<Vec<Term>, OptimizeError> {
    expression
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_term)
        .collect()
}

/// Immutable registry of card packs keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct PackRegistry {
    packs: BTreeMap<String, CardPack>,
}

impl PackRegistry {
    /// Registry holding only the packs derived from card properties.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut packs = BTreeMap::new();
        for auto in AutoPack::ALL {
            let pack = auto.build(catalog);
            for alias in auto.names() {
                packs.insert(normalize_name(alias), pack.clone());
            }
        }
        Self { packs }
    }

    /// Add (or replace) a named pack.
    pub fn with_pack(mut self, name: &str, weights: CardWeights) -> Self {
        self.packs.insert(
            normalize_name(name),
            CardPack {
                name: name.trim().to_string(),
                weights,
            },
        );
        self
    }

    /// Add user packs from JSON shaped `{ "pack": { "card": weight, ... }, ... }`.
    pub fn with_user_packs_json(
        mut self,
        catalog: &Catalog,
        json: &str,
    ) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(json)?;
        for (pack, entries) in raw {
            let mut weights = CardWeights::new();
            for (card_name, weight) in entries {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(CatalogError::InvalidPack {
                        pack,
                        reason: format!("weight {weight} for '{card_name}' is not a non-negative number"),
                    });
                }
                let card = catalog
                    .card_by_name(&card_name)
                    .map_err(|_| CatalogError::UnknownCard {
                        owner: pack.clone(),
                        card: card_name.clone(),
                    })?;
                weights.insert(card.id, weight);
            }
            self = self.with_pack(&pack, weights);
        }
        Ok(self)
    }

    /// Load user packs from a JSON file.
    pub fn load_user_packs(self, catalog: &Catalog, path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let before = self.packs.len();
        let registry = self.with_user_packs_json(catalog, &contents)?;
        tracing::info!(
            path = %path.display(),
            added = registry.packs.len().saturating_sub(before),
            "Loaded user card packs"
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&CardPack> {
        self.packs.get(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Registered names (normalized) with their card counts, in name order.
    pub fn list(&self) -> Vec<PackInfo> {
        self.packs
            .iter()
            .map(|(name, pack)| PackInfo {
                name: name.clone(),
                cards: pack.weights.len(),
            })
            .collect()
    }

    /// Resolve a pack expression into a single normalized weight map.
    ///
    /// Fails on the first term naming an unknown pack or card. An expression
    /// that leaves no positive weight is `EmptyQuery`.
    pub fn resolve(&self, catalog: &Catalog, expression: &str) -> Result<CardWeights, OptimizeError> {
        let terms = parse_expression(expression)?;

        let mut combined: HashMap<CardId, f64> = HashMap::new();
        let mut total_weight = 0.0;
        for term in &terms {
            match &term.target {
                TermTarget::Pack(name) => {
                    let pack = self
                        .get(name)
                        .ok_or_else(|| OptimizeError::UnknownPack(name.clone()))?;
                    for (card, weight) in pack.weights.iter() {
                        *combined.entry(card).or_insert(0.0) += term.weight * weight;
                    }
                }
                TermTarget::Card(name) => {
                    let card = catalog.card_by_name(name)?;
                    *combined.entry(card.id).or_insert(0.0) += term.weight;
                }
            }
            total_weight += term.weight;
        }

        if total_weight <= 0.0 {
            return Err(OptimizeError::EmptyQuery);
        }

        let weights: CardWeights = combined
            .into_iter()
            .map(|(card, weight)| (card, weight / total_weight))
            .filter(|(_, weight)| *weight > 0.0)
            .collect();
        if weights.is_empty() {
            return Err(OptimizeError::EmptyQuery);
        }
        Ok(weights)
    }
}

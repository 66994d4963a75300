// Card definitions. Cards are immutable once the catalog is built and are
// referenced from items by `CardId`.

use serde::{Deserialize, Serialize};

/// Index of a card inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

/// Overload rating printed on attack cards. Only 0, 3 and 6 exist in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Overload {
    #[default]
    None,
    Three,
    Six,
}

impl Overload {
    /// Expected extra damage contributed by overload.
    pub fn damage_offset(self) -> f64 {
        match self {
            Overload::None => 0.0,
            Overload::Three => 2.0,
            Overload::Six => 3.5,
        }
    }
}

impl TryFrom<u8> for Overload {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Overload::None),
            3 => Ok(Overload::Three),
            6 => Ok(Overload::Six),
            other => Err(format!("invalid overload value {other} (expected 0, 3 or 6)")),
        }
    }
}

impl From<Overload> for u8 {
    fn from(value: Overload) -> Self {
        match value {
            Overload::None => 0,
            Overload::Three => 3,
            Overload::Six => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Crushing,
    Piercing,
    Slashing,
    Acid,
    Arcane,
    Cold,
    Electrical,
    Fire,
    Holy,
    Psychic,
}

impl DamageType {
    pub fn is_magic(self) -> bool {
        !matches!(
            self,
            DamageType::Crushing | DamageType::Piercing | DamageType::Slashing
        )
    }
}

/// Optional card parameters. The optimizer never reads these directly; they
/// only feed the auto-generated card packs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardComponents {
    /// Base damage of an attack card.
    #[serde(default)]
    pub damage: Option<f64>,
    #[serde(default)]
    pub overload: Overload,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    /// Attack hits its target directly (no area template).
    #[serde(default)]
    pub direct: bool,
    #[serde(default, rename = "move")]
    pub step_move_points: Option<u8>,
    #[serde(default, rename = "range")]
    pub max_range: Option<u8>,
    #[serde(default)]
    pub heal: Option<f64>,
    #[serde(default)]
    pub armor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub is_trait: bool,
    #[serde(flatten)]
    pub components: CardComponents,
}

impl Card {
    /// Base damage plus the expected overload bonus. Zero for non-attacks.
    pub fn average_damage(&self) -> f64 {
        match self.components.damage {
            Some(damage) => damage + self.components.overload.damage_offset(),
            None => 0.0,
        }
    }

    pub fn is_attack(&self) -> bool {
        self.components.damage.is_some()
    }

    pub fn is_direct_magic_attack(&self) -> bool {
        self.is_attack()
            && self.components.direct
            && self.components.damage_type.is_some_and(DamageType::is_magic)
    }
}

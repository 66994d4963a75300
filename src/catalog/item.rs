// Items, slot types and token costs.

use std::fmt;

use serde::Serialize;

use super::card::CardId;
use super::normalize_name;

/// Index of an item inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

/// Equipment slot categories. An item is legal in a slot only when the types match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum SlotType {
    Weapon,
    DivineWeapon,
    Staff,
    Helmet,
    HeavyArmor,
    DivineArmor,
    Robes,
    Boots,
    Shield,
    DivineItem,
    ArcaneItem,
    MartialSkill,
    DivineSkill,
    ArcaneSkill,
    ElfSkill,
    HumanSkill,
    DwarfSkill,
}

const MAIN_COSTS: [TokenCost; 5] = [
    TokenCost::pair(Token::Major, Token::Major),
    TokenCost::pair(Token::Major, Token::Minor),
    TokenCost::pair(Token::Minor, Token::Minor),
    TokenCost::pair(Token::Minor, Token::Blank),
    TokenCost::pair(Token::Blank, Token::Blank),
];

const SINGLE_COSTS: [TokenCost; 3] = [
    TokenCost::single(Token::Major),
    TokenCost::single(Token::Minor),
    TokenCost::single(Token::Blank),
];

impl SlotType {
    pub const ALL: [SlotType; 17] = [
        SlotType::Weapon,
        SlotType::DivineWeapon,
        SlotType::Staff,
        SlotType::Helmet,
        SlotType::HeavyArmor,
        SlotType::DivineArmor,
        SlotType::Robes,
        SlotType::Boots,
        SlotType::Shield,
        SlotType::DivineItem,
        SlotType::ArcaneItem,
        SlotType::MartialSkill,
        SlotType::DivineSkill,
        SlotType::ArcaneSkill,
        SlotType::ElfSkill,
        SlotType::HumanSkill,
        SlotType::DwarfSkill,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SlotType::Weapon => "Weapon",
            SlotType::DivineWeapon => "Divine Weapon",
            SlotType::Staff => "Staff",
            SlotType::Helmet => "Helmet",
            SlotType::HeavyArmor => "Heavy Armor",
            SlotType::DivineArmor => "Divine Armor",
            SlotType::Robes => "Robes",
            SlotType::Boots => "Boots",
            SlotType::Shield => "Shield",
            SlotType::DivineItem => "Divine Item",
            SlotType::ArcaneItem => "Arcane Item",
            SlotType::MartialSkill => "Martial Skill",
            SlotType::DivineSkill => "Divine Skill",
            SlotType::ArcaneSkill => "Arcane Skill",
            SlotType::ElfSkill => "Elf Skill",
            SlotType::HumanSkill => "Human Skill",
            SlotType::DwarfSkill => "Dwarf Skill",
        }
    }

    /// Look up a slot type by its display name, ignoring case, punctuation and spacing.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|slot| normalize_name(slot.name()) == wanted)
    }

    /// Weapons, divine weapons and staves hold six cards and two tokens.
    pub fn is_main(self) -> bool {
        matches!(
            self,
            SlotType::Weapon | SlotType::DivineWeapon | SlotType::Staff
        )
    }

    pub fn card_count(self) -> usize {
        if self.is_main() {
            6
        } else {
            3
        }
    }

    pub fn token_positions(self) -> u8 {
        if self.is_main() {
            2
        } else {
            1
        }
    }

    /// Token costs an item in this slot can carry, most expensive first.
    pub fn cost_options(self) -> &'static [TokenCost] {
        if self.is_main() {
            &MAIN_COSTS
        } else {
            &SINGLE_COSTS
        }
    }

    /// Largest trait count an item in this slot can carry.
    pub fn max_traits(self) -> u8 {
        self.card_count() as u8
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<SlotType> for String {
    fn from(slot: SlotType) -> Self {
        slot.name().to_string()
    }
}

/// A single token position on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    Blank,
    Minor,
    Major,
}

impl Token {
    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(Token::Blank),
            1 => Some(Token::Minor),
            2 => Some(Token::Major),
            _ => None,
        }
    }

    pub fn raw(self) -> i8 {
        match self {
            Token::Blank => 0,
            Token::Minor => 1,
            Token::Major => 2,
        }
    }
}

/// Token cost of an item. Main-slot items have two positions; every other
/// item has a single position and `second` is `None` (the `-1` sentinel of
/// the raw `(major, minor)` encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenCost {
    pub first: Token,
    pub second: Option<Token>,
}

impl TokenCost {
    /// Two-position cost; the larger token always goes first.
    pub const fn pair(a: Token, b: Token) -> Self {
        if (a as u8) >= (b as u8) {
            Self {
                first: a,
                second: Some(b),
            }
        } else {
            Self {
                first: b,
                second: Some(a),
            }
        }
    }

    pub const fn single(token: Token) -> Self {
        Self {
            first: token,
            second: None,
        }
    }

    /// Parse the raw `(major, minor)` encoding used by the game data.
    pub fn from_raw(major: i8, minor: i8) -> Option<Self> {
        let first = Token::from_raw(major)?;
        if minor == -1 {
            return Some(Self::single(first));
        }
        let second = Token::from_raw(minor)?;
        Some(Self::pair(first, second))
    }

    pub fn raw(self) -> (i8, i8) {
        (self.first.raw(), self.second.map_or(-1, Token::raw))
    }

    pub fn positions(self) -> u8 {
        if self.second.is_some() {
            2
        } else {
            1
        }
    }

    /// Whether an item in `slot` may carry this cost. Main slots only take the
    /// five pair costs the search enumerates; `(2,0)` is not one of them.
    pub fn fits(self, slot: SlotType) -> bool {
        slot.cost_options().contains(&self)
    }

    /// Number of major and minor tokens this cost draws from the character budget.
    pub fn usage(self) -> Tokens {
        let mut used = Tokens::default();
        for token in std::iter::once(self.first).chain(self.second) {
            match token {
                Token::Major => used.major += 1,
                Token::Minor => used.minor += 1,
                Token::Blank => {}
            }
        }
        used
    }
}

impl fmt::Display for TokenCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.raw();
        write!(f, "({major},{minor})")
    }
}

impl Serialize for TokenCost {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw().serialize(serializer)
    }
}

/// A count of major and minor tokens (a budget, a remainder or a usage).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Tokens {
    pub major: u8,
    pub minor: u8,
}

impl Tokens {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn total(self) -> u32 {
        u32::from(self.major) + u32::from(self.minor)
    }

    pub fn is_zero(self) -> bool {
        self.major == 0 && self.minor == 0
    }

    pub fn checked_sub(self, other: Tokens) -> Option<Tokens> {
        Some(Tokens {
            major: self.major.checked_sub(other.major)?,
            minor: self.minor.checked_sub(other.minor)?,
        })
    }
}

impl std::ops::Add for Tokens {
    type Output = Tokens;

    fn add(self, rhs: Tokens) -> Tokens {
        Tokens {
            major: self.major + rhs.major,
            minor: self.minor + rhs.minor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub slot: SlotType,
    pub cost: TokenCost,
    pub cards: Vec<CardId>,
}

// Character-level search.
//
// `Distributions` lazily walks every way of assigning a token cost and trait
// count to each slot of an archetype so that the token budget is spent
// exactly. `CharacterFinder` scores each distribution against the item finder
// table and `TiedBuilds` keeps every build that ties for the best average.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::catalog::{Archetype, ItemId, SlotType, TokenCost, Tokens};
use crate::error::OptimizeError;

use super::config::{same_score, DECK_SIZE, PAUSE_EVERY};
use super::item_finder::{FinderKey, ItemFinder};

/// Token cost and trait count chosen for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAssignment {
    pub cost: TokenCost,
    pub traits: u8,
}

/// One unit of progress of a `Distributions` walk.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Distribution(Vec<SlotAssignment>),
    /// `PAUSE_EVERY` steps went by without a distribution.
    Pending,
    Done,
}

/// Depth-first enumeration of slot assignments that spend a budget exactly.
pub struct Distributions {
    /// Candidate assignments per slot, in enumeration order.
    choices: Vec<Vec<SlotAssignment>>,
    /// Token positions available from slot `d` to the end.
    positions_from: Vec<u32>,
    cursor: Vec<usize>,
    /// `remaining[d]` is the budget left before assigning slot `d`.
    remaining: Vec<Tokens>,
    steps_since_pause: usize,
    exhausted: bool,
}

impl Distributions {
    /// `pruned` filters out (slot, cost, traits) keys that must not be used.
    pub fn new(slots: &[SlotType], budget: Tokens, pruned: impl Fn(&FinderKey) -> bool) -> Self {
        let choices: Vec<Vec<SlotAssignment>> = slots
            .iter()
            .map(|slot| {
                FinderKey::all_for(*slot)
                    .filter(|key| !pruned(key))
                    .map(|key| SlotAssignment {
                        cost: key.cost,
                        traits: key.traits,
                    })
                    .collect()
            })
            .collect();

        let mut positions_from = vec![0u32; slots.len() + 1];
        for (d, slot) in slots.iter().enumerate().rev() {
            positions_from[d] = positions_from[d + 1] + u32::from(slot.token_positions());
        }

        // A slot with nothing left to choose rules out every distribution.
        let dead_slot = choices.iter().any(Vec::is_empty);

        Self {
            exhausted: dead_slot || budget.total() > positions_from[0],
            choices,
            positions_from,
            cursor: Vec::with_capacity(slots.len()),
            remaining: vec![budget],
            steps_since_pause: 0,
        }
    }

    /// Advance the walk until a distribution is found, the walk ends, or
    /// `PAUSE_EVERY` steps pass without a result.
    pub fn step(&mut self) -> Step {
        loop {
            if self.exhausted {
                return Step::Done;
            }
            let depth = self.cursor.len();
            if depth == self.choices.len() {
                // positions_from[len] is zero, so the budget is fully spent here.
                let distribution = self
                    .cursor
                    .iter()
                    .enumerate()
                    .map(|(d, i)| self.choices[d][*i])
                    .collect();
                self.backtrack();
                self.steps_since_pause = 0;
                return Step::Distribution(distribution);
            }
            if !self.push_first_viable(depth, 0) {
                self.backtrack();
            }
            self.steps_since_pause += 1;
            if self.steps_since_pause >= PAUSE_EVERY {
                self.steps_since_pause = 0;
                return Step::Pending;
            }
        }
    }

    fn push_first_viable(&mut self, depth: usize, start: usize) -> bool {
        let left = self.remaining[depth];
        for (i, choice) in self.choices[depth].iter().enumerate().skip(start) {
            let Some(after) = left.checked_sub(choice.cost.usage()) else {
                continue;
            };
            // The rest of the slots must still be able to spend what is left.
            if after.total() > self.positions_from[depth + 1] {
                continue;
            }
            self.cursor.push(i);
            self.remaining.push(after);
            return true;
        }
        false
    }

    fn backtrack(&mut self) {
        loop {
            let Some(last) = self.cursor.pop() else {
                self.exhausted = true;
                return;
            };
            self.remaining.pop();
            if self.push_first_viable(self.cursor.len(), last + 1) {
                return;
            }
        }
    }
}

impl Iterator for Distributions {
    type Item = Vec<SlotAssignment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step() {
                Step::Distribution(distribution) => return Some(distribution),
                Step::Pending => continue,
                Step::Done => return None,
            }
        }
    }
}

/// One slot of a build: the assignment used and every tied item for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSlot {
    pub slot: SlotType,
    pub cost: TokenCost,
    pub traits: u8,
    pub score: f64,
    /// Tied items, ascending id. Never empty.
    pub options: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Build {
    pub score: f64,
    pub num_traits: u32,
    pub avg: f64,
    pub slots: Vec<BuildSlot>,
}

impl Build {
    /// Playable (non-trait) cards in the deck.
    pub fn deck_size(&self) -> u32 {
        DECK_SIZE.saturating_sub(self.num_traits)
    }

    /// Lowest-id item per slot.
    pub fn representative(&self) -> Vec<ItemId> {
        self.slots.iter().map(|s| s.options[0]).collect()
    }

    /// A random tied item per slot.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ItemId> {
        self.slots
            .iter()
            .map(|s| *s.options.choose(rng).unwrap_or(&s.options[0]))
            .collect()
    }

    /// Number of concrete item assignments this build stands for.
    pub fn combinations(&self) -> usize {
        self.slots.iter().map(|s| s.options.len()).product()
    }

    /// Every concrete item assignment, slot order preserved.
    pub fn expand(&self) -> Vec<Vec<ItemId>> {
        let mut assignments: Vec<Vec<ItemId>> = vec![Vec::with_capacity(self.slots.len())];
        for slot in &self.slots {
            assignments = assignments
                .into_iter()
                .flat_map(|prefix| {
                    slot.options.iter().map(move |item| {
                        let mut next = prefix.clone();
                        next.push(*item);
                        next
                    })
                })
                .collect();
        }
        assignments
    }
}

/// Average weight per playable card.
pub fn build_average(score: f64, num_traits: u32) -> f64 {
    match DECK_SIZE.checked_sub(num_traits) {
        Some(deck) if deck > 0 => score / f64::from(deck),
        _ => 0.0,
    }
}

/// Accumulates every build that ties for the best average seen so far.
#[derive(Debug, Default)]
pub struct TiedBuilds {
    best_avg: Option<f64>,
    builds: Vec<Build>,
}

impl TiedBuilds {
    /// Offer a candidate. Returns true if it was kept.
    pub fn offer(&mut self, build: Build) -> bool {
        match self.best_avg {
            Some(best) if same_score(build.avg, best) => {
                self.builds.push(build);
                true
            }
            Some(best) if build.avg < best => false,
            _ => {
                self.best_avg = Some(build.avg);
                self.builds.clear();
                self.builds.push(build);
                true
            }
        }
    }

    pub fn best_avg(&self) -> Option<f64> {
        self.best_avg
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn into_builds(self) -> Vec<Build> {
        self.builds
    }
}

/// Result of a character search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub builds: Vec<Build>,
    pub distributions: usize,
}

pub struct CharacterFinder<'f, 'a> {
    finder: &'f ItemFinder<'a>,
    archetype: &'f Archetype,
    budget: Tokens,
}

impl<'f, 'a> CharacterFinder<'f, 'a> {
    pub fn new(finder: &'f ItemFinder<'a>, archetype: &'f Archetype, budget: Tokens) -> Self {
        Self {
            finder,
            archetype,
            budget,
        }
    }

    /// Whether any token distribution at all spends the budget over this archetype.
    pub fn budget_feasible(&self) -> bool {
        Distributions::new(&self.archetype.slots, self.budget, |_| false)
            .next()
            .is_some()
    }

    /// Distributions that avoid the item finder's fail cache.
    pub fn distributions(&self) -> Distributions {
        Distributions::new(&self.archetype.slots, self.budget, |key| {
            self.finder.is_pruned(key)
        })
    }

    /// Score one distribution. `None` when some slot has no matching item.
    pub fn evaluate(&self, distribution: &[SlotAssignment]) -> Result<Option<Build>, OptimizeError> {
        let mut score = 0.0;
        let mut num_traits = 0u32;
        let mut slots = Vec::with_capacity(distribution.len());
        for (slot, assignment) in self.archetype.slots.iter().zip(distribution) {
            let choice = self.finder.get(*slot, assignment.cost, assignment.traits)?;
            if choice.items.is_empty() {
                return Ok(None);
            }
            score += choice.score;
            num_traits += u32::from(assignment.traits);
            slots.push(BuildSlot {
                slot: *slot,
                cost: assignment.cost,
                traits: assignment.traits,
                score: choice.score,
                options: choice.item_ids(),
            });
        }
        Ok(Some(Build {
            score,
            num_traits,
            avg: build_average(score, num_traits),
            slots,
        }))
    }

    /// Enumerate every distribution and return all builds tied for the best
    /// average. Yields to the scheduler after each distribution and after
    /// every `PAUSE_EVERY` fruitless search steps.
    pub async fn find_all(&self) -> Result<SearchOutcome, OptimizeError> {
        if !self.budget_feasible() {
            return Err(OptimizeError::InfeasibleBudget(self.archetype.name.clone()));
        }
        let mut tied = TiedBuilds::default();
        let mut distributions = 0;
        let mut walk = self.distributions();
        loop {
            match walk.step() {
                Step::Distribution(distribution) => {
                    if let Some(build) = self.evaluate(&distribution)? {
                        tied.offer(build);
                    }
                    distributions += 1;
                }
                Step::Pending => {}
                Step::Done => break,
            }
            tokio::task::yield_now().await;
        }
        Ok(SearchOutcome {
            builds: tied.into_builds(),
            distributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Token;

    fn spent(distribution: &[SlotAssignment]) -> Tokens {
        distribution
            .iter()
            .fold(Tokens::default(), |acc, a| acc + a.cost.usage())
    }

    fn all(slots: &[SlotType], budget: Tokens) -> Vec<Vec<SlotAssignment>> {
        Distributions::new(slots, budget, |_| false).collect()
    }

    #[test]
    fn test_single_helmet_cannot_spend_standard_budget() {
        assert!(all(&[SlotType::Helmet], Tokens::new(4, 4)).is_empty());
    }

    #[test]
    fn test_empty_archetype() {
        assert_eq!(all(&[], Tokens::new(0, 0)), vec![Vec::new()]);
        assert!(all(&[], Tokens::new(1, 0)).is_empty());
    }

    #[test]
    fn test_every_distribution_spends_budget_exactly() {
        let slots = [
            SlotType::Weapon,
            SlotType::Helmet,
            SlotType::Boots,
            SlotType::MartialSkill,
            SlotType::MartialSkill,
        ];
        let budget = Tokens::new(2, 3);
        let found = all(&slots, budget);
        assert!(!found.is_empty());
        for distribution in &found {
            assert_eq!(distribution.len(), slots.len());
            assert_eq!(spent(distribution), budget);
            for (slot, a) in slots.iter().zip(distribution) {
                assert!(a.cost.fits(*slot));
                assert!(a.traits <= slot.max_traits());
            }
        }
    }

    #[test]
    fn test_enumeration_matches_brute_force_count() {
        let slots = [SlotType::Weapon, SlotType::Boots, SlotType::Helmet];
        let budget = Tokens::new(2, 1);
        let mut expected = 0;
        for w in SlotType::Weapon.cost_options() {
            for b in SlotType::Boots.cost_options() {
                for h in SlotType::Helmet.cost_options() {
                    if w.usage() + b.usage() + h.usage() == budget {
                        // 7 trait counts for the weapon, 4 for each single slot
                        expected += 7 * 4 * 4;
                    }
                }
            }
        }
        assert!(expected > 0);
        assert_eq!(all(&slots, budget).len(), expected);
    }

    #[test]
    fn test_zero_budget_only_uses_blank_costs() {
        let slots = [SlotType::Staff, SlotType::Robes];
        for distribution in all(&slots, Tokens::new(0, 0)) {
            assert_eq!(distribution[0].cost, TokenCost::pair(Token::Blank, Token::Blank));
            assert_eq!(distribution[1].cost, TokenCost::single(Token::Blank));
        }
    }

    #[test]
    fn test_pruned_keys_are_skipped() {
        let slots = [SlotType::Boots];
        let found: Vec<_> = Distributions::new(&slots, Tokens::new(0, 1), |key| key.traits != 2).collect();
        assert_eq!(
            found,
            vec![vec![SlotAssignment {
                cost: TokenCost::single(Token::Minor),
                traits: 2
            }]]
        );
    }

    #[test]
    fn test_slot_without_choices_ends_the_walk_at_once() {
        let slots = [SlotType::Boots, SlotType::Boots, SlotType::Helmet];
        let mut walk = Distributions::new(&slots, Tokens::new(1, 1), |key| {
            key.slot == SlotType::Helmet
        });
        assert_eq!(walk.step(), Step::Done);
    }

    #[test]
    fn test_fruitless_walk_pauses() {
        // Only blank boots survive, so the major token can never be spent.
        let slots = [SlotType::Boots; 14];
        let blank = TokenCost::single(Token::Blank);
        let mut walk = Distributions::new(&slots, Tokens::new(1, 0), |key| key.cost != blank);
        assert_eq!(walk.step(), Step::Pending);
        assert_eq!(walk.step(), Step::Pending);
    }

    #[test]
    fn test_wide_archetype_does_not_overflow() {
        let slots = vec![SlotType::Weapon; 200];
        let first = Distributions::new(&slots, Tokens::new(4, 4), |_| false).next();
        let first = first.unwrap();
        assert_eq!(first.len(), 200);
        assert_eq!(spent(&first), Tokens::new(4, 4));
    }

    fn build(score: f64, num_traits: u32, options: Vec<Vec<u32>>) -> Build {
        Build {
            score,
            num_traits,
            avg: build_average(score, num_traits),
            slots: options
                .into_iter()
                .map(|ids| BuildSlot {
                    slot: SlotType::Weapon,
                    cost: TokenCost::pair(Token::Major, Token::Major),
                    traits: 0,
                    score: 0.0,
                    options: ids.into_iter().map(ItemId).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_tied_builds_accumulator() {
        let mut tied = TiedBuilds::default();
        assert!(tied.offer(build(12.0, 0, vec![vec![0]])));
        assert!(!tied.offer(build(11.0, 0, vec![vec![1]])));
        assert!(tied.offer(build(10.0, 6, vec![vec![2]])));
        assert_eq!(tied.len(), 1);
        assert!(tied.offer(build(10.0, 6, vec![vec![3]])));
        assert_eq!(tied.len(), 2);
        assert_eq!(tied.best_avg(), Some(10.0 / 30.0));
    }

    #[test]
    fn test_build_expand_and_representative() {
        let b = build(12.0, 0, vec![vec![0, 1], vec![0, 1]]);
        assert_eq!(b.combinations(), 4);
        assert_eq!(b.representative(), vec![ItemId(0), ItemId(0)]);
        let expanded = b.expand();
        assert_eq!(
            expanded,
            vec![
                vec![ItemId(0), ItemId(0)],
                vec![ItemId(0), ItemId(1)],
                vec![ItemId(1), ItemId(0)],
                vec![ItemId(1), ItemId(1)],
            ]
        );
        let mut rng = rand::thread_rng();
        let sampled = b.sample(&mut rng);
        assert_eq!(sampled.len(), 2);
        assert!(expanded.contains(&sampled));
    }

    #[test]
    fn test_build_average() {
        assert_eq!(build_average(12.0, 0), 12.0 / 36.0);
        assert_eq!(build_average(12.0, 6), 12.0 / 30.0);
        assert_eq!(build_average(12.0, 36), 0.0);
    }
}

// Query facade: resolve an archetype and a pack expression, run both finders
// and rank the tied-optimal builds.

pub mod character_finder;
pub mod config;
pub mod item_finder;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::catalog::{Archetype, Catalog, Tokens};
use crate::error::OptimizeError;
use crate::packs::{CardWeights, PackRegistry};

pub use character_finder::{
    Build, BuildSlot, CharacterFinder, Distributions, SlotAssignment, Step, TiedBuilds,
};
pub use item_finder::{FinderKey, ItemFinder, SlotChoice};

/// Tied-optimal builds for one query, best first.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub archetype: String,
    /// Shared average of every build, `None` when there are no builds.
    pub avg: Option<f64>,
    pub builds: Vec<Build>,
    /// Distributions scored during the search.
    pub distributions: usize,
}

impl Ranking {
    fn empty(archetype: &Archetype) -> Self {
        Self {
            archetype: archetype.name.clone(),
            avg: None,
            builds: Vec::new(),
            distributions: 0,
        }
    }
}

/// Order tied builds: fewer traits first, then by representative item ids.
fn rank(builds: &mut [Build]) {
    builds.sort_by(|a, b| {
        a.num_traits
            .cmp(&b.num_traits)
            .then_with(|| a.representative().cmp(&b.representative()))
    });
}

/// Shared entry point for build queries. Cheap to clone.
#[derive(Clone)]
pub struct Optimizer {
    catalog: Arc<Catalog>,
    packs: Arc<PackRegistry>,
    budget: Tokens,
}

impl Optimizer {
    pub fn new(catalog: Arc<Catalog>, packs: Arc<PackRegistry>) -> Self {
        Self {
            catalog,
            packs,
            budget: config::STANDARD_BUDGET,
        }
    }

    /// Replace the token budget every build must spend.
    pub fn with_budget(mut self, budget: Tokens) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> Tokens {
        self.budget
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn packs(&self) -> &PackRegistry {
        &self.packs
    }

    /// Find every tied-optimal build of `archetype_name` for a pack expression.
    /// An expression that resolves to no weights yields an empty ranking.
    pub async fn optimize(
        &self,
        archetype_name: &str,
        expression: &str,
    ) -> Result<Ranking, OptimizeError> {
        let archetype = self.catalog.archetype(archetype_name)?;
        let weights = match self.packs.resolve(&self.catalog, expression) {
            Ok(weights) => weights,
            Err(OptimizeError::EmptyQuery) => return Ok(Ranking::empty(archetype)),
            Err(e) => return Err(e),
        };
        self.optimize_weights(archetype, &weights).await
    }

    /// Run the search for an already resolved weight map.
    pub async fn optimize_weights(
        &self,
        archetype: &Archetype,
        weights: &CardWeights,
    ) -> Result<Ranking, OptimizeError> {
        let catalog = &self.catalog;
        let items = catalog.items_by_slot(&archetype.slot_types());
        let mut finder = ItemFinder::new(items, weights, |card| catalog.is_trait(card));
        finder.find_all();

        let outcome = CharacterFinder::new(&finder, archetype, self.budget)
            .find_all()
            .await?;
        let mut builds = outcome.builds;
        rank(&mut builds);
        Ok(Ranking {
            archetype: archetype.name.clone(),
            avg: builds.first().map(|b| b.avg),
            builds,
            distributions: outcome.distributions,
        })
    }

    /// `optimize` bounded by a wall-clock limit; the search is dropped at its
    /// next suspension point once the limit passes.
    pub async fn optimize_with_timeout(
        &self,
        archetype_name: &str,
        expression: &str,
        limit: Duration,
    ) -> Result<Ranking, OptimizeError> {
        tokio::time::timeout(limit, self.optimize(archetype_name, expression))
            .await
            .map_err(|_| OptimizeError::Cancelled)?
    }
}

// Errors surfaced by query resolution and the optimizer.

use crate::catalog::SlotType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizeError {
    #[error("unknown archetype '{0}'")]
    UnknownArchetype(String),
    #[error("unknown card '{0}'")]
    UnknownCard(String),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("unknown card pack '{0}'")]
    UnknownPack(String),
    #[error("invalid weight in term '{0}'")]
    InvalidWeight(String),
    #[error("query resolves to an empty weight map")]
    EmptyQuery,
    #[error("no token distribution spends the budget for archetype '{0}'")]
    InfeasibleBudget(String),
    #[error("optimization was cancelled")]
    Cancelled,
    #[error("item finder has no entry for {0}")]
    NotComputed(String),
    #[error("no items were provided for slot type {0}")]
    UnknownSlot(SlotType),
}

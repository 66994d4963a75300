use crate::catalog::Tokens;

/// Cards in a complete deck, traits included.
pub const DECK_SIZE: u32 = 36;

/// Tokens every character must spend: exactly 4 major and 4 minor.
pub const STANDARD_BUDGET: Tokens = Tokens::new(4, 4);

/// Search steps taken without finding a distribution before the search
/// hands control back to the runtime.
pub const PAUSE_EVERY: usize = 1024;

/// Relative tolerance when comparing scores and averages for ties.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Whether two non-negative scores tie within `TIE_TOLERANCE`.
pub fn same_score(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_score() {
        assert!(same_score(0.1 + 0.2, 0.3));
        assert!(same_score(12.0, 12.0));
        assert!(!same_score(12.0, 12.001));
        assert!(same_score(0.0, 0.0));
    }
}

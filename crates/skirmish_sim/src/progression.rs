//! # Progression
//!
//! Rank, rank XP and balance carried by each participant. The account
//! service that persists them is outside the simulation: it hands the
//! starting values in through a remote invocation and reads the results back
//! from the replicated avatar after the match.

use skirmish_shared::ProgressionConfig;

/// Progression fields of one participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Opaque per-connection token used for account lookups.
    pub unique_id: String,
    /// The account service confirmed the login.
    pub logged_in: bool,
    /// Rank, `min_rank..=max_rank`.
    pub rank: u8,
    /// XP toward the next rank.
    pub rank_xp: i32,
    /// Currency.
    pub balance: i64,
}

impl Profile {
    /// A fresh profile for `unique_id`.
    #[must_use]
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            logged_in: false,
            rank: 1,
            rank_xp: 0,
            balance: 0,
        }
    }

    /// Display name of the rank, e.g. `rank_3`.
    #[must_use]
    pub fn rank_name(&self) -> String {
        format!("rank_{}", self.rank)
    }

    /// Applies a match result.
    ///
    /// Winners gain XP and the win bonus; crossing the threshold ranks up and
    /// carries the remainder. Losers lose XP; dropping below zero ranks down
    /// with `threshold - deficit` XP. At the top rank XP keeps accumulating,
    /// at the bottom it floors at zero.
    pub fn apply_result(&mut self, won: bool, config: &ProgressionConfig) {
        if won {
            self.balance += config.win_bonus;
            let xp = self.rank_xp + config.xp_change;
            if xp < config.rank_threshold {
                self.rank_xp = xp;
                return;
            }
            let at_top = self.rank >= config.max_rank;
            self.rank = (self.rank + 1).min(config.max_rank);
            self.rank_xp = if at_top { xp } else { xp - config.rank_threshold };
        } else {
            let xp = self.rank_xp - config.xp_change;
            if xp >= 0 {
                self.rank_xp = xp;
                return;
            }
            let at_bottom = self.rank <= config.min_rank;
            self.rank = self.rank.saturating_sub(1).max(config.min_rank);
            self.rank_xp = if at_bottom {
                0
            } else {
                config.rank_threshold - xp.abs()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(rank: u8, xp: i32) -> Profile {
        Profile {
            rank,
            rank_xp: xp,
            ..Profile::new("token")
        }
    }

    #[test]
    fn test_win_without_rank_up() {
        let mut p = profile(2, 10);
        p.apply_result(true, &ProgressionConfig::default());
        assert_eq!((p.rank, p.rank_xp, p.balance), (2, 40, 100));
    }

    #[test]
    fn test_rank_up_carries_remainder() {
        let mut p = profile(2, 90);
        p.apply_result(true, &ProgressionConfig::default());
        assert_eq!((p.rank, p.rank_xp), (3, 20));
        assert_eq!(p.rank_name(), "rank_3");
    }

    #[test]
    fn test_top_rank_accumulates() {
        let mut p = profile(9, 90);
        p.apply_result(true, &ProgressionConfig::default());
        assert_eq!((p.rank, p.rank_xp), (9, 120));
    }

    #[test]
    fn test_rank_down() {
        let mut p = profile(3, 10);
        p.apply_result(false, &ProgressionConfig::default());
        assert_eq!((p.rank, p.rank_xp, p.balance), (2, 80, 0));
    }

    #[test]
    fn test_bottom_rank_floors() {
        let mut p = profile(1, 10);
        p.apply_result(false, &ProgressionConfig::default());
        assert_eq!((p.rank, p.rank_xp), (1, 0));

        let mut q = profile(1, 50);
        q.apply_result(false, &ProgressionConfig::default());
        assert_eq!((q.rank, q.rank_xp), (1, 20));
    }
}

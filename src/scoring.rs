//! Pool scoring: per-round points for each correct pick plus a seed-based
//! upset bonus.

use std::ops::Add;

use serde::Serialize;

use crate::bracket::{Bracket, Game, GameId};
use crate::config::ScoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Score {
    pub total: i64,
    pub correct_picks: u32,
    pub seed_bonus: i64,
}

impl Add for Score {
    type Output = Score;

    fn add(self, other: Score) -> Score {
        Score {
            total: self.total + other.total,
            correct_picks: self.correct_picks + other.correct_picks,
            seed_bonus: self.seed_bonus + other.seed_bonus,
        }
    }
}

/// Bonus for an upset: the seed gap between the winner and the better seed
/// in the game, times the round's factor. Zero when the favourite (or an
/// equal seed) wins, or when any seed is unknown.
pub fn upset_bonus(team1_seed: u8, team2_seed: u8, winner_seed: u8, factor: u32) -> u32 {
    if team1_seed == 0 || team2_seed == 0 || winner_seed == 0 {
        return 0;
    }
    let expected = team1_seed.min(team2_seed);
    if winner_seed > expected {
        (winner_seed - expected) as u32 * factor
    } else {
        0
    }
}

/// Points and bonus a pick earns against one result, `None` if the pick is
/// wrong or either side has no winner.
pub fn game_points(
    result: &Game,
    pick: &Game,
    round: usize,
    config: &ScoringConfig,
    apply_seed_bonus: bool,
) -> Option<(u32, u32)> {
    let actual = result.winner_name()?;
    let picked = pick.winner_name()?;
    if actual != picked {
        return None;
    }
    let points = config.points(round);
    let bonus = match (apply_seed_bonus, &result.team1, &result.team2, &result.winner) {
        (true, Some(t1), Some(t2), Some(w)) => {
            upset_bonus(t1.seed, t2.seed, w.seed, config.factor(round))
        }
        _ => 0,
    };
    Some((points, bonus))
}

fn add_game(score: &mut Score, points: u32, bonus: u32) {
    score.total += (points + bonus) as i64;
    score.correct_picks += 1;
    score.seed_bonus += bonus as i64;
}

/// Full score of `picks` against `results` (real or hypothetical).
pub fn score(
    results: &Bracket,
    picks: &Bracket,
    config: &ScoringConfig,
    apply_seed_bonus: bool,
) -> Score {
    let mut score = Score::default();
    for (id, game) in results.games() {
        if let Some((points, bonus)) =
            game_points(game, picks.game(id), id.round, config, apply_seed_bonus)
        {
            add_game(&mut score, points, bonus);
        }
    }
    score
}

/// Score of one participant split into a fixed base from games already
/// decided and a delta over the remaining games.
pub struct ScoreCard<'a> {
    picks: &'a Bracket,
    remaining: &'a [GameId],
    config: &'a ScoringConfig,
    apply_seed_bonus: bool,
    base: Score,
}

impl<'a> ScoreCard<'a> {
    pub fn new(
        results: &Bracket,
        picks: &'a Bracket,
        remaining: &'a [GameId],
        config: &'a ScoringConfig,
        apply_seed_bonus: bool,
    ) -> Self {
        ScoreCard {
            picks,
            remaining,
            config,
            apply_seed_bonus,
            base: score(results, picks, config, apply_seed_bonus),
        }
    }

    pub fn base(&self) -> Score {
        self.base
    }

    /// Contribution of the remaining games in `hypothetical`.
    pub fn delta(&self, hypothetical: &Bracket) -> Score {
        let mut delta = Score::default();
        for &id in self.remaining {
            if let Some((points, bonus)) = game_points(
                hypothetical.game(id),
                self.picks.game(id),
                id.round,
                self.config,
                self.apply_seed_bonus,
            ) {
                add_game(&mut delta, points, bonus);
            }
        }
        delta
    }

    pub fn total(&self, hypothetical: &Bracket) -> Score {
        self.base + self.delta(hypothetical)
    }
}

//! Outcome strings and the generators that produce them.
//!
//! A binary outcome is packed into a `u64`: bit `p` set means team1 wins
//! `remaining_games[p]`, written `1`; clear means team2 wins, written `0`.
//! Patterns extend the alphabet with `X` (either) and `D` (dead) and are
//! used once outcomes are merged for reporting.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::bracket::{Bracket, GameId, Side, ROUNDS};
use crate::config::SamplingStrategy;
use crate::error::{PoolError, PoolResult};

/// Widest outcome the `u64` encoding holds; a full bracket has 63 games.
pub const MAX_OUTCOME_BITS: usize = 63;

/// Largest space enumerated outcome by outcome.
pub const MAX_EXHAUSTIVE_OUTCOMES: u128 = 1 << 24;

/// Shares of a stratified budget.
pub const CHAMPION_SHARE: f64 = 0.25;
pub const NEXT_GAME_SHARE: f64 = 0.25;

// ---------------------------------------------------------------------------
// Binary outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Outcome(pub u64);

impl Outcome {
    /// The `index`-th outcome of exhaustive order: `index` written as an
    /// `len`-bit binary number, most significant bit at position 0.
    pub fn from_index(index: u64, len: usize) -> Self {
        if len == 0 {
            return Outcome(0);
        }
        Outcome(index.reverse_bits() >> (64 - len))
    }

    pub fn side(self, position: usize) -> Side {
        if self.0 >> position & 1 == 1 {
            Side::Team1
        } else {
            Side::Team2
        }
    }

    pub fn with_side(self, position: usize, side: Side) -> Self {
        match side {
            Side::Team1 => Outcome(self.0 | 1 << position),
            Side::Team2 => Outcome(self.0 & !(1 << position)),
        }
    }

    pub fn to_string_with_len(self, len: usize) -> String {
        (0..len)
            .map(|p| match self.side(p) {
                Side::Team1 => '1',
                Side::Team2 => '0',
            })
            .collect()
    }

    pub fn to_pattern(self, len: usize) -> Pattern {
        Pattern((0..len).map(|p| Pick::from_side(self.side(p))).collect())
    }
}

pub fn parse_outcome(s: &str) -> PoolResult<Outcome> {
    if s.len() > MAX_OUTCOME_BITS {
        return Err(PoolError::TooManyRemainingGames(s.len()));
    }
    let mut bits = 0u64;
    for (p, c) in s.chars().enumerate() {
        match c {
            '1' => bits |= 1 << p,
            '0' => {}
            _ => return Err(PoolError::InvalidValue(format!("bad outcome character '{}'", c))),
        }
    }
    Ok(Outcome(bits))
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pick {
    Team2,
    Team1,
    Either,
    Dead,
}

impl Pick {
    pub fn from_side(side: Side) -> Pick {
        match side {
            Side::Team1 => Pick::Team1,
            Side::Team2 => Pick::Team2,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Pick::Team1 => Some(Side::Team1),
            Pick::Team2 => Some(Side::Team2),
            _ => None,
        }
    }

    pub fn is_wildcard(self) -> bool {
        matches!(self, Pick::Either | Pick::Dead)
    }

    pub fn flipped(self) -> Pick {
        match self {
            Pick::Team1 => Pick::Team2,
            Pick::Team2 => Pick::Team1,
            other => other,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Pick::Team1 => '1',
            Pick::Team2 => '0',
            Pick::Either => 'X',
            Pick::Dead => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<Pick> {
        match c {
            '1' => Some(Pick::Team1),
            '0' => Some(Pick::Team2),
            'X' => Some(Pick::Either),
            'D' => Some(Pick::Dead),
            _ => None,
        }
    }
}

/// An outcome over `{0,1,X,D}`; denotes the set of binary outcomes it
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pattern(pub Vec<Pick>);

impl Pattern {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Pick {
        self.0[position]
    }

    pub fn with(&self, position: usize, pick: Pick) -> Pattern {
        let mut picks = self.0.clone();
        picks[position] = pick;
        Pattern(picks)
    }

    pub fn matches(&self, outcome: Outcome) -> bool {
        self.0.iter().enumerate().all(|(p, pick)| match pick.side() {
            Some(side) => outcome.side(p) == side,
            None => true,
        })
    }

    /// Number of binary outcomes the pattern stands for.
    pub fn cardinality(&self) -> u128 {
        1u128 << self.0.iter().filter(|p| p.is_wildcard()).count()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pick in &self.0 {
            write!(f, "{}", pick.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| {
                Pick::from_char(c).ok_or_else(|| {
                    PoolError::InvalidValue(format!("bad pattern character '{}'", c))
                })
            })
            .collect::<PoolResult<Vec<_>>>()
            .map(Pattern)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SamplingMode {
    Exhaustive,
    MonteCarlo,
    Stratified,
}

/// Outcomes to evaluate plus how they were chosen.
#[derive(Debug, Clone)]
pub struct OutcomePlan {
    pub mode: SamplingMode,
    pub outcomes: Vec<Outcome>,
    /// Size of the full outcome space, `2^n`.
    pub total_space: u128,
}

pub fn outcome_space(remaining: usize) -> u128 {
    1u128 << remaining
}

pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// All `2^n` outcomes in increasing integer order.
pub fn exhaustive(len: usize) -> PoolResult<Vec<Outcome>> {
    if len > MAX_OUTCOME_BITS {
        return Err(PoolError::TooManyRemainingGames(len));
    }
    if outcome_space(len) > MAX_EXHAUSTIVE_OUTCOMES {
        return Err(PoolError::BudgetExceeded {
            required: outcome_space(len),
            allowed: MAX_EXHAUSTIVE_OUTCOMES,
        });
    }
    Ok((0..1u64 << len).map(|i| Outcome::from_index(i, len)).collect())
}

fn random_outcome<R: Rng>(rng: &mut R, len: usize) -> Outcome {
    (0..len).fold(Outcome(0), |acc, p| {
        if rng.gen::<bool>() {
            acc.with_side(p, Side::Team1)
        } else {
            acc
        }
    })
}

/// `count` outcomes with every bit drawn independently and uniformly.
pub fn monte_carlo<R: Rng>(rng: &mut R, len: usize, count: usize) -> Vec<Outcome> {
    (0..count).map(|_| random_outcome(rng, len)).collect()
}

/// Forced bits that make `team` win every remaining game on its path to
/// the title. Empty when the team is not in any remaining game.
pub fn champion_path(results: &Bracket, remaining: &[GameId], team: &str) -> Vec<(usize, Side)> {
    let Some(start) = remaining
        .iter()
        .position(|&id| results.game(id).contains(team))
    else {
        return Vec::new();
    };
    let mut forced = Vec::new();
    let mut id = remaining[start];
    let mut side = match results.game(id).side_of(team) {
        Some(s) => s,
        None => return forced,
    };
    loop {
        if let Some(position) = remaining.iter().position(|&g| g == id) {
            forced.push((position, side));
        }
        match id.parent() {
            Some((parent, slot)) => {
                id = parent;
                side = slot;
            }
            None => break,
        }
    }
    forced
}

/// Budget split across champion-forcing, next-game enumeration and uniform
/// fill. Weights are not touched: each outcome is still weighted by its own
/// probability downstream.
pub fn stratified<R: Rng>(
    rng: &mut R,
    results: &Bracket,
    remaining: &[GameId],
    budget: usize,
) -> Vec<Outcome> {
    let len = remaining.len();
    let mut outcomes = Vec::with_capacity(budget);

    let mut alive: Vec<String> = results.alive_teams().into_iter().collect();
    alive.sort();
    let champion_budget = (budget as f64 * CHAMPION_SHARE) as usize;
    if !alive.is_empty() && champion_budget > 0 {
        // Equal count per team; a budget smaller than the field forces a
        // random subset once each.
        let (forced, per_team): (Vec<&String>, usize) = if champion_budget < alive.len() {
            (alive.choose_multiple(rng, champion_budget).collect(), 1)
        } else {
            (alive.iter().collect(), champion_budget / alive.len())
        };
        for team in forced {
            let path = champion_path(results, remaining, team);
            for _ in 0..per_team {
                let outcome = path
                    .iter()
                    .fold(random_outcome(rng, len), |o, &(p, side)| o.with_side(p, side));
                outcomes.push(outcome);
            }
        }
    }

    let playable: Vec<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, id)| results.game(**id).is_playable())
        .map(|(p, _)| p)
        .collect();
    let next_budget = (budget as f64 * NEXT_GAME_SHARE) as usize;
    if !playable.is_empty() && next_budget > 0 {
        let combos = match playable.len() {
            k if k < 63 => 1u64 << k,
            _ => u64::MAX,
        };
        // Every combination the same number of times, or one random
        // combination per sample when they outnumber the budget.
        let draws: Vec<u64> = if combos <= next_budget as u64 {
            let per_combo = next_budget as u64 / combos;
            (0..combos * per_combo).map(|j| j % combos).collect()
        } else {
            (0..next_budget).map(|_| rng.gen::<u64>()).collect()
        };
        for combo in draws {
            let mut outcome = random_outcome(rng, len);
            for (k, &p) in playable.iter().enumerate() {
                let side = if combo >> k & 1 == 1 { Side::Team1 } else { Side::Team2 };
                outcome = outcome.with_side(p, side);
            }
            outcomes.push(outcome);
        }
    }

    while outcomes.len() < budget {
        outcomes.push(random_outcome(rng, len));
    }
    debug!(
        "Stratified sample of {} ({} alive teams, {} playable games)",
        outcomes.len(),
        alive.len(),
        playable.len()
    );
    outcomes
}

/// Choose exhaustive enumeration when the space fits the budget (or no
/// budget was given), otherwise sample.
pub fn plan_outcomes(
    results: &Bracket,
    remaining: &[GameId],
    max_simulations: Option<u64>,
    strategy: SamplingStrategy,
    rng_seed: Option<u64>,
) -> PoolResult<OutcomePlan> {
    let len = remaining.len();
    if len > MAX_OUTCOME_BITS {
        return Err(PoolError::TooManyRemainingGames(len));
    }
    if max_simulations == Some(0) {
        return Err(PoolError::InvalidValue(
            "simulation budget must be at least 1".to_string(),
        ));
    }
    let total_space = outcome_space(len);
    let budget = match max_simulations {
        Some(m) if total_space > m as u128 => m as usize,
        _ => {
            return Ok(OutcomePlan {
                mode: SamplingMode::Exhaustive,
                outcomes: exhaustive(len)?,
                total_space,
            })
        }
    };

    let mut rng = make_rng(rng_seed);
    let (mode, outcomes) = match strategy {
        SamplingStrategy::Uniform => (SamplingMode::MonteCarlo, monte_carlo(&mut rng, len, budget)),
        SamplingStrategy::Stratified => (
            SamplingMode::Stratified,
            stratified(&mut rng, results, remaining, budget),
        ),
    };
    Ok(OutcomePlan {
        mode,
        outcomes,
        total_space,
    })
}

/// Round of each outcome position.
pub fn position_rounds(remaining: &[GameId]) -> Vec<usize> {
    remaining.iter().map(|id| id.round.min(ROUNDS)).collect()
}

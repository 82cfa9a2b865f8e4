//! Single-elimination bracket model for a 64-team field.
//!
//! Six rounds of 32/16/8/4/2/1 games. Game `i` of round `r` feeds slot
//! `i % 2` of game `i / 2` in round `r + 1`; all addressing is arithmetic on
//! that geometry.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

pub const ROUNDS: usize = 6;
pub const TEAMS: usize = 64;

/// Games per round, indexed by round number (index 0 unused).
pub const GAMES_PER_ROUND: [usize; ROUNDS + 1] = [0, 32, 16, 8, 4, 2, 1];

pub const ROUND_KEYS: [&str; ROUNDS] = ["round1", "round2", "round3", "round4", "round5", "round6"];

pub const REGION_ORDER: [&str; 4] = ["East", "West", "South", "Midwest"];

/// Round-1 seed pairings within a region, in bracket order.
pub const MATCHUP_PAIRS: [(u8, u8); 8] = [
    (1, 16),
    (8, 9),
    (5, 12),
    (4, 13),
    (6, 11),
    (3, 14),
    (7, 10),
    (2, 15),
];

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// 1-16 within the region; 0 when unknown.
    #[serde(default)]
    pub seed: u8,
    #[serde(default)]
    pub region: String,
}

impl Team {
    pub fn new(name: impl Into<String>, seed: u8, region: impl Into<String>) -> Self {
        Team {
            name: name.into(),
            seed,
            region: region.into(),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seed > 0 {
            write!(f, "({}) {}", self.seed, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Teams are shared between the results bracket and every hypothetical
/// bracket projected from it.
pub type TeamRef = Arc<Team>;

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    /// Slot a game at `index` feeds in its parent.
    pub fn from_index(index: usize) -> Side {
        if index % 2 == 0 {
            Side::Team1
        } else {
            Side::Team2
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId {
    pub round: usize,
    pub index: usize,
}

impl GameId {
    pub fn new(round: usize, index: usize) -> Self {
        GameId { round, index }
    }

    pub fn is_valid(&self) -> bool {
        (1..=ROUNDS).contains(&self.round) && self.index < GAMES_PER_ROUND[self.round]
    }

    /// The championship has no parent.
    pub fn parent(self) -> Option<(GameId, Side)> {
        if self.round >= ROUNDS {
            return None;
        }
        Some((
            GameId::new(self.round + 1, self.index / 2),
            Side::from_index(self.index),
        ))
    }

    /// Round-1 games have no feeders.
    pub fn feeders(self) -> Option<(GameId, GameId)> {
        if self.round <= 1 {
            return None;
        }
        Some((
            GameId::new(self.round - 1, self.index * 2),
            GameId::new(self.round - 1, self.index * 2 + 1),
        ))
    }

    pub fn feeder(self, side: Side) -> Option<GameId> {
        self.feeders().map(|(a, b)| match side {
            Side::Team1 => a,
            Side::Team2 => b,
        })
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}-{}", self.round, self.index)
    }
}

/// `"round3"` → 3.
pub fn round_index_of(key: &str) -> PoolResult<usize> {
    ROUND_KEYS
        .iter()
        .position(|&k| k == key)
        .map(|i| i + 1)
        .ok_or_else(|| PoolError::InvalidRound(key.to_string()))
}

pub fn parent_of(round: usize, index: usize) -> Option<(GameId, Side)> {
    GameId::new(round, index).parent()
}

pub fn feeders_of(round: usize, index: usize) -> Option<(GameId, GameId)> {
    GameId::new(round, index).feeders()
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Game {
    pub team1: Option<TeamRef>,
    pub team2: Option<TeamRef>,
    pub winner: Option<TeamRef>,
}

impl Game {
    pub fn new(team1: Option<TeamRef>, team2: Option<TeamRef>) -> Self {
        Game {
            team1,
            team2,
            winner: None,
        }
    }

    pub fn team(&self, side: Side) -> Option<&TeamRef> {
        match side {
            Side::Team1 => self.team1.as_ref(),
            Side::Team2 => self.team2.as_ref(),
        }
    }

    pub fn set_team(&mut self, side: Side, team: Option<TeamRef>) {
        match side {
            Side::Team1 => self.team1 = team,
            Side::Team2 => self.team2 = team,
        }
    }

    pub fn winner_of(&self) -> Option<&TeamRef> {
        self.winner.as_ref()
    }

    pub fn winner_name(&self) -> Option<&str> {
        self.winner.as_deref().map(|t| t.name.as_str())
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// Both teams known and no winner yet.
    pub fn is_playable(&self) -> bool {
        self.team1.is_some() && self.team2.is_some() && self.winner.is_none()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.side_of(name).is_some()
    }

    pub fn side_of(&self, name: &str) -> Option<Side> {
        if self.team1.as_deref().is_some_and(|t| t.name == name) {
            Some(Side::Team1)
        } else if self.team2.as_deref().is_some_and(|t| t.name == name) {
            Some(Side::Team2)
        } else {
            None
        }
    }

    pub fn loser(&self) -> Option<&TeamRef> {
        let winner = self.winner_name()?;
        match self.side_of(winner)? {
            Side::Team1 => self.team2.as_ref(),
            Side::Team2 => self.team1.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bracket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    rounds: Vec<Vec<Game>>,
    pub winner: Option<TeamRef>,
}

impl Default for Bracket {
    fn default() -> Self {
        Bracket::empty()
    }
}

impl Bracket {
    pub fn empty() -> Self {
        let rounds = (1..=ROUNDS)
            .map(|r| vec![Game::default(); GAMES_PER_ROUND[r]])
            .collect();
        Bracket {
            rounds,
            winner: None,
        }
    }

    /// Build from explicit rounds; every round must have its full game count.
    pub fn from_rounds(rounds: Vec<Vec<Game>>, winner: Option<TeamRef>) -> PoolResult<Self> {
        if rounds.len() != ROUNDS {
            return Err(PoolError::InvalidValue(format!(
                "expected {} rounds, got {}",
                ROUNDS,
                rounds.len()
            )));
        }
        for (i, games) in rounds.iter().enumerate() {
            let expected = GAMES_PER_ROUND[i + 1];
            if games.len() != expected {
                return Err(PoolError::BracketShape {
                    round: i + 1,
                    expected,
                    got: games.len(),
                });
            }
        }
        Ok(Bracket { rounds, winner })
    }

    /// Place a field into round 1 region by region using the standard
    /// seed pairings. Missing seeds leave their slot empty.
    pub fn seeded(teams: &[Team]) -> Self {
        let mut bracket = Bracket::empty();
        let mut index = 0;
        for region in REGION_ORDER {
            for (seed1, seed2) in MATCHUP_PAIRS {
                let find = |seed: u8| {
                    teams
                        .iter()
                        .find(|t| t.region == region && t.seed == seed)
                        .map(|t| Arc::new(t.clone()))
                };
                bracket.rounds[0][index] = Game::new(find(seed1), find(seed2));
                index += 1;
            }
        }
        bracket
    }

    pub fn round(&self, round: usize) -> &[Game] {
        &self.rounds[round - 1]
    }

    pub fn rounds(&self) -> &[Vec<Game>] {
        &self.rounds
    }

    pub fn game(&self, id: GameId) -> &Game {
        &self.rounds[id.round - 1][id.index]
    }

    pub fn game_mut(&mut self, id: GameId) -> &mut Game {
        &mut self.rounds[id.round - 1][id.index]
    }

    pub fn get(&self, id: GameId) -> Option<&Game> {
        self.rounds.get(id.round.checked_sub(1)?)?.get(id.index)
    }

    /// All games in round-then-index order.
    pub fn games(&self) -> impl Iterator<Item = (GameId, &Game)> {
        self.rounds.iter().enumerate().flat_map(|(r, games)| {
            games
                .iter()
                .enumerate()
                .map(move |(i, g)| (GameId::new(r + 1, i), g))
        })
    }

    pub fn champion(&self) -> Option<&TeamRef> {
        self.rounds[ROUNDS - 1][0].winner.as_ref()
    }

    /// Set a game's winner and push it into the parent slot. `None` clears
    /// both.
    pub fn advance(&mut self, id: GameId, winner: Option<TeamRef>) {
        self.game_mut(id).winner = winner.clone();
        match id.parent() {
            Some((parent, side)) => self.game_mut(parent).set_team(side, winner),
            None => self.winner = winner,
        }
    }

    /// Record the result of a playable game.
    pub fn record_result(&mut self, id: GameId, side: Side) -> PoolResult<()> {
        if !id.is_valid() || !self.game(id).is_playable() {
            return Err(PoolError::NotPlayable {
                round: id.round,
                index: id.index,
            });
        }
        let winner = self.game(id).team(side).cloned();
        self.advance(id, winner);
        Ok(())
    }

    /// Record every playable game in round order with the side chosen by
    /// `pick`, until nothing is playable.
    pub fn complete_with<F>(&mut self, mut pick: F)
    where
        F: FnMut(GameId, &Game) -> Side,
    {
        for round in 1..=ROUNDS {
            for index in 0..GAMES_PER_ROUND[round] {
                let id = GameId::new(round, index);
                let game = self.game(id);
                if game.is_playable() {
                    let side = pick(id, game);
                    let winner = game.team(side).cloned();
                    self.advance(id, winner);
                }
            }
        }
    }

    /// Undecided games whose two slots are either filled or fed by another
    /// remaining game, in round-then-index order. Position `i` of every
    /// outcome string refers to entry `i` of this list.
    pub fn remaining_games(&self) -> Vec<GameId> {
        let mut live: HashSet<GameId> = HashSet::new();
        let mut remaining = Vec::new();
        for (id, game) in self.games() {
            if game.is_decided() {
                continue;
            }
            let fillable = |side: Side| {
                game.team(side).is_some()
                    || id.feeder(side).is_some_and(|f| live.contains(&f))
            };
            if fillable(Side::Team1) && fillable(Side::Team2) {
                live.insert(id);
                remaining.push(id);
            }
        }
        remaining
    }

    pub fn playable_games(&self) -> Vec<GameId> {
        self.games()
            .filter(|(_, g)| g.is_playable())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.winner.is_some()
    }

    /// Names of teams sitting in undecided games.
    pub fn alive_teams(&self) -> HashSet<String> {
        let mut alive = HashSet::new();
        for (_, game) in self.games() {
            if game.is_decided() {
                continue;
            }
            for team in [&game.team1, &game.team2].into_iter().flatten() {
                alive.insert(team.name.clone());
            }
        }
        alive
    }

    /// Deepest round the team has appeared in; `ROUNDS + 1` for the champion.
    pub fn rounds_reached(&self, name: &str) -> Option<usize> {
        if self.champion().is_some_and(|t| t.name == name) {
            return Some(ROUNDS + 1);
        }
        (1..=ROUNDS)
            .rev()
            .find(|&r| self.round(r).iter().any(|g| g.contains(name)))
    }

    /// Every distinct team in round 1, in bracket order.
    pub fn teams(&self) -> Vec<TeamRef> {
        self.round(1)
            .iter()
            .flat_map(|g| [g.team1.clone(), g.team2.clone()])
            .flatten()
            .collect()
    }

    /// Round and index of the earliest undecided game holding `name`.
    pub fn current_game_of(&self, name: &str) -> Option<GameId> {
        self.games()
            .find(|(_, g)| !g.is_decided() && g.contains(name))
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_games_per_round_sum() {
        let total: usize = GAMES_PER_ROUND.iter().sum();
        assert_eq!(total, TEAMS - 1);
    }

    #[test]
    fn test_parent_and_feeders_invert() {
        for round in 2..=ROUNDS {
            for index in 0..GAMES_PER_ROUND[round] {
                let (a, b) = feeders_of(round, index).unwrap();
                assert_eq!(a.parent(), Some((GameId::new(round, index), Side::Team1)));
                assert_eq!(b.parent(), Some((GameId::new(round, index), Side::Team2)));
            }
        }
        assert!(parent_of(6, 0).is_none());
        assert!(feeders_of(1, 5).is_none());
    }

    #[test]
    fn test_round_index_of() {
        assert_eq!(round_index_of("round1").unwrap(), 1);
        assert_eq!(round_index_of("round6").unwrap(), 6);
        assert!(round_index_of("round7").is_err());
    }
}

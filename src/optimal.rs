//! Best-case completion of the tournament for a single participant.
//!
//! Every alive pick is first forced to win as far as the participant took
//! it, following opponents through a worklist. Games that cannot earn the
//! participant points are dead. The rest are enumerated, and the tied
//! maximum-score completions are merged into a single pattern.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::bracket::{Bracket, GameId, Side, TeamRef, GAMES_PER_ROUND, ROUNDS};
use crate::config::{MergeStrategy, ScoringConfig};
use crate::error::{PoolError, PoolResult};
use crate::merge::{has_live_pick_on_path, merge_outcomes, to_patterns, top_k};
use crate::outcomes::{outcome_space, position_rounds, Outcome, Pattern, Pick};
use crate::probability::ProbabilityModel;
use crate::projection::Projector;
use crate::report::{decode_pattern, DecodedGame};
use crate::scoring::score;
use crate::simulate::Participant;

/// Largest number of completions the search will enumerate.
pub const MAX_OPTIMAL_OUTCOMES: u128 = 1 << 20;

#[derive(Debug, Clone, Serialize)]
pub struct OptimalBracket {
    pub participant: String,
    /// Over the results' remaining games.
    pub pattern: Pattern,
    pub probability: f64,
    pub games: Vec<DecodedGame>,
    pub max_score: i64,
    pub tied_outcomes: usize,
}

// ---------------------------------------------------------------------------
// Pick lookups
// ---------------------------------------------------------------------------

fn picked_winner_in(picks: &Bracket, round: usize, name: &str) -> bool {
    picks
        .round(round)
        .iter()
        .any(|g| g.winner_name() == Some(name))
}

/// Last round the participant has `name` winning, 0 if never.
fn furthest_round(picks: &Bracket, name: &str) -> usize {
    (1..=ROUNDS)
        .rev()
        .find(|&r| picked_winner_in(picks, r, name))
        .unwrap_or(0)
}

/// Like [`furthest_round`] but capped at `max_round`, and at least 1.
fn furthest_round_within(picks: &Bracket, name: &str, max_round: usize) -> usize {
    (1..=max_round)
        .rev()
        .find(|&r| picked_winner_in(picks, r, name))
        .unwrap_or(1)
}

/// Alive teams picked to win the deepest round that still has any.
fn starting_teams(picks: &Bracket, alive: &HashSet<String>) -> Vec<String> {
    for round in (1..=ROUNDS).rev() {
        let mut teams: Vec<String> = picks
            .round(round)
            .iter()
            .filter_map(|g| g.winner_name())
            .filter(|name| alive.contains(*name))
            .map(str::to_string)
            .collect();
        if !teams.is_empty() {
            teams.sort();
            teams.dedup();
            return teams;
        }
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Step 1: force picks forward
// ---------------------------------------------------------------------------

struct Forcer<'a> {
    picks: &'a Bracket,
    alive: &'a HashSet<String>,
    teams: HashMap<String, TeamRef>,
}

impl<'a> Forcer<'a> {
    fn opponent(&self, name: &str, round: usize) -> (String, usize) {
        let target = furthest_round_within(self.picks, name, round).min(round);
        (name.to_string(), target)
    }

    /// Make `team` win each of its undecided games up to `target`, returning
    /// the alive teams the participant had it beating along the way.
    fn mark_winning(&self, optimal: &mut Bracket, team: &str, target: usize) -> Vec<(String, usize)> {
        let mut opponents = Vec::new();
        for round in 1..=target.min(ROUNDS) {
            for index in 0..GAMES_PER_ROUND[round] {
                let id = GameId::new(round, index);
                let game = optimal.game(id);
                if game.is_decided() {
                    continue;
                }
                let pick = self.picks.game(id);

                let side = match game.side_of(team) {
                    Some(side) => side,
                    None => match pick.side_of(team) {
                        Some(side) if game.team(side).is_none() => {
                            let placed = self.teams.get(team).cloned();
                            if placed.is_none() {
                                continue;
                            }
                            optimal.game_mut(id).set_team(side, placed);
                            side
                        }
                        _ => continue,
                    },
                };

                for other in [&pick.team1, &pick.team2].into_iter().flatten() {
                    if other.name != team && self.alive.contains(&other.name) {
                        opponents.push(self.opponent(&other.name, round));
                    }
                }
                let winner = optimal.game(id).team(side).cloned();
                optimal.advance(id, winner);
                break;
            }
        }
        opponents
    }

    fn run(&self, results: &Bracket) -> Bracket {
        let mut optimal = results.clone();
        let mut worklist: Vec<(String, usize)> = starting_teams(self.picks, self.alive)
            .into_iter()
            .map(|name| {
                let target = furthest_round(self.picks, &name);
                (name, target)
            })
            .collect();
        let mut processed = HashSet::new();

        while let Some((team, target)) = worklist.pop() {
            if !processed.insert(team.clone()) {
                continue;
            }
            for (opponent, target) in self.mark_winning(&mut optimal, &team, target) {
                if !processed.contains(&opponent) {
                    worklist.push((opponent, target));
                }
            }
        }
        optimal
    }
}

// ---------------------------------------------------------------------------
// Steps 2-3: dead games and enumeration
// ---------------------------------------------------------------------------

/// Undecided, live games whose slots are filled or fed by another such game.
fn simulation_games(optimal: &Bracket, dead: &HashSet<GameId>) -> Vec<GameId> {
    let mut live = HashSet::new();
    let mut games = Vec::new();
    for (id, game) in optimal.games() {
        if game.is_decided() || dead.contains(&id) {
            continue;
        }
        let fillable = |side: Side| {
            game.team(side).is_some() || id.feeder(side).is_some_and(|f| live.contains(&f))
        };
        if fillable(Side::Team1) && fillable(Side::Team2) {
            live.insert(id);
            games.push(id);
        }
    }
    games
}

/// Probability of a pattern as a product of per-game conditional chances.
/// Wildcard games count as certain and advance the better seed so later
/// games still have two teams.
pub fn pattern_probability(
    results: &Bracket,
    remaining: &[GameId],
    pattern: &Pattern,
    model: Option<&ProbabilityModel>,
) -> f64 {
    let mut bracket = results.clone();
    let mut probability = 1.0;
    for (position, &id) in remaining.iter().enumerate() {
        let game = bracket.game(id);
        let (Some(t1), Some(t2)) = (&game.team1, &game.team2) else {
            continue;
        };
        let winner = match pattern.get(position).side() {
            Some(side) => {
                let (winner, loser) = match side {
                    Side::Team1 => (t1, t2),
                    Side::Team2 => (t2, t1),
                };
                probability *= model.map_or(0.5, |m| {
                    m.game_probability(&winner.name, &loser.name, id.round)
                });
                winner.clone()
            }
            None if t2.seed != 0 && (t1.seed == 0 || t2.seed < t1.seed) => t2.clone(),
            None => t1.clone(),
        };
        bracket.advance(id, Some(winner));
    }
    probability
}

pub fn optimal_bracket(
    results: &Bracket,
    participant: &Participant,
    model: Option<&ProbabilityModel>,
    scoring: &ScoringConfig,
) -> PoolResult<OptimalBracket> {
    let picks = &participant.picks;
    let alive = results.alive_teams();
    let forcer = Forcer {
        picks,
        alive: &alive,
        teams: results
            .teams()
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect(),
    };
    let optimal = forcer.run(results);

    let dead: HashSet<GameId> = optimal
        .games()
        .filter(|(id, g)| !g.is_decided() && !has_live_pick_on_path(picks, *id, &alive))
        .map(|(id, _)| id)
        .collect();
    let sim_games = simulation_games(&optimal, &dead);
    let required = outcome_space(sim_games.len().min(127));
    if required > MAX_OPTIMAL_OUTCOMES {
        return Err(PoolError::BudgetExceeded {
            required,
            allowed: MAX_OPTIMAL_OUTCOMES,
        });
    }
    debug!(
        "{}: {} games simulated, {} dead",
        participant.name,
        sim_games.len(),
        dead.len()
    );

    let mut projector = Projector::new(&optimal, &sim_games);
    let mut max_score = i64::MIN;
    let mut tied: HashMap<Outcome, f64> = HashMap::new();
    for index in 0..required as u64 {
        let outcome = Outcome::from_index(index, sim_games.len());
        let total = score(projector.project(outcome), picks, scoring, true).total + participant.bonus;
        if total > max_score {
            max_score = total;
            tied.clear();
        }
        if total == max_score {
            tied.insert(outcome, 1.0);
        }
    }

    let no_dead = vec![false; sim_games.len()];
    let merged = merge_outcomes(
        to_patterns(&tied, sim_games.len(), &no_dead),
        &position_rounds(&sim_games),
        MergeStrategy::RoundOrdered,
    );
    let best = top_k(&merged, 1)
        .into_iter()
        .next()
        .map(|(pattern, _)| pattern)
        .unwrap_or_default();

    let remaining = results.remaining_games();
    let pattern = Pattern(
        remaining
            .iter()
            .map(|&id| {
                if dead.contains(&id) {
                    return Pick::Dead;
                }
                if let Some(position) = sim_games.iter().position(|&g| g == id) {
                    return best.0.get(position).copied().unwrap_or(Pick::Either);
                }
                let game = optimal.game(id);
                game.winner_name()
                    .and_then(|name| game.side_of(name))
                    .map_or(Pick::Either, Pick::from_side)
            })
            .collect(),
    );

    Ok(OptimalBracket {
        participant: participant.name.clone(),
        probability: pattern_probability(results, &remaining, &pattern, model),
        games: decode_pattern(results, &remaining, &pattern),
        pattern,
        max_score,
        tied_outcomes: tied.len(),
    })
}

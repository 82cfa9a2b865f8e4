//! Turning an outcome tally into the per-participant pool report: win and
//! lose odds, average place, merged scenarios and next-game swings.

use std::collections::HashMap;

use serde::Serialize;

use crate::bracket::{Bracket, GameId, Side, Team};
use crate::config::{ScoringConfig, SimulationConfig};
use crate::merge::{dead_positions, merge_outcomes, to_patterns, top_k};
use crate::outcomes::{position_rounds, Outcome, Pattern, Pick, SamplingMode};
use crate::projection::project_pattern;
use crate::scoring::score;
use crate::simulate::{conditional_odds, OutcomeTally, Participant};

/// What a pattern says about one game.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Winner(Team),
    /// The pattern picks a side whose team is not known yet because an
    /// earlier game on its path is a wildcard.
    Pending(Side),
    Either,
    Dead,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedGame {
    pub game: GameId,
    pub team1: Option<Team>,
    pub team2: Option<Team>,
    pub result: GameResult,
}

/// Per-game results a pattern stands for, in remaining-game order.
pub fn decode_pattern(results: &Bracket, remaining: &[GameId], pattern: &Pattern) -> Vec<DecodedGame> {
    let bracket = project_pattern(results, remaining, pattern);
    remaining
        .iter()
        .enumerate()
        .map(|(position, &id)| {
            let game = bracket.game(id);
            let result = match pattern.get(position) {
                Pick::Either => GameResult::Either,
                Pick::Dead => GameResult::Dead,
                pick => {
                    let side = pick.side().unwrap_or(Side::Team1);
                    match game.team(side) {
                        Some(team) => GameResult::Winner(Team::clone(team)),
                        None => GameResult::Pending(side),
                    }
                }
            };
            DecodedGame {
                game: id,
                team1: game.team1.as_deref().cloned(),
                team2: game.team2.as_deref().cloned(),
                result,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub pattern: Pattern,
    pub probability: f64,
    pub games: Vec<DecodedGame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantReport {
    pub name: String,
    /// Points already banked from decided games, bonus included.
    pub current_score: i64,
    pub win_probability: f64,
    pub lose_probability: f64,
    pub average_place: f64,
    pub winning_scenarios: Vec<Scenario>,
    pub losing_scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOdds {
    pub participant: String,
    pub win: Option<f64>,
    pub lose: Option<f64>,
}

/// Pool odds conditioned on each result of a game that is ready to play.
#[derive(Debug, Clone, Serialize)]
pub struct NextGameOdds {
    pub game: GameId,
    pub team1: Team,
    pub team2: Team,
    pub if_team1_wins: Vec<GameOdds>,
    pub if_team2_wins: Vec<GameOdds>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub mode: Option<SamplingMode>,
    pub remaining_games: usize,
    pub total_outcomes: u128,
    pub outcomes_evaluated: usize,
    pub participants: Vec<ParticipantReport>,
    pub next_games: Vec<NextGameOdds>,
}

struct ScenarioBuilder<'a> {
    results: &'a Bracket,
    remaining: &'a [GameId],
    dead: Vec<bool>,
    rounds: Vec<usize>,
    config: &'a SimulationConfig,
}

impl<'a> ScenarioBuilder<'a> {
    fn build(&self, raw: &HashMap<Outcome, f64>) -> Vec<Scenario> {
        let patterns = to_patterns(raw, self.remaining.len(), &self.dead);
        let merged = merge_outcomes(patterns, &self.rounds, self.config.merge);
        top_k(&merged, self.config.top_scenarios)
            .into_iter()
            .map(|(pattern, probability)| Scenario {
                games: decode_pattern(self.results, self.remaining, &pattern),
                pattern,
                probability,
            })
            .collect()
    }
}

fn odds_for(participants: &[Participant], odds: Vec<(Option<f64>, Option<f64>)>) -> Vec<GameOdds> {
    participants
        .iter()
        .zip(odds)
        .map(|(p, (win, lose))| GameOdds {
            participant: p.name.clone(),
            win,
            lose,
        })
        .collect()
}

pub fn build_report(
    results: &Bracket,
    participants: &[Participant],
    tally: &OutcomeTally,
    scoring: &ScoringConfig,
    config: &SimulationConfig,
) -> PoolReport {
    let picks: Vec<&Bracket> = participants.iter().map(|p| &p.picks).collect();
    let scenarios = ScenarioBuilder {
        results,
        remaining: &tally.remaining,
        dead: dead_positions(results, &tally.remaining, &picks),
        rounds: position_rounds(&tally.remaining),
        config,
    };

    let reports = participants
        .iter()
        .enumerate()
        .map(|(i, p)| ParticipantReport {
            name: p.name.clone(),
            current_score: score(results, &p.picks, scoring, config.apply_seed_bonus).total
                + p.bonus,
            win_probability: tally.win[i],
            lose_probability: tally.lose[i],
            average_place: tally.average_place[i],
            winning_scenarios: scenarios.build(&tally.winning[i]),
            losing_scenarios: scenarios.build(&tally.losing[i]),
        })
        .collect();

    let next_games = tally
        .remaining
        .iter()
        .enumerate()
        .filter_map(|(position, &id)| {
            let game = results.game(id);
            let (team1, team2) = match (&game.team1, &game.team2) {
                (Some(t1), Some(t2)) if game.is_playable() => (Team::clone(t1), Team::clone(t2)),
                _ => return None,
            };
            Some(NextGameOdds {
                game: id,
                team1,
                team2,
                if_team1_wins: odds_for(participants, conditional_odds(tally, position, Side::Team1)),
                if_team2_wins: odds_for(participants, conditional_odds(tally, position, Side::Team2)),
            })
        })
        .collect();

    PoolReport {
        mode: tally.mode,
        remaining_games: tally.remaining.len(),
        total_outcomes: tally.total_space,
        outcomes_evaluated: tally.evaluated,
        participants: reports,
        next_games,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_decode_wildcards() {
        let mut results = Bracket::empty();
        let a = Arc::new(Team::new("A", 1, "East"));
        let b = Arc::new(Team::new("B", 16, "East"));
        let c = Arc::new(Team::new("C", 8, "East"));
        let d = Arc::new(Team::new("D", 9, "East"));
        results.game_mut(GameId::new(1, 0)).team1 = Some(a);
        results.game_mut(GameId::new(1, 0)).team2 = Some(b);
        results.game_mut(GameId::new(1, 1)).team1 = Some(c);
        results.game_mut(GameId::new(1, 1)).team2 = Some(d);
        let remaining = results.remaining_games();
        assert_eq!(remaining.len(), 3);

        let pattern: Pattern = "1X1".parse().unwrap();
        let games = decode_pattern(&results, &remaining, &pattern);
        assert_eq!(games[0].result, GameResult::Winner(Team::new("A", 1, "East")));
        assert_eq!(games[1].result, GameResult::Either);
        assert_eq!(games[2].result, GameResult::Winner(Team::new("A", 1, "East")));

        let pattern: Pattern = "X10".parse().unwrap();
        let games = decode_pattern(&results, &remaining, &pattern);
        assert_eq!(games[2].result, GameResult::Winner(Team::new("C", 8, "East")));
        assert!(games[2].team1.is_none());

        let pattern: Pattern = "X11".parse().unwrap();
        let games = decode_pattern(&results, &remaining, &pattern);
        assert_eq!(games[2].result, GameResult::Pending(Side::Team1));
    }
}

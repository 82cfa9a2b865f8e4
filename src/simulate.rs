//! Pool simulation: score every participant against every generated outcome
//! and accumulate probability mass for first and last place.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::bracket::{Bracket, GameId, Side};
use crate::config::{ScoringConfig, SimulationConfig};
use crate::error::{PoolError, PoolResult};
use crate::outcomes::{plan_outcomes, Outcome, SamplingMode};
use crate::probability::ProbabilityModel;
use crate::projection::Projector;
use crate::report::{build_report, PoolReport};
use crate::scoring::{score, Score, ScoreCard};

/// Outcomes handled per rayon task.
const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct Participant {
    pub name: String,
    pub picks: Bracket,
    /// Fixed points added to every score.
    pub bonus: i64,
}

impl Participant {
    pub fn new(name: impl Into<String>, picks: Bracket) -> Self {
        Participant {
            name: name.into(),
            picks,
            bonus: 0,
        }
    }

    pub fn with_bonus(mut self, bonus: i64) -> Self {
        self.bonus = bonus;
        self
    }
}

/// Participant indices ordered by score, highest first. The sort is stable,
/// so tied participants keep their list order: the earliest-listed tied
/// leader takes first place and the latest-listed tied trailer takes last.
pub fn rank(scores: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]));
    order
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Tally {
    total_mass: f64,
    evaluated: usize,
    win: Vec<f64>,
    lose: Vec<f64>,
    place: Vec<f64>,
    winning: Vec<HashMap<Outcome, f64>>,
    losing: Vec<HashMap<Outcome, f64>>,
}

impl Tally {
    fn new(participants: usize) -> Self {
        Tally {
            total_mass: 0.0,
            evaluated: 0,
            win: vec![0.0; participants],
            lose: vec![0.0; participants],
            place: vec![0.0; participants],
            winning: vec![HashMap::new(); participants],
            losing: vec![HashMap::new(); participants],
        }
    }

    fn record(&mut self, outcome: Outcome, mass: f64, order: &[usize]) {
        self.total_mass += mass;
        self.evaluated += 1;
        for (place, &i) in order.iter().enumerate() {
            self.place[i] += (place + 1) as f64 * mass;
        }
        if let (Some(&top), Some(&bottom)) = (order.first(), order.last()) {
            self.win[top] += mass;
            *self.winning[top].entry(outcome).or_insert(0.0) += mass;
            self.lose[bottom] += mass;
            *self.losing[bottom].entry(outcome).or_insert(0.0) += mass;
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        self.total_mass += other.total_mass;
        self.evaluated += other.evaluated;
        for i in 0..self.win.len() {
            self.win[i] += other.win[i];
            self.lose[i] += other.lose[i];
            self.place[i] += other.place[i];
        }
        for (mine, theirs) in self
            .winning
            .iter_mut()
            .chain(self.losing.iter_mut())
            .zip(other.winning.into_iter().chain(other.losing))
        {
            for (outcome, mass) in theirs {
                *mine.entry(outcome).or_insert(0.0) += mass;
            }
        }
        self
    }
}

/// Normalized results of one pass over the outcome space.
#[derive(Debug, Clone)]
pub struct OutcomeTally {
    /// `None` when nothing was left to simulate.
    pub mode: Option<SamplingMode>,
    pub remaining: Vec<GameId>,
    pub total_space: u128,
    pub evaluated: usize,
    /// Sum of raw outcome weights before normalization.
    pub observed_mass: f64,
    pub win: Vec<f64>,
    pub lose: Vec<f64>,
    pub average_place: Vec<f64>,
    pub winning: Vec<HashMap<Outcome, f64>>,
    pub losing: Vec<HashMap<Outcome, f64>>,
}

fn static_tally(
    results: &Bracket,
    participants: &[Participant],
    scoring: &ScoringConfig,
    apply_seed_bonus: bool,
) -> OutcomeTally {
    let n = participants.len();
    let scores: Vec<i64> = participants
        .iter()
        .map(|p| score(results, &p.picks, scoring, apply_seed_bonus).total + p.bonus)
        .collect();
    let order = rank(&scores);
    let mut tally = OutcomeTally {
        mode: None,
        remaining: Vec::new(),
        total_space: 1,
        evaluated: 0,
        observed_mass: 1.0,
        win: vec![0.0; n],
        lose: vec![0.0; n],
        average_place: vec![0.0; n],
        winning: vec![HashMap::new(); n],
        losing: vec![HashMap::new(); n],
    };
    for (place, &i) in order.iter().enumerate() {
        tally.average_place[i] = (place + 1) as f64;
    }
    if let (Some(&top), Some(&bottom)) = (order.first(), order.last()) {
        tally.win[top] = 1.0;
        tally.lose[bottom] = 1.0;
    }
    tally
}

/// Evaluate every generated outcome and normalize the accumulated masses by
/// the total observed weight.
pub fn tally_outcomes(
    results: &Bracket,
    participants: &[Participant],
    model: Option<&ProbabilityModel>,
    scoring: &ScoringConfig,
    config: &SimulationConfig,
) -> PoolResult<OutcomeTally> {
    if participants.is_empty() {
        return Err(PoolError::NoParticipants);
    }
    let remaining = results.remaining_games();
    if remaining.is_empty() {
        info!("No remaining games, scoring the final results");
        return Ok(static_tally(results, participants, scoring, config.apply_seed_bonus));
    }

    let plan = plan_outcomes(
        results,
        &remaining,
        config.max_simulations,
        config.strategy,
        config.rng_seed,
    )?;
    info!(
        "{} remaining games, {} possible outcomes, evaluating {} ({:?})",
        remaining.len(),
        plan.total_space,
        plan.outcomes.len(),
        plan.mode
    );

    let cards: Vec<ScoreCard> = participants
        .iter()
        .map(|p| ScoreCard::new(results, &p.picks, &remaining, scoring, config.apply_seed_bonus))
        .collect();
    let uniform = 1.0 / plan.outcomes.len() as f64;
    let n = participants.len();

    let tally = plan
        .outcomes
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut projector = Projector::new(results, &remaining);
            let mut tally = Tally::new(n);
            let mut scores = vec![0i64; n];
            for &outcome in chunk {
                let hypothetical = projector.project(outcome);
                let mass = model.map_or(uniform, |m| m.outcome_probability(hypothetical));
                for (i, card) in cards.iter().enumerate() {
                    scores[i] = card.total(hypothetical).total + participants[i].bonus;
                }
                tally.record(outcome, mass, &rank(&scores));
            }
            tally
        })
        .reduce(|| Tally::new(n), Tally::merge);

    let observed_mass = tally.total_mass;
    let scale = if observed_mass > 0.0 {
        1.0 / observed_mass
    } else {
        warn!("All sampled outcomes have zero probability");
        0.0
    };
    let normalize = |maps: Vec<HashMap<Outcome, f64>>| -> Vec<HashMap<Outcome, f64>> {
        maps.into_iter()
            .map(|m| m.into_iter().map(|(o, mass)| (o, mass * scale)).collect())
            .collect()
    };

    Ok(OutcomeTally {
        mode: Some(plan.mode),
        remaining,
        total_space: plan.total_space,
        evaluated: tally.evaluated,
        observed_mass,
        win: tally.win.iter().map(|m| m * scale).collect(),
        lose: tally.lose.iter().map(|m| m * scale).collect(),
        average_place: tally.place.iter().map(|m| m * scale).collect(),
        winning: normalize(tally.winning),
        losing: normalize(tally.losing),
    })
}

/// Full pool run: tally every outcome, then merge and decode scenarios.
pub fn simulate_pool(
    results: &Bracket,
    participants: &[Participant],
    model: Option<&ProbabilityModel>,
    scoring: &ScoringConfig,
    config: &SimulationConfig,
) -> PoolResult<PoolReport> {
    let tally = tally_outcomes(results, participants, model, scoring, config)?;
    Ok(build_report(results, participants, &tally, scoring, config))
}

// ---------------------------------------------------------------------------
// Conditional odds for the next games
// ---------------------------------------------------------------------------

/// Win and lose chances of every participant given one side of a game.
/// `None` when no evaluated outcome had that result.
pub fn conditional_odds(
    tally: &OutcomeTally,
    position: usize,
    side: Side,
) -> Vec<(Option<f64>, Option<f64>)> {
    let mass_given = |map: &HashMap<Outcome, f64>| -> f64 {
        map.iter()
            .filter(|(o, _)| o.side(position) == side)
            .map(|(_, m)| m)
            .sum()
    };
    let win_mass: Vec<f64> = tally.winning.iter().map(mass_given).collect();
    let lose_mass: Vec<f64> = tally.losing.iter().map(mass_given).collect();
    let win_total: f64 = win_mass.iter().sum();
    let lose_total: f64 = lose_mass.iter().sum();
    let ratio = |m: f64, total: f64| if total > 0.0 { Some(m / total) } else { None };
    win_mass
        .iter()
        .zip(&lose_mass)
        .map(|(&w, &l)| (ratio(w, win_total), ratio(l, lose_total)))
        .collect()
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub name: String,
    pub place: usize,
    pub score: Score,
    pub bonus: i64,
    pub total: i64,
}

/// Current scores against the results as they stand, best first.
pub fn standings(
    results: &Bracket,
    participants: &[Participant],
    scoring: &ScoringConfig,
    apply_seed_bonus: bool,
) -> Vec<Standing> {
    let scored: Vec<Score> = participants
        .iter()
        .map(|p| score(results, &p.picks, scoring, apply_seed_bonus))
        .collect();
    let totals: Vec<i64> = scored
        .iter()
        .zip(participants)
        .map(|(s, p)| s.total + p.bonus)
        .collect();
    rank(&totals)
        .into_iter()
        .enumerate()
        .map(|(place, i)| Standing {
            name: participants[i].name.clone(),
            place: place + 1,
            score: scored[i],
            bonus: participants[i].bonus,
            total: totals[i],
        })
        .collect()
}

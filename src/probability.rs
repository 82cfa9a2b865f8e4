//! Team advancement probabilities and outcome weighting.
//!
//! A table row holds six unconditional probabilities: reaching the round of
//! 32, 16, 8, 4, the final, and winning it all. The model resolves every
//! team in the results bracket to a dense row once, falling back to
//! `(1/2)^k` for missing entries, so lookups during simulation never warn.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::bracket::{Bracket, GameId, ROUNDS};

pub const PROB_COLUMNS: [&str; ROUNDS] = [
    "prob_r32", "prob_r16", "prob_r8", "prob_r4", "prob_r2", "prob_win",
];

/// Teams that reach each column's stage.
pub const SLOTS_PER_COLUMN: [f64; ROUNDS] = [32.0, 16.0, 8.0, 4.0, 2.0, 1.0];

const SUM_TOLERANCE: f64 = 0.01;
const DECIDED_TOLERANCE: f64 = 0.01;

/// Column holding the probability of reaching `round` (2..=7, 7 = champion).
pub fn column_for_reaching(round: usize) -> usize {
    round - 2
}

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

pub type ProbabilityRow = [Option<f64>; ROUNDS];

/// Advancement probabilities as loaded; any cell may be missing.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityTable {
    rows: HashMap<String, ProbabilityRow>,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        ProbabilityTable::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, row: ProbabilityRow) {
        self.rows.insert(name.into(), row);
    }

    pub fn insert_full(&mut self, name: impl Into<String>, row: [f64; ROUNDS]) {
        self.insert(name, row.map(Some));
    }

    pub fn row(&self, name: &str) -> Option<&ProbabilityRow> {
        self.rows.get(name)
    }

    pub fn get(&self, name: &str, column: usize) -> Option<f64> {
        self.rows.get(name).and_then(|row| row[column])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProbabilityRow)> {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// Resolved model
// ---------------------------------------------------------------------------

/// Default when data is missing: `(1/2)^k` with `k` the games still to win
/// to reach the column's stage. Stages already reached are certain, stages
/// beyond an elimination are impossible.
pub fn fallback_probability(reached: Option<usize>, alive: bool, column: usize) -> f64 {
    let target = column + 2;
    let reached = reached.unwrap_or(1);
    if target <= reached {
        1.0
    } else if !alive {
        0.0
    } else {
        0.5f64.powi((target - reached) as i32)
    }
}

#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    rows: HashMap<String, [f64; ROUNDS]>,
}

impl ProbabilityModel {
    /// Resolve every team of `results` against `table`, warning once per
    /// missing team/column.
    pub fn new(table: &ProbabilityTable, results: &Bracket) -> Self {
        let alive = results.alive_teams();
        let mut rows = HashMap::new();
        for team in results.teams() {
            let name = team.name.as_str();
            let reached = results.rounds_reached(name);
            let is_alive = alive.contains(name);
            let raw = table.row(name);
            if raw.is_none() {
                warn!("No probability data for {}, using defaults", name);
            }
            let mut row = [0.0; ROUNDS];
            for (column, slot) in row.iter_mut().enumerate() {
                *slot = match raw.and_then(|r| r[column]) {
                    Some(p) => p,
                    None => {
                        let p = fallback_probability(reached, is_alive, column);
                        if raw.is_some() {
                            warn!(
                                "Missing {} for {}, using {:.4}",
                                PROB_COLUMNS[column], name, p
                            );
                        }
                        p
                    }
                };
            }
            rows.insert(name.to_string(), row);
        }
        ProbabilityModel { rows }
    }

    /// Probability that `name` reaches the stage of `column`.
    pub fn reach(&self, name: &str, column: usize) -> f64 {
        self.rows
            .get(name)
            .map(|row| row[column])
            .unwrap_or_else(|| fallback_probability(None, true, column))
    }

    /// Joint weight of a completed hypothetical bracket: the champion's
    /// `prob_win`, the runner-up's `prob_r2`, and each earlier loser's
    /// probability of reaching the round they lost in. Round-1 losers add
    /// no factor.
    pub fn outcome_probability(&self, bracket: &Bracket) -> f64 {
        let mut probability = 1.0;
        for round in 2..=ROUNDS {
            for game in bracket.round(round) {
                if let Some(loser) = game.loser() {
                    probability *= self.reach(&loser.name, column_for_reaching(round));
                }
            }
        }
        if let Some(champion) = bracket.champion() {
            probability *= self.reach(&champion.name, column_for_reaching(ROUNDS + 1));
        }
        probability
    }

    /// Probability that `a` beats `b` in a game of `round`, from their
    /// chances of reaching the next stage.
    pub fn game_probability(&self, a: &str, b: &str, round: usize) -> f64 {
        let column = column_for_reaching(round + 1);
        let pa = self.reach(a, column);
        let pb = self.reach(b, column);
        if pa + pb > 0.0 {
            pa / (pa + pb)
        } else {
            0.5
        }
    }
}

pub fn outcome_probability(bracket: &Bracket, model: &ProbabilityModel) -> f64 {
    model.outcome_probability(bracket)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProbabilityIssue {
    OutOfRange {
        team: String,
        column: usize,
        value: f64,
    },
    ColumnSum {
        column: usize,
        expected: f64,
        actual: f64,
    },
    NonMonotonic {
        team: String,
        column: usize,
        previous: f64,
        value: f64,
    },
    DecidedWinner {
        team: String,
        game: GameId,
        value: f64,
    },
    DecidedLoser {
        team: String,
        game: GameId,
        value: f64,
    },
}

impl fmt::Display for ProbabilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbabilityIssue::OutOfRange {
                team,
                column,
                value,
            } => write!(f, "{} {} = {:.4} is outside [0, 1]", team, PROB_COLUMNS[*column], value),
            ProbabilityIssue::ColumnSum {
                column,
                expected,
                actual,
            } => write!(
                f,
                "{} sums to {:.4}, expected {}",
                PROB_COLUMNS[*column], actual, expected
            ),
            ProbabilityIssue::NonMonotonic {
                team,
                column,
                previous,
                value,
            } => write!(
                f,
                "{} {} = {:.4} exceeds {} = {:.4}",
                team,
                PROB_COLUMNS[*column],
                value,
                PROB_COLUMNS[*column - 1],
                previous
            ),
            ProbabilityIssue::DecidedWinner { team, game, value } => write!(
                f,
                "{} won {} but has {:.4} to advance",
                team, game, value
            ),
            ProbabilityIssue::DecidedLoser { team, game, value } => write!(
                f,
                "{} lost {} but has {:.4} to advance",
                team, game, value
            ),
        }
    }
}

/// Check range, column sums, monotonicity and agreement with decided games.
/// Issues are logged and returned; the table is never modified.
pub fn validate_probabilities(table: &ProbabilityTable, results: &Bracket) -> Vec<ProbabilityIssue> {
    let mut issues = Vec::new();

    let mut names: Vec<&String> = table.iter().map(|(n, _)| n).collect();
    names.sort();

    for name in &names {
        let Some(row) = table.row(name) else { continue };
        for (column, value) in row.iter().enumerate() {
            if let Some(v) = *value {
                if !(0.0..=1.0).contains(&v) {
                    issues.push(ProbabilityIssue::OutOfRange {
                        team: name.to_string(),
                        column,
                        value: v,
                    });
                }
            }
        }
        for column in 1..ROUNDS {
            if let (Some(prev), Some(v)) = (row[column - 1], row[column]) {
                if v > prev + 1e-9 {
                    issues.push(ProbabilityIssue::NonMonotonic {
                        team: name.to_string(),
                        column,
                        previous: prev,
                        value: v,
                    });
                }
            }
        }
    }

    for column in 0..ROUNDS {
        let values: Vec<f64> = table.iter().filter_map(|(_, row)| row[column]).collect();
        if values.is_empty() {
            continue;
        }
        let actual: f64 = values.iter().sum();
        let expected = SLOTS_PER_COLUMN[column];
        if (actual - expected).abs() > SUM_TOLERANCE {
            issues.push(ProbabilityIssue::ColumnSum {
                column,
                expected,
                actual,
            });
        }
    }

    let mut checked: HashSet<(String, usize)> = HashSet::new();
    for (id, game) in results.games() {
        let (Some(winner), Some(loser)) = (game.winner_of(), game.loser()) else {
            continue;
        };
        let column = column_for_reaching(id.round + 1);
        if let Some(v) = table.get(&winner.name, column) {
            if v < 1.0 - DECIDED_TOLERANCE && checked.insert((winner.name.clone(), column)) {
                issues.push(ProbabilityIssue::DecidedWinner {
                    team: winner.name.clone(),
                    game: id,
                    value: v,
                });
            }
        }
        if let Some(v) = table.get(&loser.name, column) {
            if v > DECIDED_TOLERANCE && checked.insert((loser.name.clone(), column)) {
                issues.push(ProbabilityIssue::DecidedLoser {
                    team: loser.name.clone(),
                    game: id,
                    value: v,
                });
            }
        }
    }

    for issue in &issues {
        warn!("Probability table: {}", issue);
    }
    issues
}

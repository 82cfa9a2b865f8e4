//! Scoring and simulation configuration.
//!
//! Both are plain values built once at startup and passed by reference into
//! every call that needs them.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::bracket::ROUNDS;
use crate::error::{PoolError, PoolResult};

pub const DEFAULT_SCORE_FOR_ROUND: [u32; ROUNDS + 1] = [0, 10, 20, 30, 50, 80, 130];
pub const DEFAULT_SEED_FACTOR: [u32; ROUNDS + 1] = [0, 1, 2, 3, 4, 5, 6];

/// Default Monte Carlo budget when the caller does not ask for exhaustive
/// enumeration.
pub const DEFAULT_MAX_SIMULATIONS: u64 = 100_000;

/// Per-round point values. Index 0 is unused; indices 1-6 are rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringConfig {
    pub score_for_round: [u32; ROUNDS + 1],
    pub seed_factor: [u32; ROUNDS + 1],
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            score_for_round: DEFAULT_SCORE_FOR_ROUND,
            seed_factor: DEFAULT_SEED_FACTOR,
        }
    }
}

#[derive(Deserialize)]
struct RawScoringConfig {
    #[serde(rename = "SCORE_FOR_ROUND", alias = "scoreForRound", alias = "score_for_round")]
    score_for_round: Option<Vec<u32>>,
    #[serde(rename = "SEED_FACTOR", alias = "seedFactor", alias = "seed_factor")]
    seed_factor: Option<Vec<u32>>,
}

impl ScoringConfig {
    pub fn new(score_for_round: &[u32], seed_factor: &[u32]) -> PoolResult<Self> {
        Ok(ScoringConfig {
            score_for_round: to_round_array("SCORE_FOR_ROUND", score_for_round)?,
            seed_factor: to_round_array("SEED_FACTOR", seed_factor)?,
        })
    }

    pub fn from_json(json: &str) -> PoolResult<Self> {
        let raw: RawScoringConfig = serde_json::from_str(json)?;
        let score = raw
            .score_for_round
            .ok_or_else(|| PoolError::Config("SCORE_FOR_ROUND is missing".to_string()))?;
        let factor = raw
            .seed_factor
            .ok_or_else(|| PoolError::Config("SEED_FACTOR is missing".to_string()))?;
        ScoringConfig::new(&score, &factor)
    }

    pub fn load(path: &Path) -> PoolResult<Self> {
        let json = std::fs::read_to_string(path)?;
        ScoringConfig::from_json(&json)
    }

    pub fn points(&self, round: usize) -> u32 {
        self.score_for_round[round]
    }

    pub fn factor(&self, round: usize) -> u32 {
        self.seed_factor[round]
    }
}

fn to_round_array(name: &str, values: &[u32]) -> PoolResult<[u32; ROUNDS + 1]> {
    values.try_into().map_err(|_| {
        PoolError::Config(format!(
            "{} must have {} entries (index 0 unused), got {}",
            name,
            ROUNDS + 1,
            values.len()
        ))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum SamplingStrategy {
    /// Every bit drawn independently and uniformly.
    Uniform,
    /// Champion- and next-game-stratified sampling with a uniform remainder.
    Stratified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum MergeStrategy {
    /// Merge positions round by round, earliest round first.
    #[value(name = "round")]
    RoundOrdered,
    /// Always merge the heaviest mergeable pair next.
    Greedy,
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// `None` enumerates every outcome.
    pub max_simulations: Option<u64>,
    pub rng_seed: Option<u64>,
    pub strategy: SamplingStrategy,
    pub apply_seed_bonus: bool,
    /// Scenarios reported per participant.
    pub top_scenarios: usize,
    pub merge: MergeStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            max_simulations: Some(DEFAULT_MAX_SIMULATIONS),
            rng_seed: None,
            strategy: SamplingStrategy::Uniform,
            apply_seed_bonus: true,
            top_scenarios: 5,
            merge: MergeStrategy::RoundOrdered,
        }
    }
}

impl SimulationConfig {
    pub fn exhaustive() -> Self {
        SimulationConfig {
            max_simulations: None,
            ..SimulationConfig::default()
        }
    }
}

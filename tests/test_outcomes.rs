mod common;

use std::collections::{HashMap, HashSet};

use bracket_odds::bracket::*;
use bracket_odds::config::SamplingStrategy;
use bracket_odds::error::PoolError;
use bracket_odds::outcomes::*;
use common::*;

#[test]
fn test_exhaustive_order() {
    let outcomes = exhaustive(3).unwrap();
    let strings: Vec<String> = outcomes.iter().map(|o| o.to_string_with_len(3)).collect();
    assert_eq!(
        strings,
        vec!["000", "001", "010", "011", "100", "101", "110", "111"]
    );
}

#[test]
fn test_exhaustive_empty() {
    let outcomes = exhaustive(0).unwrap();
    assert_eq!(outcomes.len(), 1);
}

#[test]
fn test_exhaustive_too_large() {
    let err = exhaustive(30).unwrap_err();
    assert!(matches!(err, PoolError::BudgetExceeded { .. }));
    assert!(matches!(exhaustive(64), Err(PoolError::TooManyRemainingGames(64))));
}

#[test]
fn test_parse_outcome() {
    let o = parse_outcome("1001").unwrap();
    assert_eq!(o.side(0), Side::Team1);
    assert_eq!(o.side(1), Side::Team2);
    assert_eq!(o.side(3), Side::Team1);
    assert_eq!(o.to_string_with_len(4), "1001");
    assert!(parse_outcome("10X").is_err());
}

#[test]
fn test_monte_carlo_deterministic() {
    let a = monte_carlo(&mut make_rng(Some(7)), 10, 200);
    let b = monte_carlo(&mut make_rng(Some(7)), 10, 200);
    let c = monte_carlo(&mut make_rng(Some(8)), 10, 200);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.iter().all(|o| o.0 < 1 << 10));
}

#[test]
fn test_monte_carlo_bits_balanced() {
    let outcomes = monte_carlo(&mut make_rng(Some(1)), 8, 20_000);
    for p in 0..8 {
        let ones = outcomes.iter().filter(|o| o.side(p) == Side::Team1).count();
        let share = ones as f64 / outcomes.len() as f64;
        assert!((share - 0.5).abs() < 0.03, "position {} share {}", p, share);
    }
}

#[test]
fn test_plan_exhaustive_within_budget() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    assert_eq!(remaining.len(), 7);
    let plan = plan_outcomes(&results, &remaining, Some(1000), SamplingStrategy::Uniform, None).unwrap();
    assert_eq!(plan.mode, SamplingMode::Exhaustive);
    assert_eq!(plan.outcomes.len(), 128);
    assert_eq!(plan.total_space, 128);

    let unbounded = plan_outcomes(&results, &remaining, None, SamplingStrategy::Uniform, None).unwrap();
    assert_eq!(unbounded.outcomes.len(), 128);
}

#[test]
fn test_plan_samples_over_budget() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    let plan = plan_outcomes(&results, &remaining, Some(50), SamplingStrategy::Uniform, Some(3)).unwrap();
    assert_eq!(plan.mode, SamplingMode::MonteCarlo);
    assert_eq!(plan.outcomes.len(), 50);

    let plan = plan_outcomes(&results, &remaining, Some(50), SamplingStrategy::Stratified, Some(3)).unwrap();
    assert_eq!(plan.mode, SamplingMode::Stratified);
    assert_eq!(plan.outcomes.len(), 50);
}

#[test]
fn test_plan_rejects_zero_budget() {
    let results = late_results(5);
    let remaining = results.remaining_games();
    for strategy in [SamplingStrategy::Uniform, SamplingStrategy::Stratified] {
        let err = plan_outcomes(&results, &remaining, Some(0), strategy, Some(1)).unwrap_err();
        assert!(matches!(err, PoolError::InvalidValue(_)));
    }
    let plan = plan_outcomes(&results, &remaining, Some(1), SamplingStrategy::Uniform, Some(1)).unwrap();
    assert_eq!(plan.outcomes.len(), 1);
}

#[test]
fn test_champion_path_forces_every_game() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    let path = champion_path(&results, &remaining, "West 2");
    // Elite eight, final four and championship.
    assert_eq!(path.len(), 3);
    assert_eq!(remaining[path[0].0].round, 4);
    assert_eq!(remaining[path[2].0], GameId::new(6, 0));
    assert!(champion_path(&results, &remaining, "East 16").is_empty());
}

fn champion_of(results: &Bracket, remaining: &[GameId], outcome: Outcome) -> String {
    let mut bracket = results.clone();
    for (p, &id) in remaining.iter().enumerate() {
        let winner = bracket.game(id).team(outcome.side(p)).cloned();
        bracket.advance(id, winner);
    }
    bracket.champion().unwrap().name.clone()
}

#[test]
fn test_stratified_covers_every_champion() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    let outcomes = stratified(&mut make_rng(Some(11)), &results, &remaining, 400);
    assert_eq!(outcomes.len(), 400);

    let champions: HashSet<String> = outcomes
        .iter()
        .map(|&o| champion_of(&results, &remaining, o))
        .collect();
    assert_eq!(champions, results.alive_teams());
}

#[test]
fn test_stratified_equal_shares() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    // 100 champion slots over 8 teams: 12 each, 4 left to uniform fill.
    let outcomes = stratified(&mut make_rng(Some(5)), &results, &remaining, 400);
    let mut per_champion: HashMap<String, usize> = HashMap::new();
    for &o in &outcomes[..96] {
        *per_champion.entry(champion_of(&results, &remaining, o)).or_default() += 1;
    }
    assert_eq!(per_champion.len(), 8);
    assert!(per_champion.values().all(|&n| n == 12));

    // 100 next-game slots over the 16 elite-eight combinations: 6 each.
    let mut per_combo: HashMap<u64, usize> = HashMap::new();
    for o in &outcomes[96..192] {
        *per_combo.entry(o.0 & 0b1111).or_default() += 1;
    }
    assert_eq!(per_combo.len(), 16);
    assert!(per_combo.values().all(|&n| n == 6));
}

#[test]
fn test_stratified_small_budget_forces_distinct_champions() {
    let results = late_results(4);
    let remaining = results.remaining_games();
    // 5 champion slots for 8 alive teams.
    let outcomes = stratified(&mut make_rng(Some(9)), &results, &remaining, 20);
    assert_eq!(outcomes.len(), 20);
    let forced: HashSet<String> = outcomes[..5]
        .iter()
        .map(|&o| champion_of(&results, &remaining, o))
        .collect();
    assert_eq!(forced.len(), 5);
}

#[test]
fn test_position_rounds() {
    let results = late_results(5);
    assert_eq!(position_rounds(&results.remaining_games()), vec![5, 5, 6]);
}

use std::collections::HashMap;

use proptest::prelude::*;

use bracket_odds::config::MergeStrategy;
use bracket_odds::merge::*;
use bracket_odds::outcomes::*;

fn masses(entries: &[(&str, f64)]) -> MassMap {
    entries
        .iter()
        .map(|(s, m)| (s.parse::<Pattern>().unwrap(), *m))
        .collect()
}

fn total(patterns: &MassMap) -> f64 {
    patterns.values().sum()
}

#[test]
fn test_single_pair() {
    let merged = merge_outcomes(
        masses(&[("101", 0.25), ("100", 0.5)]),
        &[1, 1, 2],
        MergeStrategy::RoundOrdered,
    );
    assert_eq!(merged.len(), 1);
    assert!((merged[&"10X".parse::<Pattern>().unwrap()] - 0.75).abs() < 1e-12);
}

#[test]
fn test_no_merge_across_two_differences() {
    let patterns = masses(&[("11", 0.5), ("00", 0.5)]);
    let merged = merge_outcomes(patterns.clone(), &[1, 2], MergeStrategy::RoundOrdered);
    assert_eq!(merged, patterns);
    assert!(!has_mergeable_pair(&merged));
}

#[test]
fn test_later_merge_exposes_earlier_pair() {
    // "11" and "10" only merge at the round-2 position; the result then
    // pairs with "0X" at the round-1 position on the next pass.
    let patterns = masses(&[("11", 0.1), ("10", 0.2), ("0X", 0.7)]);
    let merged = merge_outcomes(patterns, &[1, 2], MergeStrategy::RoundOrdered);
    assert_eq!(merged.len(), 1);
    assert!((merged[&"XX".parse::<Pattern>().unwrap()] - 1.0).abs() < 1e-12);
}

#[test]
fn test_greedy_prefers_heavier_pair() {
    let patterns = masses(&[("11", 0.1), ("10", 0.2), ("00", 0.05)]);
    let key = |s: &str| s.parse::<Pattern>().unwrap();

    let round = merge_outcomes(patterns.clone(), &[1, 2], MergeStrategy::RoundOrdered);
    assert_eq!(round.len(), 2);
    assert!((round[&key("X0")] - 0.25).abs() < 1e-12);
    assert!((round[&key("11")] - 0.1).abs() < 1e-12);

    let greedy = merge_outcomes(patterns, &[1, 2], MergeStrategy::Greedy);
    assert_eq!(greedy.len(), 2);
    assert!((greedy[&key("1X")] - 0.3).abs() < 1e-12);
    assert!((greedy[&key("00")] - 0.05).abs() < 1e-12);
}

#[test]
fn test_dead_positions_collapse() {
    let mut raw = HashMap::new();
    raw.insert(parse_outcome("10").unwrap(), 0.25);
    raw.insert(parse_outcome("11").unwrap(), 0.5);
    let patterns = to_patterns(&raw, 2, &[false, true]);
    assert_eq!(patterns.len(), 1);
    assert!((patterns[&"1D".parse::<Pattern>().unwrap()] - 0.75).abs() < 1e-12);
}

#[test]
fn test_top_k_order() {
    let patterns = masses(&[("10", 0.2), ("01", 0.5), ("00", 0.2), ("11", 0.1)]);
    let top: Vec<String> = top_k(&patterns, 3).into_iter().map(|(p, _)| p.to_string()).collect();
    assert_eq!(top, vec!["01", "00", "10"]);
    assert_eq!(top_k(&patterns, 10).len(), 4);
}

#[test]
fn test_empty_input() {
    let merged = merge_outcomes(MassMap::new(), &[], MergeStrategy::Greedy);
    assert!(merged.is_empty());
    assert!(top_k(&merged, 5).is_empty());
}

fn raw_outcomes() -> impl Strategy<Value = (usize, HashMap<Outcome, f64>, Vec<bool>)> {
    (1usize..=6).prop_flat_map(|len| {
        (
            Just(len),
            prop::collection::vec((0u64..(1 << len), 0.001f64..1.0), 1..40),
            prop::collection::vec(any::<bool>(), len),
        )
    })
    .prop_map(|(len, draws, dead)| {
        let mut raw = HashMap::new();
        for (bits, mass) in draws {
            *raw.entry(Outcome(bits)).or_insert(0.0) += mass;
        }
        (len, raw, dead)
    })
}

proptest! {
    #[test]
    fn prop_merge_conserves_mass((len, raw, dead) in raw_outcomes(), greedy in any::<bool>()) {
        let strategy = if greedy { MergeStrategy::Greedy } else { MergeStrategy::RoundOrdered };
        let rounds: Vec<usize> = (0..len).map(|p| 1 + p % 6).collect();
        let patterns = to_patterns(&raw, len, &dead);
        let before = total(&patterns);
        let merged = merge_outcomes(patterns, &rounds, strategy);

        prop_assert!((total(&merged) - before).abs() < 1e-9);
        prop_assert!(!has_mergeable_pair(&merged));

        // Every raw outcome is covered by exactly one merged pattern.
        for outcome in raw.keys() {
            let covering = merged.keys().filter(|p| p.matches(*outcome)).count();
            prop_assert_eq!(covering, 1);
        }
    }

    #[test]
    fn prop_merge_idempotent((len, raw, dead) in raw_outcomes()) {
        let rounds: Vec<usize> = (0..len).map(|p| 1 + p % 6).collect();
        let once = merge_outcomes(to_patterns(&raw, len, &dead), &rounds, MergeStrategy::RoundOrdered);
        let twice = merge_outcomes(once.clone(), &rounds, MergeStrategy::RoundOrdered);
        prop_assert_eq!(once, twice);
    }
}

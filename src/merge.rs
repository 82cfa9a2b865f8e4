//! Compressing sets of outcomes into wildcard patterns.
//!
//! Two patterns merge when they are identical except at one position where
//! one has `1` and the other `0`; the result has `X` there and carries the
//! summed mass. Positions nobody can score from are collapsed to `D` first.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use itertools::Itertools;

use crate::bracket::{Bracket, GameId, ROUNDS};
use crate::config::MergeStrategy;
use crate::outcomes::{Outcome, Pattern, Pick};

/// Patterns with their probability mass, in a fixed order so merging is
/// deterministic.
pub type MassMap = BTreeMap<Pattern, f64>;

/// Whether a remaining game can never affect any score: no participant has
/// a pick still alive in that game or anywhere on its path to the title.
pub fn dead_positions(results: &Bracket, remaining: &[GameId], picks: &[&Bracket]) -> Vec<bool> {
    let alive = results.alive_teams();
    remaining
        .iter()
        .map(|&id| {
            !picks
                .iter()
                .any(|bracket| has_live_pick_on_path(bracket, id, &alive))
        })
        .collect()
}

pub(crate) fn has_live_pick_on_path(
    picks: &Bracket,
    from: GameId,
    alive: &std::collections::HashSet<String>,
) -> bool {
    let mut id = Some(from);
    while let Some(current) = id {
        if picks
            .game(current)
            .winner_name()
            .is_some_and(|name| alive.contains(name))
        {
            return true;
        }
        id = current.parent().map(|(parent, _)| parent);
    }
    false
}

/// Turn raw binary outcomes into patterns, writing `D` at dead positions
/// and summing the mass of outcomes that become identical.
pub fn to_patterns(raw: &HashMap<Outcome, f64>, len: usize, dead: &[bool]) -> MassMap {
    let mut patterns = MassMap::new();
    for (&outcome, &mass) in raw {
        let mut pattern = outcome.to_pattern(len);
        for (p, &is_dead) in dead.iter().enumerate().take(len) {
            if is_dead {
                pattern.0[p] = Pick::Dead;
            }
        }
        *patterns.entry(pattern).or_insert(0.0) += mass;
    }
    patterns
}

/// True when `a` and `b` agree everywhere but `position`, where one is `1`
/// and the other `0`.
pub fn differs_only_at(a: &Pattern, b: &Pattern, position: usize) -> bool {
    a.len() == b.len()
        && !a.get(position).is_wildcard()
        && b.get(position) == a.get(position).flipped()
        && a
            .0
            .iter()
            .zip(&b.0)
            .enumerate()
            .all(|(p, (x, y))| p == position || x == y)
}

/// The position at which two patterns could merge, if any.
pub fn merge_position(a: &Pattern, b: &Pattern) -> Option<usize> {
    if a.len() != b.len() {
        return None;
    }
    let mut diffs = a.0.iter().zip(&b.0).positions(|(x, y)| x != y);
    let position = diffs.next()?;
    if diffs.next().is_some() {
        return None;
    }
    differs_only_at(a, b, position).then_some(position)
}

pub fn merge_outcomes(patterns: MassMap, rounds: &[usize], strategy: MergeStrategy) -> MassMap {
    match strategy {
        MergeStrategy::RoundOrdered => merge_round_ordered(patterns, rounds),
        MergeStrategy::Greedy => merge_greedy(patterns),
    }
}

/// Merge every `1`/`0` pair at `position`. Grouping by "pattern with
/// `position` wildcarded" puts each `1` pattern with at most one partner:
/// itself with `0` there.
fn merge_at(patterns: &mut MassMap, position: usize) -> bool {
    let pairs: Vec<(Pattern, Pattern)> = patterns
        .keys()
        .filter(|k| k.get(position) == Pick::Team1)
        .map(|k| (k.clone(), k.with(position, Pick::Team2)))
        .filter(|(_, partner)| patterns.contains_key(partner))
        .collect();

    for (a, b) in &pairs {
        debug_assert!(differs_only_at(a, b, position));
        let mass = patterns.remove(a).unwrap_or(0.0) + patterns.remove(b).unwrap_or(0.0);
        *patterns.entry(a.with(position, Pick::Either)).or_insert(0.0) += mass;
    }
    !pairs.is_empty()
}

/// Positions are swept round by round from round 1; within a round the
/// sweep repeats until nothing merges. Merges in later rounds can expose
/// new pairs in earlier ones, so whole passes repeat until stable.
fn merge_round_ordered(mut patterns: MassMap, rounds: &[usize]) -> MassMap {
    loop {
        let mut changed = false;
        for round in 1..=ROUNDS {
            let positions: Vec<usize> = rounds.iter().positions(|&r| r == round).collect();
            if positions.is_empty() {
                continue;
            }
            loop {
                let mut merged = false;
                for &p in &positions {
                    merged |= merge_at(&mut patterns, p);
                }
                if !merged {
                    break;
                }
                changed = true;
            }
        }
        if !changed {
            return patterns;
        }
    }
}

struct Candidate {
    mass: f64,
    a: Pattern,
    b: Pattern,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mass
            .total_cmp(&other.mass)
            .then_with(|| other.a.cmp(&self.a))
            .then_with(|| other.position.cmp(&self.position))
    }
}

fn push_candidates(heap: &mut BinaryHeap<Candidate>, patterns: &MassMap, pattern: &Pattern) {
    let mass = patterns.get(pattern).copied().unwrap_or(0.0);
    for (p, pick) in pattern.0.iter().enumerate() {
        if pick.is_wildcard() {
            continue;
        }
        let partner = pattern.with(p, pick.flipped());
        if let Some(partner_mass) = patterns.get(&partner) {
            let (a, b) = if *pick == Pick::Team1 {
                (pattern.clone(), partner)
            } else {
                (partner, pattern.clone())
            };
            heap.push(Candidate {
                mass: mass + partner_mass,
                a,
                b,
                position: p,
            });
        }
    }
}

/// Always merge the heaviest valid pair. Pairs go stale when either side
/// has already been merged away, so each pop is re-checked.
fn merge_greedy(mut patterns: MassMap) -> MassMap {
    let mut heap = BinaryHeap::new();
    for pattern in patterns.keys() {
        for (p, pick) in pattern.0.iter().enumerate() {
            if *pick != Pick::Team1 {
                continue;
            }
            let partner = pattern.with(p, Pick::Team2);
            if let Some(partner_mass) = patterns.get(&partner) {
                heap.push(Candidate {
                    mass: patterns[pattern] + partner_mass,
                    a: pattern.clone(),
                    b: partner,
                    position: p,
                });
            }
        }
    }

    while let Some(candidate) = heap.pop() {
        if !patterns.contains_key(&candidate.a) || !patterns.contains_key(&candidate.b) {
            continue;
        }
        let mass = patterns.remove(&candidate.a).unwrap_or(0.0)
            + patterns.remove(&candidate.b).unwrap_or(0.0);
        let merged = candidate.a.with(candidate.position, Pick::Either);
        *patterns.entry(merged.clone()).or_insert(0.0) += mass;
        push_candidates(&mut heap, &patterns, &merged);
    }
    patterns
}

/// The `k` heaviest patterns, ties broken by pattern order.
pub fn top_k(patterns: &MassMap, k: usize) -> Vec<(Pattern, f64)> {
    patterns
        .iter()
        .sorted_by(|(pa, ma), (pb, mb)| mb.total_cmp(ma).then_with(|| pa.cmp(pb)))
        .take(k)
        .map(|(p, m)| (p.clone(), *m))
        .collect()
}

/// Whether any two patterns in the set could still merge.
pub fn has_mergeable_pair(patterns: &MassMap) -> bool {
    patterns.keys().any(|pattern| {
        pattern.0.iter().enumerate().any(|(p, pick)| {
            *pick == Pick::Team1 && patterns.contains_key(&pattern.with(p, Pick::Team2))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masses(entries: &[(&str, f64)]) -> MassMap {
        entries
            .iter()
            .map(|(s, m)| (s.parse::<Pattern>().unwrap(), *m))
            .collect()
    }

    #[test]
    fn test_merge_position() {
        let a: Pattern = "101".parse().unwrap();
        let b: Pattern = "100".parse().unwrap();
        let c: Pattern = "010".parse().unwrap();
        let x: Pattern = "10X".parse().unwrap();
        assert_eq!(merge_position(&a, &b), Some(2));
        assert_eq!(merge_position(&a, &c), None);
        assert_eq!(merge_position(&a, &x), None);
    }

    #[test]
    fn test_merge_full_square() {
        let patterns = masses(&[("11", 0.1), ("10", 0.2), ("01", 0.3), ("00", 0.4)]);
        let merged = merge_outcomes(patterns, &[1, 1], MergeStrategy::RoundOrdered);
        assert_eq!(merged.len(), 1);
        let (pattern, mass) = merged.iter().next().unwrap();
        assert_eq!(pattern.to_string(), "XX");
        assert!((mass - 1.0).abs() < 1e-12);
    }
}

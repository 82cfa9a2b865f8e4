//! Completing a results bracket from an outcome string.

use crate::bracket::{Bracket, GameId};
use crate::outcomes::{Outcome, Pattern};

/// Deep copy of `results` with every remaining game decided by `outcome`
/// and each winner pushed into its parent slot.
pub fn project(results: &Bracket, remaining: &[GameId], outcome: Outcome) -> Bracket {
    let mut hypothetical = results.clone();
    apply_outcome(&mut hypothetical, remaining, outcome);
    hypothetical
}

/// Positions are processed in list order, so a round-1 winner is already in
/// place when its round-2 game is read. Games missing a team are left
/// undecided.
fn apply_outcome(bracket: &mut Bracket, remaining: &[GameId], outcome: Outcome) {
    for (position, &id) in remaining.iter().enumerate() {
        let game = bracket.game(id);
        if !game.is_playable() {
            continue;
        }
        let winner = game.team(outcome.side(position)).cloned();
        bracket.advance(id, winner);
    }
}

/// Like [`project`] for a pattern: `X`/`D` positions stay undecided and
/// leave their parent slot empty, so later games may only know one team.
pub fn project_pattern(results: &Bracket, remaining: &[GameId], pattern: &Pattern) -> Bracket {
    let mut bracket = results.clone();
    for (position, &id) in remaining.iter().enumerate() {
        let winner = match pattern.get(position).side() {
            Some(side) => bracket.game(id).team(side).cloned(),
            None => None,
        };
        bracket.advance(id, winner);
    }
    bracket
}

/// Reusable scratch bracket for projecting many outcomes off one base.
///
/// Only the remaining games, their parents and the overall winner differ
/// between projections, so resetting touches just those.
pub struct Projector<'a> {
    base: &'a Bracket,
    remaining: &'a [GameId],
    scratch: Bracket,
}

impl<'a> Projector<'a> {
    pub fn new(base: &'a Bracket, remaining: &'a [GameId]) -> Self {
        Projector {
            base,
            remaining,
            scratch: base.clone(),
        }
    }

    pub fn project(&mut self, outcome: Outcome) -> &Bracket {
        for &id in self.remaining {
            *self.scratch.game_mut(id) = self.base.game(id).clone();
            if let Some((parent, _)) = id.parent() {
                *self.scratch.game_mut(parent) = self.base.game(parent).clone();
            }
        }
        self.scratch.winner = self.base.winner.clone();
        apply_outcome(&mut self.scratch, self.remaining, outcome);
        &self.scratch
    }
}

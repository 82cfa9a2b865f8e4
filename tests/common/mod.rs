#![allow(dead_code)]

use bracket_odds::bracket::*;
use bracket_odds::probability::ProbabilityTable;
use bracket_odds::simulate::Participant;

/// 64 teams named "<Region> <seed>".
pub fn field() -> Vec<Team> {
    REGION_ORDER
        .iter()
        .flat_map(|region| (1..=16).map(move |seed| Team::new(format!("{} {}", region, seed), seed, *region)))
        .collect()
}

pub fn favourite(_: GameId, game: &Game) -> Side {
    let seed = |side| game.team(side).map_or(u8::MAX, |t| t.seed);
    if seed(Side::Team1) <= seed(Side::Team2) {
        Side::Team1
    } else {
        Side::Team2
    }
}

pub fn underdog(id: GameId, game: &Game) -> Side {
    favourite(id, game).other()
}

/// Decide every playable game up to and including `last_round`.
pub fn play_through<F>(bracket: &mut Bracket, last_round: usize, mut pick: F)
where
    F: FnMut(GameId, &Game) -> Side,
{
    for round in 1..=last_round {
        for index in 0..GAMES_PER_ROUND[round] {
            let id = GameId::new(round, index);
            if bracket.game(id).is_playable() {
                let side = pick(id, bracket.game(id));
                bracket.record_result(id, side).unwrap();
            }
        }
    }
}

pub fn fresh_results() -> Bracket {
    Bracket::seeded(&field())
}

pub fn chalk_bracket() -> Bracket {
    let mut bracket = fresh_results();
    bracket.complete_with(favourite);
    bracket
}

/// Field where East 1 is "Alpha" and South 8 is "Beta".
pub fn alpha_beta_field() -> Vec<Team> {
    field()
        .into_iter()
        .map(|mut t| {
            if t.region == "East" && t.seed == 1 {
                t.name = "Alpha".to_string();
            } else if t.region == "South" && t.seed == 8 {
                t.name = "Beta".to_string();
            }
            t
        })
        .collect()
}

fn alpha_beta_pick(_: GameId, game: &Game) -> Side {
    for side in [Side::Team1, Side::Team2] {
        if game
            .team(side)
            .is_some_and(|t| t.name == "Alpha" || t.name == "Beta")
        {
            return side;
        }
    }
    favourite(GameId::new(1, 0), game)
}

/// Results with only the championship left: (1) Alpha vs (8) Beta.
pub fn alpha_beta_results() -> Bracket {
    let mut results = Bracket::seeded(&alpha_beta_field());
    play_through(&mut results, 5, alpha_beta_pick);
    results
}

/// "X" picks Alpha and "Y" picks Beta; both have every earlier game right.
pub fn alpha_beta_participants(results: &Bracket) -> Vec<Participant> {
    let pick = |champion: Side| {
        let mut picks = results.clone();
        picks.record_result(GameId::new(6, 0), champion).unwrap();
        picks
    };
    vec![
        Participant::new("X", pick(Side::Team1)),
        Participant::new("Y", pick(Side::Team2)),
    ]
}

pub fn alpha_beta_table(alpha_win: f64) -> ProbabilityTable {
    let mut table = ProbabilityTable::new();
    table.insert_full("Alpha", [1.0, 1.0, 1.0, 1.0, 1.0, alpha_win]);
    table.insert_full("Beta", [1.0, 1.0, 1.0, 1.0, 1.0, 1.0 - alpha_win]);
    table
}

/// Chalk results with every round before `first_open_round` played.
pub fn late_results(first_open_round: usize) -> Bracket {
    let mut results = fresh_results();
    play_through(&mut results, first_open_round - 1, favourite);
    results
}

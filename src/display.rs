use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::optimal::OptimalBracket;
use crate::probability::ProbabilityIssue;
use crate::report::{DecodedGame, GameResult, NextGameOdds, ParticipantReport, PoolReport, Scenario};
use crate::simulate::Standing;

pub fn probability_bar(probability: f64, width: usize) -> String {
    let p = probability.clamp(0.0, 1.0);
    let filled = ((p * width as f64) as usize).min(width);
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let pct = format!("{:.1}%", p * 100.0);

    if p >= 0.5 {
        format!("{} {}", bar.green(), pct)
    } else if p >= 0.2 {
        format!("{} {}", bar.yellow(), pct)
    } else {
        format!("{} {}", bar.red(), pct)
    }
}

fn percent(p: Option<f64>) -> String {
    match p {
        Some(p) => format!("{:.1}%", p * 100.0),
        None => "-".dimmed().to_string(),
    }
}

pub fn pool_table(report: &PoolReport) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Participant"),
        Cell::new("Score").set_alignment(CellAlignment::Right),
        Cell::new("Win"),
        Cell::new("Lose").set_alignment(CellAlignment::Right),
        Cell::new("Avg Place").set_alignment(CellAlignment::Right),
    ]);

    let mut rows: Vec<_> = report.participants.iter().collect();
    rows.sort_by(|a, b| b.win_probability.total_cmp(&a.win_probability));
    for p in rows {
        table.add_row(vec![
            Cell::new(p.name.bold().to_string()),
            Cell::new(p.current_score).set_alignment(CellAlignment::Right),
            Cell::new(probability_bar(p.win_probability, 20)),
            Cell::new(percent(Some(p.lose_probability))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", p.average_place)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn game_line(game: &DecodedGame) -> String {
    let name = |t: &Option<crate::bracket::Team>| match t {
        Some(team) => team.to_string(),
        None => "?".to_string(),
    };
    let matchup = format!("{} vs {}", name(&game.team1), name(&game.team2));
    let result = match &game.result {
        GameResult::Winner(team) => team.to_string().green().to_string(),
        GameResult::Pending(side) => format!("{:?}", side).yellow().to_string(),
        GameResult::Either => "either".dimmed().to_string(),
        GameResult::Dead => "dead".dimmed().to_string(),
    };
    format!("{:>6}  {:<40} {}", game.game.to_string(), matchup, result)
}

pub fn scenario_block(scenario: &Scenario) -> String {
    let mut lines = vec![format!(
        "  {} {}",
        scenario.pattern.to_string().cyan(),
        format!("{:.2}%", scenario.probability * 100.0).bold()
    )];
    lines.extend(
        scenario
            .games
            .iter()
            .filter(|g| !matches!(g.result, GameResult::Dead | GameResult::Either))
            .map(|g| format!("    {}", game_line(g))),
    );
    lines.join("\n")
}

/// Winning scenarios followed by losing ones; empty when there are neither.
pub fn scenario_sections(participant: &ParticipantReport) -> String {
    let mut sections = Vec::new();
    for (verb, scenarios) in [
        ("wins", &participant.winning_scenarios),
        ("finishes last", &participant.losing_scenarios),
    ] {
        if scenarios.is_empty() {
            continue;
        }
        let mut lines = vec![format!("  {} {} when", participant.name.bold(), verb)];
        lines.extend(scenarios.iter().map(scenario_block));
        sections.push(lines.join("\n"));
    }
    sections.join("\n\n")
}

pub fn next_game_table(odds: &NextGameOdds) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Participant"),
        Cell::new(format!("Win if {}", odds.team1.name)).set_alignment(CellAlignment::Right),
        Cell::new(format!("Win if {}", odds.team2.name)).set_alignment(CellAlignment::Right),
        Cell::new(format!("Lose if {}", odds.team1.name)).set_alignment(CellAlignment::Right),
        Cell::new(format!("Lose if {}", odds.team2.name)).set_alignment(CellAlignment::Right),
    ]);

    for (a, b) in odds.if_team1_wins.iter().zip(&odds.if_team2_wins) {
        table.add_row(vec![
            Cell::new(a.participant.bold().to_string()),
            Cell::new(percent(a.win)).set_alignment(CellAlignment::Right),
            Cell::new(percent(b.win)).set_alignment(CellAlignment::Right),
            Cell::new(percent(a.lose)).set_alignment(CellAlignment::Right),
            Cell::new(percent(b.lose)).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "  {} {} vs {}\n{}",
        odds.game.to_string().bold(),
        odds.team1,
        odds.team2,
        table
    )
}

pub fn standings_table(standings: &[Standing]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("Participant"),
        Cell::new("Points").set_alignment(CellAlignment::Right),
        Cell::new("Correct").set_alignment(CellAlignment::Right),
        Cell::new("Seed Bonus").set_alignment(CellAlignment::Right),
        Cell::new("Bonus").set_alignment(CellAlignment::Right),
        Cell::new("Total").set_alignment(CellAlignment::Right),
    ]);

    for s in standings {
        table.add_row(vec![
            Cell::new(s.place).set_alignment(CellAlignment::Right),
            Cell::new(s.name.bold().to_string()),
            Cell::new(s.score.total).set_alignment(CellAlignment::Right),
            Cell::new(s.score.correct_picks).set_alignment(CellAlignment::Right),
            Cell::new(s.score.seed_bonus).set_alignment(CellAlignment::Right),
            Cell::new(s.bonus).set_alignment(CellAlignment::Right),
            Cell::new(s.total.to_string().green().bold().to_string())
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn optimal_table(brackets: &[OptimalBracket]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Participant"),
        Cell::new("Max Score").set_alignment(CellAlignment::Right),
        Cell::new("Probability").set_alignment(CellAlignment::Right),
        Cell::new("Tied").set_alignment(CellAlignment::Right),
        Cell::new("Outcome"),
    ]);

    for b in brackets {
        table.add_row(vec![
            Cell::new(b.participant.bold().to_string()),
            Cell::new(b.max_score).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}%", b.probability * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(b.tied_outcomes).set_alignment(CellAlignment::Right),
            Cell::new(b.pattern.to_string()),
        ]);
    }

    table.to_string()
}

pub fn issue_line(issue: &ProbabilityIssue) -> String {
    format!("  {} {}", "!".yellow().bold(), issue)
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}

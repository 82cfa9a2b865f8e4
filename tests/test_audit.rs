//! End-to-end audit: files on disk through loading, simulation, optimal
//! brackets, rendering and the command line.

mod common;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use serde_json::Value;

use bracket_odds::cli::run_with_args;
use bracket_odds::config::{ScoringConfig, SimulationConfig};
use bracket_odds::display::*;
use bracket_odds::io::*;
use bracket_odds::optimal::optimal_bracket;
use bracket_odds::probability::{validate_probabilities, ProbabilityModel};
use bracket_odds::simulate::{simulate_pool, standings};
use common::*;

/// Results, two participant brackets and a probability table in `dir`.
fn write_pool(dir: &Path) {
    let results = alpha_beta_results();
    save_bracket(&dir.join("results.json"), &results).unwrap();
    let brackets = dir.join("brackets");
    fs::create_dir(&brackets).unwrap();
    for p in alpha_beta_participants(&results) {
        save_bracket(&brackets.join(format!("{}-bracket.json", p.name)), &p.picks).unwrap();
    }
    fs::write(
        dir.join("teams.csv"),
        "Team,Seed,Region,prob_r32,prob_r16,prob_r8,prob_r4,prob_r2,prob_win\n\
         Alpha,1,East,1,1,1,1,1,0.7\n\
         Beta,8,South,1,1,1,1,1,0.3\n",
    )
    .unwrap();
    fs::write(dir.join("bonus.json"), r#"{"Y": 3}"#).unwrap();
}

#[test]
fn audit_pipeline_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write_pool(dir.path());

    let table = load_team_table(&dir.path().join("teams.csv")).unwrap();
    let directory = table.directory();
    let results = load_bracket(&dir.path().join("results.json"), &directory).unwrap();
    let bonus = load_bonus(&dir.path().join("bonus.json")).unwrap();
    let participants = load_participants(&dir.path().join("brackets"), None, &directory, &bonus).unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[1].bonus, 3);

    // Only two rows: the column sums are off, which is reported but harmless.
    let issues = validate_probabilities(&table.probabilities, &results);
    assert!(!issues.is_empty());

    let model = ProbabilityModel::new(&table.probabilities, &results);
    let scoring = ScoringConfig::default();
    let report = simulate_pool(&results, &participants, Some(&model), &scoring, &SimulationConfig::exhaustive())
        .unwrap();
    assert_relative_eq!(report.participants[0].win_probability, 0.7, epsilon = 1e-9);
    assert_relative_eq!(report.participants[1].win_probability, 0.3, epsilon = 1e-9);
    assert_eq!(
        report.participants[1].current_score,
        report.participants[0].current_score + 3
    );

    let json: Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["participants"][0]["name"], "X");
    assert_eq!(json["participants"][0]["winning_scenarios"][0]["pattern"], "1");
    assert_eq!(json["next_games"][0]["team1"]["name"], "Alpha");

    let best = optimal_bracket(&results, &participants[1], Some(&model), &scoring).unwrap();
    assert_eq!(best.pattern.to_string(), "0");

    let rendered = pool_table(&report);
    assert!(rendered.contains("X") && rendered.contains("Y"));
    assert!(next_game_table(&report.next_games[0]).contains("Win if Alpha"));
    assert!(scenario_block(&report.participants[0].winning_scenarios[0]).contains("Alpha"));
    assert!(optimal_table(&[best]).contains("Y"));

    let sections = scenario_sections(&report.participants[0]);
    let wins_at = sections.find("wins when").unwrap();
    let last_at = sections.find("finishes last when").unwrap();
    assert!(wins_at < last_at);
    assert!(sections[last_at..].contains("Beta"));
    assert!(standings_table(&standings(&results, &participants, &scoring, true)).contains("Y"));
}

#[test]
fn audit_probability_bar() {
    let full = probability_bar(1.0, 10);
    assert!(full.contains("100.0%"));
    assert!(probability_bar(1.7, 10).contains("100.0%"));
    assert!(probability_bar(0.0, 10).contains("0.0%"));
}

#[test]
fn audit_cli_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_pool(dir.path());
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    let report_path = path("report.json");
    run_with_args(
        [
            "bracket-odds",
            "simulate",
            "-r",
            &path("results.json"),
            "-b",
            &path("brackets"),
            "-t",
            &path("teams.csv"),
            "--exhaustive",
            "-o",
            &report_path,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    );
    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["remaining_games"], 1);
    let win = report["participants"][0]["win_probability"].as_f64().unwrap();
    assert!((win - 0.7).abs() < 1e-9);

    let optimal_path = path("optimal.json");
    run_with_args(
        [
            "bracket-odds",
            "optimal",
            "-r",
            &path("results.json"),
            "-b",
            &path("brackets"),
            "-o",
            &optimal_path,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    );
    let optimal: HashMap<String, Value> =
        serde_json::from_str(&fs::read_to_string(&optimal_path).unwrap()).unwrap();
    assert_eq!(optimal["X"]["pattern"], "1");
    assert_eq!(optimal["Y"]["pattern"], "0");
}

use std::io::Write;

use bracket_odds::config::*;
use bracket_odds::error::PoolError;

#[test]
fn test_default_config() {
    let config = ScoringConfig::default();
    assert_eq!(config.points(1), 10);
    assert_eq!(config.points(6), 130);
    assert_eq!(config.factor(6), 6);
}

#[test]
fn test_from_json() {
    let json = r#"{"SCORE_FOR_ROUND": [0, 1, 2, 3, 4, 5, 6], "SEED_FACTOR": [0, 0, 0, 0, 0, 0, 1]}"#;
    let config = ScoringConfig::from_json(json).unwrap();
    assert_eq!(config.points(3), 3);
    assert_eq!(config.factor(5), 0);
    assert_eq!(config.factor(6), 1);
}

#[test]
fn test_from_json_aliases() {
    let json = r#"{"scoreForRound": [0, 10, 20, 30, 50, 80, 130], "seedFactor": [0, 1, 2, 3, 4, 5, 6]}"#;
    assert_eq!(ScoringConfig::from_json(json).unwrap(), ScoringConfig::default());
}

#[test]
fn test_wrong_length_rejected() {
    let json = r#"{"SCORE_FOR_ROUND": [10, 20, 30, 50, 80, 130], "SEED_FACTOR": [0, 1, 2, 3, 4, 5, 6]}"#;
    let err = ScoringConfig::from_json(json).unwrap_err();
    assert!(matches!(err, PoolError::Config(_)));
    assert!(err.to_string().contains("SCORE_FOR_ROUND"));
}

#[test]
fn test_missing_field_rejected() {
    let err = ScoringConfig::from_json(r#"{"SCORE_FOR_ROUND": [0, 1, 2, 3, 4, 5, 6]}"#).unwrap_err();
    assert!(err.to_string().contains("SEED_FACTOR"));
    assert!(matches!(
        ScoringConfig::from_json("not json"),
        Err(PoolError::Json(_))
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"SCORE_FOR_ROUND": [0, 1, 1, 1, 1, 1, 1], "SEED_FACTOR": [0, 1, 1, 1, 1, 1, 1]}}"#
    )
    .unwrap();
    let config = ScoringConfig::load(file.path()).unwrap();
    assert_eq!(config.points(6), 1);

    let missing = ScoringConfig::load(std::path::Path::new("/nonexistent/scoring.json"));
    assert!(matches!(missing, Err(PoolError::Io(_))));
}

#[test]
fn test_simulation_defaults() {
    let config = SimulationConfig::default();
    assert_eq!(config.max_simulations, Some(DEFAULT_MAX_SIMULATIONS));
    assert!(config.apply_seed_bonus);
    assert_eq!(config.merge, MergeStrategy::RoundOrdered);
    assert_eq!(SimulationConfig::exhaustive().max_simulations, None);
}

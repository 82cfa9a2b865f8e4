//! File adapters: bracket JSON, team tables, participant lists and bonus
//! maps. Everything is normalized here so the rest of the crate only sees
//! canonical [`Team`] records.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bracket::{round_index_of, Bracket, Game, Team, TeamRef, GAMES_PER_ROUND, ROUNDS, ROUND_KEYS};
use crate::error::{PoolError, PoolResult};
use crate::probability::{ProbabilityRow, ProbabilityTable, PROB_COLUMNS};
use crate::simulate::Participant;

// ---------------------------------------------------------------------------
// Team directory
// ---------------------------------------------------------------------------

/// Known seed and region for every team name, used to complete teams that
/// appear in a bracket as a bare name.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    teams: HashMap<String, Team>,
}

impl TeamDirectory {
    pub fn new() -> Self {
        TeamDirectory::default()
    }

    pub fn from_teams(teams: &[Team]) -> Self {
        TeamDirectory {
            teams: teams.iter().map(|t| (t.name.clone(), t.clone())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Team> {
        self.teams.get(name)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTeam {
    Name(String),
    /// Seed and region stay loose so a quoted seed never costs the name.
    Record {
        name: String,
        #[serde(default)]
        seed: Value,
        #[serde(default)]
        region: Value,
    },
    /// `{}` and other placeholders some exports use for an empty slot.
    Blank(Value),
}

impl RawTeam {
    fn name(&self) -> &str {
        match self {
            RawTeam::Name(name) => name,
            RawTeam::Record { name, .. } => name,
            RawTeam::Blank(_) => "",
        }
    }
}

fn seed_value(value: &Value) -> u8 {
    match value {
        Value::Number(n) => n.as_u64().and_then(|s| u8::try_from(s).ok()).unwrap_or(0),
        Value::String(s) => parse_seed(s),
        Value::Null => 0,
        other => {
            warn!("Ignoring seed {}", other);
            0
        }
    }
}

fn region_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => {
            warn!("Ignoring region {}", other);
            String::new()
        }
    }
}

fn named(raw: &Option<RawTeam>) -> Option<&RawTeam> {
    raw.as_ref().filter(|t| !t.name().trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
struct RawGame {
    #[serde(default)]
    team1: Option<RawTeam>,
    #[serde(default)]
    team2: Option<RawTeam>,
    #[serde(default)]
    winner: Option<RawTeam>,
}

/// Interns one canonical `Arc<Team>` per name: the directory's record
/// first, then any record for that name found in the bracket itself.
struct Normalizer<'a> {
    directory: &'a TeamDirectory,
    records: HashMap<String, Team>,
    interned: HashMap<String, TeamRef>,
}

impl<'a> Normalizer<'a> {
    fn new(directory: &'a TeamDirectory) -> Self {
        Normalizer {
            directory,
            records: HashMap::new(),
            interned: HashMap::new(),
        }
    }

    fn observe(&mut self, raw: &RawTeam) {
        if let RawTeam::Record { name, seed, region } = raw {
            let entry = self
                .records
                .entry(name.clone())
                .or_insert_with(|| Team::new(name.clone(), 0, ""));
            if entry.seed == 0 {
                entry.seed = seed_value(seed);
            }
            if entry.region.is_empty() {
                entry.region = region_value(region);
            }
        }
    }

    fn resolve(&mut self, raw: &RawTeam) -> TeamRef {
        let name = raw.name();
        if let Some(team) = self.interned.get(name) {
            return team.clone();
        }
        let recorded = self.records.get(name);
        let known = self.directory.get(name);
        let team = Team {
            name: name.to_string(),
            seed: known
                .map(|t| t.seed)
                .filter(|&s| s > 0)
                .or_else(|| recorded.map(|t| t.seed))
                .unwrap_or(0),
            region: known
                .map(|t| t.region.clone())
                .filter(|r| !r.is_empty())
                .or_else(|| recorded.map(|t| t.region.clone()))
                .unwrap_or_default(),
        };
        let team = Arc::new(team);
        self.interned.insert(name.to_string(), team.clone());
        team
    }
}

// ---------------------------------------------------------------------------
// Brackets
// ---------------------------------------------------------------------------

pub fn parse_bracket(json: &str, directory: &TeamDirectory) -> PoolResult<Bracket> {
    let raw: BTreeMap<String, Value> = serde_json::from_str(json)?;
    let mut rounds: Vec<Vec<Option<RawGame>>> = vec![Vec::new(); ROUNDS];
    let mut winner: Option<RawTeam> = None;
    for (key, value) in raw {
        if key == "winner" {
            winner = serde_json::from_value(value)?;
        } else if let Ok(round) = round_index_of(&key) {
            rounds[round - 1] = serde_json::from_value(value)?;
        } else {
            debug!("Skipping bracket key {}", key);
        }
    }

    let mut normalizer = Normalizer::new(directory);
    for game in rounds.iter().flatten().flatten() {
        for team in [&game.team1, &game.team2, &game.winner].into_iter().filter_map(named) {
            normalizer.observe(team);
        }
    }
    if let Some(team) = named(&winner) {
        normalizer.observe(team);
    }

    let games = rounds
        .into_iter()
        .enumerate()
        .map(|(r, raw_games)| {
            if raw_games.is_empty() {
                return vec![Game::default(); GAMES_PER_ROUND[r + 1]];
            }
            raw_games
                .into_iter()
                .map(|raw| match raw {
                    Some(g) => Game {
                        team1: named(&g.team1).map(|t| normalizer.resolve(t)),
                        team2: named(&g.team2).map(|t| normalizer.resolve(t)),
                        winner: named(&g.winner).map(|t| normalizer.resolve(t)),
                    },
                    None => Game::default(),
                })
                .collect()
        })
        .collect();
    let winner = named(&winner).map(|t| normalizer.resolve(t));

    let mut bracket = Bracket::from_rounds(games, winner)?;
    if bracket.winner.is_none() {
        bracket.winner = bracket.champion().cloned();
    }
    Ok(bracket)
}

pub fn load_bracket(path: &Path, directory: &TeamDirectory) -> PoolResult<Bracket> {
    let json = fs::read_to_string(path)?;
    parse_bracket(&json, directory)
}

#[derive(Serialize)]
struct SavedGame<'a> {
    team1: Option<&'a Team>,
    team2: Option<&'a Team>,
    winner: Option<&'a Team>,
}

/// Canonical record form of a bracket.
pub fn bracket_to_json(bracket: &Bracket) -> PoolResult<String> {
    let mut map = serde_json::Map::new();
    for (r, games) in bracket.rounds().iter().enumerate() {
        let saved: Vec<SavedGame> = games
            .iter()
            .map(|g| SavedGame {
                team1: g.team1.as_deref(),
                team2: g.team2.as_deref(),
                winner: g.winner.as_deref(),
            })
            .collect();
        map.insert(ROUND_KEYS[r].to_string(), serde_json::to_value(saved)?);
    }
    map.insert(
        "winner".to_string(),
        serde_json::to_value(bracket.winner.as_deref())?,
    );
    Ok(serde_json::to_string_pretty(&Value::Object(map))?)
}

pub fn save_bracket(path: &Path, bracket: &Bracket) -> PoolResult<()> {
    fs::write(path, bracket_to_json(bracket)?)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Team tables
// ---------------------------------------------------------------------------

/// Field of teams plus whatever advancement probabilities the file had.
#[derive(Debug, Clone, Default)]
pub struct TeamTable {
    pub teams: Vec<Team>,
    pub probabilities: ProbabilityTable,
}

impl TeamTable {
    pub fn directory(&self) -> TeamDirectory {
        TeamDirectory::from_teams(&self.teams)
    }
}

#[derive(Deserialize)]
struct TeamRecord {
    #[serde(alias = "Team")]
    name: String,
    #[serde(default, alias = "Seed")]
    seed: u8,
    #[serde(default, alias = "Region")]
    region: String,
    #[serde(default)]
    prob_r32: Option<f64>,
    #[serde(default)]
    prob_r16: Option<f64>,
    #[serde(default)]
    prob_r8: Option<f64>,
    #[serde(default)]
    prob_r4: Option<f64>,
    #[serde(default)]
    prob_r2: Option<f64>,
    #[serde(default)]
    prob_win: Option<f64>,
}

pub fn parse_team_table_json(json: &str) -> PoolResult<TeamTable> {
    let records: Vec<TeamRecord> = serde_json::from_str(json)?;
    let mut table = TeamTable::default();
    for r in records {
        let row: ProbabilityRow = [r.prob_r32, r.prob_r16, r.prob_r8, r.prob_r4, r.prob_r2, r.prob_win];
        if row.iter().any(Option::is_some) {
            table.probabilities.insert(r.name.clone(), row);
        }
        table.teams.push(Team::new(r.name, r.seed, r.region));
    }
    Ok(table)
}

/// Seeds like `16a` from play-in listings keep their digits only.
fn parse_seed(field: &str) -> u8 {
    field
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

pub fn parse_team_table_csv<R: std::io::Read>(reader: R) -> PoolResult<TeamTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h.trim()));
    let name_col = column(&["Team", "name"])
        .ok_or_else(|| PoolError::InvalidValue("team table has no Team/name column".to_string()))?;
    let seed_col = column(&["Seed", "seed"]);
    let region_col = column(&["Region", "region"]);
    let prob_cols: Vec<Option<usize>> = PROB_COLUMNS.iter().map(|c| column(&[*c])).collect();

    let mut table = TeamTable::default();
    for result in rdr.records() {
        let record = result?;
        let name = record.get(name_col).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).map(str::trim).unwrap_or("");
        let mut row: ProbabilityRow = [None; ROUNDS];
        for (slot, &col) in row.iter_mut().zip(&prob_cols) {
            let raw = field(col);
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(p) => *slot = Some(p),
                Err(_) => warn!("Unparseable probability '{}' for {}", raw, name),
            }
        }
        if row.iter().any(Option::is_some) {
            table.probabilities.insert(name.clone(), row);
        }
        table
            .teams
            .push(Team::new(name, parse_seed(field(seed_col)), field(region_col)));
    }
    Ok(table)
}

/// JSON or CSV by extension.
pub fn load_team_table(path: &Path) -> PoolResult<TeamTable> {
    let is_csv = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let table = if is_csv {
        parse_team_table_csv(fs::File::open(path)?)?
    } else {
        parse_team_table_json(&fs::read_to_string(path)?)?
    };
    info!(
        "Loaded {} teams ({} with probabilities) from {}",
        table.teams.len(),
        table.probabilities.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

pub fn load_participant_names(path: &Path) -> PoolResult<Vec<String>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Fixed bonus points per participant name.
pub fn load_bonus(path: &Path) -> PoolResult<HashMap<String, i64>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn is_results_file(name: &str) -> bool {
    name.to_lowercase().contains("results")
}

fn json_files(dir: &Path) -> PoolResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Bracket file for `name`: exact names first, then any JSON file whose
/// name contains the participant's (results files excluded).
pub fn find_participant_file(dir: &Path, name: &str) -> PoolResult<Option<PathBuf>> {
    let lower = name.to_lowercase();
    let candidates = [
        format!("{}.json", name),
        format!("{}-bracket.json", name),
        format!("{}.json", lower),
        format!("{}-bracket.json", lower),
    ];
    for candidate in &candidates {
        let path = dir.join(candidate);
        if path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(json_files(dir)?.into_iter().find(|path| {
        let file = file_name(path).to_lowercase();
        file.contains(&lower) && !is_results_file(&file)
    }))
}

/// Every non-results JSON file, named after its stem up to `-bracket`.
pub fn discover_participants(dir: &Path) -> PoolResult<Vec<(String, PathBuf)>> {
    Ok(json_files(dir)?
        .into_iter()
        .filter(|path| !is_results_file(&file_name(path)))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            let name = stem.split("-bracket").next().unwrap_or(&stem).to_string();
            Some((name, path))
        })
        .collect())
}

/// Load participant brackets from `dir`. Participants without a file are
/// skipped with a warning.
pub fn load_participants(
    dir: &Path,
    names: Option<&[String]>,
    directory: &TeamDirectory,
    bonus: &HashMap<String, i64>,
) -> PoolResult<Vec<Participant>> {
    let located: Vec<(String, PathBuf)> = match names {
        Some(names) => {
            let mut located = Vec::new();
            for name in names {
                match find_participant_file(dir, name)? {
                    Some(path) => located.push((name.clone(), path)),
                    None => warn!("No bracket found for {}, skipping", name),
                }
            }
            located
        }
        None => discover_participants(dir)?,
    };

    let mut participants = Vec::with_capacity(located.len());
    for (name, path) in located {
        debug!("Loading {} from {}", name, path.display());
        let picks = load_bracket(&path, directory)?;
        let points = bonus.get(&name).copied().unwrap_or(0);
        participants.push(Participant::new(name, picks).with_bonus(points));
    }
    info!("Loaded {} participants", participants.len());
    Ok(participants)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> PoolResult<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_play_in() {
        assert_eq!(parse_seed("16a"), 16);
        assert_eq!(parse_seed("11"), 11);
        assert_eq!(parse_seed(""), 0);
    }

    #[test]
    fn test_short_round_rejected() {
        let json = r#"{"round1": [{"team1": "Duke", "team2": "Norfolk", "winner": "Duke"}]}"#;
        let err = parse_bracket(json, &TeamDirectory::new()).unwrap_err();
        assert!(matches!(err, PoolError::BracketShape { round: 1, .. }));
    }

    #[test]
    fn test_unknown_keys_skipped() {
        let json = r#"{"round9": [], "roundNames": ["First", "Second"], "year": 2024}"#;
        let parsed = parse_bracket(json, &TeamDirectory::new()).unwrap();
        assert_eq!(parsed, Bracket::empty());
    }

    #[test]
    fn test_loose_seed_and_region() {
        assert_eq!(seed_value(&serde_json::json!(3)), 3);
        assert_eq!(seed_value(&serde_json::json!("11b")), 11);
        assert_eq!(seed_value(&serde_json::json!(300)), 0);
        assert_eq!(seed_value(&serde_json::json!([1])), 0);
        assert_eq!(region_value(&serde_json::json!(" East ")), "East");
        assert_eq!(region_value(&serde_json::json!(4)), "");
    }

    #[test]
    fn test_csv_table_headers() {
        let csv = "Team,Seed,Region,prob_r32,prob_win\nDuke,1,East,0.98,0.2\nNorfolk,16a,East,,\n";
        let table = parse_team_table_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.teams.len(), 2);
        assert_eq!(table.teams[1].seed, 16);
        assert_eq!(table.probabilities.get("Duke", 0), Some(0.98));
        assert_eq!(table.probabilities.get("Duke", 1), None);
        assert!(table.probabilities.row("Norfolk").is_none());
    }
}

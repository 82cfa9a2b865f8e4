use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::bracket::Bracket;
use crate::config::{
    MergeStrategy, SamplingStrategy, ScoringConfig, SimulationConfig, DEFAULT_MAX_SIMULATIONS,
};
use crate::display::{
    issue_line, next_game_table, optimal_table, pool_table, print_error, print_success,
    scenario_sections, standings_table,
};
use crate::error::{PoolError, PoolResult};
use crate::io::{
    load_bonus, load_bracket, load_participant_names, load_participants, load_team_table,
    write_json, TeamDirectory, TeamTable,
};
use crate::optimal::optimal_bracket;
use crate::probability::{validate_probabilities, ProbabilityModel};
use crate::simulate::{simulate_pool, standings, Participant};

#[derive(Parser)]
#[command(
    name = "bracket-odds",
    version = "1.0.0",
    about = "Bracket pool odds: win and lose chances, scenarios and best-case brackets."
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PoolArgs {
    /// Results bracket JSON
    #[arg(short, long)]
    results: PathBuf,
    /// Directory holding participant bracket files
    #[arg(short, long)]
    brackets: PathBuf,
    /// JSON list of participant names (default: every bracket in the directory)
    #[arg(short, long)]
    participants: Option<PathBuf>,
    /// Team table, JSON or CSV, with seeds and optional advancement probabilities
    #[arg(short, long)]
    teams: Option<PathBuf>,
    /// Scoring config JSON with SCORE_FOR_ROUND and SEED_FACTOR
    #[arg(short, long)]
    scoring: Option<PathBuf>,
    /// JSON map of fixed bonus points per participant
    #[arg(long)]
    bonus: Option<PathBuf>,
    /// Score without the seed upset bonus
    #[arg(long)]
    no_seed_bonus: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Win and lose odds, average place and scenarios for every participant
    Simulate {
        #[command(flatten)]
        pool: PoolArgs,
        /// Outcome budget; smaller spaces are enumerated exhaustively
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_SIMULATIONS)]
        sims: u64,
        /// Enumerate every outcome regardless of budget
        #[arg(long)]
        exhaustive: bool,
        /// RNG seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
        /// Sampling strategy when the budget is below the outcome space
        #[arg(long, value_enum, default_value = "uniform")]
        strategy: SamplingStrategy,
        /// Scenario merge strategy
        #[arg(long, value_enum, default_value = "round")]
        merge: MergeStrategy,
        /// Scenarios shown per participant
        #[arg(short = 'k', long, default_value = "5")]
        top: usize,
        /// Treat every outcome as equally likely even when probabilities are loaded
        #[arg(long)]
        uniform: bool,
        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Best-case completion of the tournament for each participant
    Optimal {
        #[command(flatten)]
        pool: PoolArgs,
        /// Write the optimal brackets as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Current scores against the results so far
    Standings {
        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Check a probability table for range, sum and consistency problems
    Validate {
        /// Team table with advancement probabilities
        teams: PathBuf,
        /// Results bracket used for decided-game checks
        #[arg(short, long)]
        results: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn dispatch(cli: Cli) {
    init_logging(&cli.log_level);
    let result = match cli.command {
        Commands::Simulate {
            pool,
            sims,
            exhaustive,
            seed,
            strategy,
            merge,
            top,
            uniform,
            output,
        } => {
            let config = SimulationConfig {
                max_simulations: if exhaustive { None } else { Some(sims) },
                rng_seed: seed,
                strategy,
                apply_seed_bonus: !pool.no_seed_bonus,
                top_scenarios: top,
                merge,
            };
            cmd_simulate(&pool, &config, uniform, output)
        }
        Commands::Optimal { pool, output } => cmd_optimal(&pool, output),
        Commands::Standings { pool } => cmd_standings(&pool),
        Commands::Validate { teams, results } => cmd_validate(teams, results),
    };
    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

struct Pool {
    results: Bracket,
    participants: Vec<Participant>,
    table: TeamTable,
    scoring: ScoringConfig,
}

impl Pool {
    /// Resolved probability model, or `None` when the table carries none.
    fn model(&self) -> Option<ProbabilityModel> {
        if self.table.probabilities.is_empty() {
            return None;
        }
        validate_probabilities(&self.table.probabilities, &self.results);
        Some(ProbabilityModel::new(&self.table.probabilities, &self.results))
    }
}

fn load_pool(args: &PoolArgs) -> PoolResult<Pool> {
    // Scoring problems are fatal before anything else is read.
    let scoring = match &args.scoring {
        Some(path) => ScoringConfig::load(path)?,
        None => ScoringConfig::default(),
    };
    let table = match &args.teams {
        Some(path) => load_team_table(path)?,
        None => TeamTable::default(),
    };
    let directory: TeamDirectory = table.directory();
    let results = load_bracket(&args.results, &directory)?;
    let names = args
        .participants
        .as_deref()
        .map(load_participant_names)
        .transpose()?;
    let bonus = match &args.bonus {
        Some(path) => load_bonus(path)?,
        None => HashMap::new(),
    };
    let participants = load_participants(&args.brackets, names.as_deref(), &directory, &bonus)?;
    if participants.is_empty() {
        return Err(PoolError::NoParticipants);
    }
    Ok(Pool {
        results,
        participants,
        table,
        scoring,
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_simulate(
    args: &PoolArgs,
    config: &SimulationConfig,
    uniform: bool,
    output: Option<PathBuf>,
) -> PoolResult<()> {
    let pool = load_pool(args)?;
    let model = if uniform { None } else { pool.model() };
    let report = simulate_pool(
        &pool.results,
        &pool.participants,
        model.as_ref(),
        &pool.scoring,
        config,
    )?;

    println!();
    println!(
        "  {} {} remaining games, {} of {} outcomes evaluated{}",
        "Pool odds:".bold(),
        report.remaining_games,
        report.outcomes_evaluated,
        report.total_outcomes,
        match report.mode {
            Some(mode) => format!(" ({:?})", mode),
            None => String::new(),
        }
    );
    println!("{}", pool_table(&report));

    for p in &report.participants {
        let sections = scenario_sections(p);
        if sections.is_empty() {
            continue;
        }
        println!();
        println!("{}", sections);
    }

    for odds in &report.next_games {
        println!();
        println!("{}", next_game_table(odds));
    }

    if let Some(path) = output {
        write_json(&path, &report)?;
        print_success(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn cmd_optimal(args: &PoolArgs, output: Option<PathBuf>) -> PoolResult<()> {
    let pool = load_pool(args)?;
    let model = pool.model();
    let mut brackets = Vec::with_capacity(pool.participants.len());
    for participant in &pool.participants {
        match optimal_bracket(&pool.results, participant, model.as_ref(), &pool.scoring) {
            Ok(best) => {
                info!(
                    "{}: max score {}, probability {:.6}, {} tied",
                    best.participant, best.max_score, best.probability, best.tied_outcomes
                );
                brackets.push(best);
            }
            Err(e) => warn!("Skipping optimal bracket for {}: {}", participant.name, e),
        }
    }

    println!();
    println!("{}", optimal_table(&brackets));

    if let Some(path) = output {
        let by_name: BTreeMap<&str, _> = brackets
            .iter()
            .map(|b| (b.participant.as_str(), b))
            .collect();
        write_json(&path, &by_name)?;
        print_success(&format!("Optimal brackets written to {}", path.display()));
    }
    Ok(())
}

fn cmd_standings(args: &PoolArgs) -> PoolResult<()> {
    let pool = load_pool(args)?;
    let table = standings(
        &pool.results,
        &pool.participants,
        &pool.scoring,
        !args.no_seed_bonus,
    );
    println!();
    println!("{}", standings_table(&table));
    Ok(())
}

fn cmd_validate(teams: PathBuf, results: Option<PathBuf>) -> PoolResult<()> {
    let table = load_team_table(&teams)?;
    let results = match results {
        Some(path) => load_bracket(&path, &table.directory())?,
        None => Bracket::seeded(&table.teams),
    };
    let issues = validate_probabilities(&table.probabilities, &results);

    println!();
    if issues.is_empty() {
        print_success(&format!(
            "No issues in {} probability rows",
            table.probabilities.len()
        ));
    } else {
        println!("  {} {} issues", "Probability table:".bold(), issues.len());
        for issue in &issues {
            println!("{}", issue_line(issue));
        }
    }
    Ok(())
}

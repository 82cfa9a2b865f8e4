use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid scoring config: {0}")]
    Config(String),

    #[error("Invalid round key: {0}")]
    InvalidRound(String),

    #[error("Round {round} must have {expected} games, got {got}")]
    BracketShape {
        round: usize,
        expected: usize,
        got: usize,
    },

    #[error("Game r{round}-{index} is not playable")]
    NotPlayable { round: usize, index: usize },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error(
        "Too many outcomes required: {required} > {allowed}. Reduce the remaining games or raise the budget"
    )]
    BudgetExceeded { required: u128, allowed: u128 },

    #[error("{0} remaining games exceed the 63 supported by the outcome encoding")]
    TooManyRemainingGames(usize),

    #[error("No participant brackets found")]
    NoParticipants,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;

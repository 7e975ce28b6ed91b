use thiserror::Error;

/// Structural failures that abort a run before anything is published.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("duplicate game_id {game_id} (raw rows {first_row} and {second_row})")]
    DuplicateGameId {
        game_id: String,
        first_row: usize,
        second_row: usize,
    },

    #[error("alias chain: {code} -> {target} -> {next}; current_team_code must resolve to itself")]
    AliasChain {
        code: String,
        target: String,
        next: String,
    },

    #[error("conflicting aliases for {code}: {first} and {second}")]
    ConflictingAlias {
        code: String,
        first: String,
        second: String,
    },

    #[error("snapshot integrity check failed: {0}")]
    Integrity(String),
}

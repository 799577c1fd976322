//! Error types for the reservation planner.

use thiserror::Error;

/// Errors surfaced by the planner and its reservation store.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Another mutating operation holds the single-writer guard.
    #[error("another planner operation is already running")]
    AlreadyRunning,

    /// The catalogue has no program with the requested id.
    #[error("program not found: {0}")]
    ProgramNotFound(i64),

    /// A reservation for this program already exists.
    #[error("program {0} is already reserved")]
    AlreadyReserved(i64),

    /// No tuner can take the program at its broadcast time.
    #[error("no tuner available for program {0}")]
    Conflict(i64),

    /// The encode option failed validation.
    #[error("invalid encode option: {0}")]
    InvalidEncodeOption(String),

    /// The program catalogue failed to answer a query.
    #[error("catalogue query failed: {0}")]
    Catalogue(String),

    /// The rule store failed to answer a query.
    #[error("rule store query failed: {0}")]
    Rules(String),

    /// Reading or writing the reservation document failed.
    #[error("reservation file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The reservation document exists but cannot be parsed.
    #[error("reservation file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

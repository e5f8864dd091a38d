//! The module contains the errors the engine can throw.
//!
//! The errors are split in three layers:
//!
//! - [`ValidationError`] rejected user input (expense form, trip form). These
//!   are recovered by the caller and shown to the user as-is.
//! - [`StorageError`] failures of the key-value store collaborator. The engine
//!   never retries them.
//! - [`EngineError`] everything the engine reports, wrapping the two above.
use sea_orm::DbErr;
use thiserror::Error;

/// Rejected user input.
///
/// Variants are checked in a fixed order by the expense validators, so the
/// first failing rule decides which message the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("at least 2 participants are required")]
    InsufficientParticipants,
    #[error("\"{0}\" appears more than once in the split")]
    DuplicateParticipant(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Key-value store failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("\"{key}\" was modified concurrently (expected revision {expected:?}, found {found:?})")]
    Conflict {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
    #[error("no store configured")]
    NotConfigured,
}

impl PartialEq for StorageError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            (
                Self::Conflict {
                    key: ka,
                    expected: ea,
                    found: fa,
                },
                Self::Conflict {
                    key: kb,
                    expected: eb,
                    found: fb,
                },
            ) => ka == kb && ea == eb && fa == fb,
            (Self::NotConfigured, Self::NotConfigured) => true,
            _ => false,
        }
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("\"{0}\" is not a participant of the trip")]
    UnknownParticipant(String),
    #[error("\"{0}\" already participates in the trip")]
    AlreadyParticipant(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
    #[error("Invalid trip: {0}")]
    InvalidTrip(String),
    #[error("Invalid join code: {0}")]
    InvalidJoinCode(String),
    #[error("\"{0}\" trip not found!")]
    TripNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// `true` for errors caused by user input rather than by stored data or
    /// the store itself. The CLI prints these as a plain message.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::AlreadyParticipant(_)
                | Self::InvalidTrip(_)
                | Self::InvalidJoinCode(_)
                | Self::TripNotFound(_)
        )
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        Self::Storage(StorageError::Database(err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(StorageError::Serialization(err))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::UnknownParticipant(a), Self::UnknownParticipant(b)) => a == b,
            (Self::AlreadyParticipant(a), Self::AlreadyParticipant(b)) => a == b,
            (Self::InvalidExpense(a), Self::InvalidExpense(b)) => a == b,
            (Self::InvalidTrip(a), Self::InvalidTrip(b)) => a == b,
            (Self::InvalidJoinCode(a), Self::InvalidJoinCode(b)) => a == b,
            (Self::TripNotFound(a), Self::TripNotFound(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a == b,
            _ => false,
        }
    }
}

//! Trip expense splitting.
//!
//! The pure part of the crate (money, expenses, splits, balances, trips) does
//! no I/O and can be called from anywhere. [`Engine`] adds persistence on top
//! of an injected [`KeyValueStore`]: all trips live in one JSON document under
//! [`TRIPS_KEY`].

pub use balance::{BalanceEntry, Balances, compute_balances};
pub use error::{EngineError, StorageError, ValidationError};
pub use expense::{Expense, ExpenseDraft, QuickSplit};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, TRIPS_KEY};
pub use participants::{Participant, ParticipantId};
pub use split::{Share, amount_per_person, shares};
pub use store::{KeyValueStore, MemoryStore, SqlStore, Versioned};
pub use trip::{JoinCode, NewTrip, Trip, TripStatus};

mod balance;
mod error;
mod expense;
pub mod kv_entries;
mod money;
mod ops;
mod participants;
mod seeds;
mod split;
mod store;
mod trip;

pub type ResultEngine<T> = Result<T, EngineError>;

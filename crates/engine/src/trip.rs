//! Trips: a shared travel event with participants, expenses and a join code.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Balances, EngineError, Expense, MoneyCents, Participant, ParticipantId, ResultEngine,
    ValidationError, balance,
};

const JOIN_CODE_LEN: usize = 6;
const JOIN_CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Short code other people type in to join a trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    /// Random code of six characters in `[0-9A-Z]`.
    #[must_use]
    pub fn generate() -> Self {
        let random = Uuid::new_v4();
        // `% 36` slightly favors the first four symbols (256 = 7 * 36 + 4).
        let code = random
            .as_bytes()
            .iter()
            .take(JOIN_CODE_LEN)
            .map(|byte| char::from(JOIN_CODE_ALPHABET[usize::from(*byte) % JOIN_CODE_ALPHABET.len()]))
            .collect();
        Self(code)
    }

    /// Normalizes user input (trimmed, upper case) and checks the format.
    pub fn parse(input: &str) -> ResultEngine<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(ValidationError::MissingField("code").into());
        }
        if code.len() != JOIN_CODE_LEN || !code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)) {
            return Err(EngineError::InvalidJoinCode(format!(
                "\"{code}\" is not a {JOIN_CODE_LEN} character code"
            )));
        }
        Ok(Self(code))
    }

    /// Whether user input designates this code, ignoring case and
    /// surrounding blanks. Stored codes are not required to be well formed.
    #[must_use]
    pub fn matches(&self, input: &str) -> bool {
        self.0.eq_ignore_ascii_case(input.trim())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Active,
    Archived,
}

/// Input of the trip creation form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTrip {
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ParticipantId>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    /// Chat history, kept as stored and never interpreted by the engine.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    pub code: JoinCode,
    #[serde(default)]
    pub status: TripStatus,
}

impl Trip {
    /// Builds a trip owned by `creator`, who becomes its first participant.
    pub fn new(new_trip: NewTrip, creator: Participant) -> ResultEngine<Self> {
        let name = new_trip.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if new_trip.end_date < new_trip.start_date {
            return Err(EngineError::InvalidTrip(
                "end date must not be before start date".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: new_trip.description.trim().to_string(),
            start_date: new_trip.start_date,
            end_date: new_trip.end_date,
            created_by: Some(creator.id.clone()),
            participants: vec![creator],
            expenses: Vec::new(),
            messages: Vec::new(),
            code: JoinCode::generate(),
            status: TripStatus::Active,
        })
    }

    #[must_use]
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn is_participant(&self, id: &ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn add_participant(&mut self, participant: Participant) -> ResultEngine<()> {
        if self.is_participant(&participant.id) {
            return Err(EngineError::AlreadyParticipant(participant.id.to_string()));
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Appends an expense whose payer and split set belong to the trip.
    /// Nothing is appended when a check fails.
    pub fn add_expense(&mut self, expense: Expense) -> ResultEngine<()> {
        let unknown = std::iter::once(&expense.paid_by)
            .chain(expense.split_between.iter())
            .find(|id| !self.is_participant(id));
        if let Some(id) = unknown {
            return Err(EngineError::UnknownParticipant(id.to_string()));
        }
        self.expenses.push(expense);
        Ok(())
    }

    /// Sum of every expense total.
    pub fn total_spent(&self) -> ResultEngine<MoneyCents> {
        self.expenses.iter().try_fold(MoneyCents::ZERO, |acc, expense| {
            acc.checked_add(expense.total_amount).ok_or_else(|| {
                EngineError::from(ValidationError::InvalidAmount(
                    "total spent overflow".to_string(),
                ))
            })
        })
    }

    pub fn balances(&self) -> ResultEngine<Balances> {
        balance::compute_balances(&self.participants, &self.expenses)
    }
}

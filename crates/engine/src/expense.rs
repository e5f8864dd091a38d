//! Shared expenses.
//!
//! An [`Expense`] is created from raw form input ([`ExpenseDraft`]) and is
//! immutable afterwards. Validation runs in a fixed order so the user always
//! sees the same message for the same input:
//!
//! 1. every field present (`MissingField`)
//! 2. at least two participants (`InsufficientParticipants`), none listed
//!    twice (`DuplicateParticipant`)
//! 3. amount parses to a value `> 0` (`InvalidAmount`)
//!
//! Membership of the payer and of the split set is checked by the trip, not
//! here.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MoneyCents, ParticipantId, ValidationError};

/// Raw input of the trip expense form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: String,
    pub split_between: Vec<ParticipantId>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    #[serde(alias = "amount")]
    pub total_amount: MoneyCents,
    pub paid_by: ParticipantId,
    pub date: DateTime<Utc>,
    pub split_between: Vec<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Expense {
    /// Validates the draft and builds the expense. No I/O.
    pub fn create(
        draft: ExpenseDraft,
        paid_by: ParticipantId,
        date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let description = require_text(&draft.description, "description")?;
        require_text(&draft.amount, "amount")?;
        if draft.split_between.is_empty() {
            return Err(ValidationError::MissingField("splitBetween"));
        }

        if draft.split_between.len() < 2 {
            return Err(ValidationError::InsufficientParticipants);
        }
        let mut seen = HashSet::with_capacity(draft.split_between.len());
        for id in &draft.split_between {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateParticipant(id.to_string()));
            }
        }

        let total_amount = MoneyCents::parse_positive(&draft.amount)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            description,
            total_amount,
            paid_by,
            date,
            split_between: draft.split_between,
            category: draft
                .category
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
        })
    }

    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.split_between.len()
    }
}

/// Result of the standalone split form, where only a head count is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSplit {
    pub description: String,
    pub total_amount: MoneyCents,
    pub participant_count: usize,
    pub amount_per_person: MoneyCents,
    pub date: DateTime<Utc>,
    pub paid_by: ParticipantId,
}

impl QuickSplit {
    /// Same validation order as [`Expense::create`], with the participant
    /// count typed in as text.
    pub fn create(
        description: &str,
        amount: &str,
        participant_count: &str,
        paid_by: ParticipantId,
        date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let description = require_text(description, "description")?;
        require_text(amount, "amount")?;
        require_text(participant_count, "participants")?;

        let participant_count = parse_leading_integer(participant_count)
            .filter(|count| *count >= 2)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or(ValidationError::InsufficientParticipants)?;

        let total_amount = MoneyCents::parse_positive(amount)?;
        let amount_per_person = total_amount.div_rounded(participant_count)?;

        Ok(Self {
            description,
            total_amount,
            participant_count,
            amount_per_person,
            date,
            paid_by,
        })
    }
}

fn require_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Reads the integer prefix of `text` (`"3 people"` is 3, `"2.9"` is 2).
fn parse_leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

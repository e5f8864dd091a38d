//! Net balances of a trip.
//!
//! Balances are derived from the expense list on demand and never stored.
//! A positive amount means the participant is owed money, a negative amount
//! means the participant owes money.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    EngineError, Expense, MoneyCents, Participant, ParticipantId, ResultEngine, ValidationError,
    split,
};

/// Net amount of one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceEntry {
    pub participant: ParticipantId,
    pub amount: MoneyCents,
}

/// Net balances in the trip's participant order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Balances {
    entries: Vec<BalanceEntry>,
}

impl Balances {
    #[must_use]
    pub fn get(&self, participant: &ParticipantId) -> Option<MoneyCents> {
        self.entries
            .iter()
            .find(|entry| &entry.participant == participant)
            .map(|entry| entry.amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all balances. Zero for every valid trip, since shares always add
    /// up to the expense total.
    #[must_use]
    pub fn total(&self) -> MoneyCents {
        self.entries.iter().map(|entry| entry.amount).sum()
    }

    /// Participants that are owed money.
    pub fn creditors(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.entries.iter().filter(|entry| entry.amount.is_positive())
    }

    /// Participants that owe money.
    pub fn debtors(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.entries.iter().filter(|entry| entry.amount.is_negative())
    }
}

impl<'a> IntoIterator for &'a Balances {
    type Item = &'a BalanceEntry;
    type IntoIter = std::slice::Iter<'a, BalanceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Folds `expenses` into one net balance per participant.
///
/// - Every participant starts at zero, including those without expenses.
/// - The payer is credited the full total.
/// - Every participant of the split is debited its exact share; the payer is
///   debited too when it is part of the split.
///
/// Fails with [`EngineError::UnknownParticipant`] as soon as an expense
/// references somebody outside `participants`: no partial result is returned.
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
) -> ResultEngine<Balances> {
    let mut index: HashMap<&ParticipantId, usize> = HashMap::with_capacity(participants.len());
    let mut entries = Vec::with_capacity(participants.len());
    for participant in participants {
        // A duplicated id keeps its first position.
        if index.contains_key(&participant.id) {
            continue;
        }
        index.insert(&participant.id, entries.len());
        entries.push(BalanceEntry {
            participant: participant.id.clone(),
            amount: MoneyCents::ZERO,
        });
    }

    for expense in expenses {
        let payer = *index
            .get(&expense.paid_by)
            .ok_or_else(|| EngineError::UnknownParticipant(expense.paid_by.to_string()))?;
        apply(&mut entries[payer], expense.total_amount)?;

        for share in split::shares(expense)? {
            let slot = *index
                .get(&share.participant)
                .ok_or_else(|| EngineError::UnknownParticipant(share.participant.to_string()))?;
            apply(&mut entries[slot], -share.amount)?;
        }
    }

    Ok(Balances { entries })
}

fn apply(entry: &mut BalanceEntry, delta: MoneyCents) -> ResultEngine<()> {
    entry.amount = entry
        .amount
        .checked_add(delta)
        .ok_or_else(|| ValidationError::InvalidAmount("balance overflow".to_string()))?;
    Ok(())
}

use chrono::{DateTime, Utc};

use crate::{EngineError, Expense, ExpenseDraft, KeyValueStore, ParticipantId, ResultEngine};

use super::{Engine, find_trip_mut, with_trips};

impl<S: KeyValueStore> Engine<S> {
    /// Validates `draft` and appends the resulting expense to the trip.
    ///
    /// Invalid input is rejected before the stored trips are even read, so a
    /// rejected expense never reaches the trip's expense list.
    pub async fn add_expense(
        &self,
        trip_id: &str,
        draft: ExpenseDraft,
        paid_by: ParticipantId,
        date: DateTime<Utc>,
    ) -> ResultEngine<Expense> {
        let expense = Expense::create(draft, paid_by, date)?;
        let added = with_trips!(self, |trips| {
            let trip = find_trip_mut(&mut trips, trip_id)?;
            trip.add_expense(expense.clone())?;
            Ok::<_, EngineError>(expense)
        })?;
        tracing::info!(
            trip_id,
            expense_id = %added.id,
            amount = %added.total_amount,
            "expense added"
        );
        Ok(added)
    }
}

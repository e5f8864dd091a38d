use crate::{Balances, KeyValueStore, ResultEngine};

use super::Engine;

impl<S: KeyValueStore> Engine<S> {
    /// Recomputes the net balance of every participant of a trip from its
    /// stored expenses.
    ///
    /// - Nothing is written back: balances are always derived.
    /// - An expense referencing a non participant aborts the whole
    ///   computation with `UnknownParticipant`.
    pub async fn balances(&self, trip_id: &str) -> ResultEngine<Balances> {
        let trip = self.trip(trip_id).await?;
        let balances = trip.balances().inspect_err(|err| {
            tracing::error!(trip_id, "balance computation failed: {err}");
        })?;
        tracing::debug!(trip_id, participants = balances.len(), "balances computed");
        Ok(balances)
    }
}

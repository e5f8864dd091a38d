use crate::{
    EngineError, JoinCode, KeyValueStore, NewTrip, Participant, ResultEngine, Trip,
    ValidationError, seeds,
};

use super::{Engine, find_trip, find_trip_mut, with_trips};

/// Attempts at drawing a join code not used by another trip.
const JOIN_CODE_ATTEMPTS: usize = 16;

impl<S: KeyValueStore> Engine<S> {
    /// Lists every stored trip, in creation order.
    pub async fn trips(&self) -> ResultEngine<Vec<Trip>> {
        let (trips, _) = self.load_trips().await?;
        Ok(trips)
    }

    pub async fn trip(&self, trip_id: &str) -> ResultEngine<Trip> {
        let (trips, _) = self.load_trips().await?;
        find_trip(&trips, trip_id).cloned()
    }

    /// Creates a trip owned by `creator` and returns it with its join code.
    pub async fn create_trip(&self, new_trip: NewTrip, creator: Participant) -> ResultEngine<Trip> {
        let mut trip = Trip::new(new_trip, creator)?;
        let created = with_trips!(self, |trips| {
            let mut attempts = 1;
            while trips.iter().any(|other| other.code == trip.code) {
                if attempts == JOIN_CODE_ATTEMPTS {
                    return Err(EngineError::InvalidJoinCode(
                        "no free join code available".to_string(),
                    ));
                }
                trip.code = JoinCode::generate();
                attempts += 1;
            }
            trips.push(trip.clone());
            Ok::<_, EngineError>(trip)
        })?;
        tracing::info!(trip_id = %created.id, code = %created.code, "trip created");
        Ok(created)
    }

    /// Adds `participant` to the trip owning `code`.
    ///
    /// Input is matched against the stored codes ignoring case and
    /// surrounding blanks, so older trips with shorter codes stay joinable.
    pub async fn join_trip(&self, code: &str, participant: Participant) -> ResultEngine<Trip> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::MissingField("code").into());
        }
        let joined = with_trips!(self, |trips| {
            let Some(trip) = trips.iter_mut().find(|trip| trip.code.matches(code)) else {
                // Report a malformed code as such, a well-formed one as unused.
                let code = JoinCode::parse(code)?;
                return Err(EngineError::InvalidJoinCode(format!("no trip uses {code}")));
            };
            trip.add_participant(participant.clone())?;
            Ok::<_, EngineError>(trip.clone())
        })?;
        tracing::info!(trip_id = %joined.id, participant = %participant.id, "joined trip");
        Ok(joined)
    }

    pub async fn add_participant(
        &self,
        trip_id: &str,
        participant: Participant,
    ) -> ResultEngine<Trip> {
        let updated = with_trips!(self, |trips| {
            let trip = find_trip_mut(&mut trips, trip_id)?;
            trip.add_participant(participant.clone())?;
            Ok::<_, EngineError>(trip.clone())
        })?;
        tracing::info!(trip_id, participant = %participant.id, "participant added");
        Ok(updated)
    }

    /// Replaces a stored trip with `trip` (matched by id).
    ///
    /// The replacement must be consistent: every expense must reference trip
    /// participants only.
    pub async fn update_trip(&self, trip: Trip) -> ResultEngine<()> {
        trip.balances()?;
        let trip_id = trip.id.clone();
        with_trips!(self, |trips| {
            let stored = find_trip_mut(&mut trips, &trip_id)?;
            *stored = trip;
            Ok::<_, EngineError>(())
        })?;
        tracing::info!(trip_id = %trip_id, "trip updated");
        Ok(())
    }

    pub async fn remove_trip(&self, trip_id: &str) -> ResultEngine<Trip> {
        let removed = with_trips!(self, |trips| {
            let index = trips
                .iter()
                .position(|trip| trip.id == trip_id)
                .ok_or_else(|| EngineError::TripNotFound(trip_id.to_string()))?;
            Ok::<_, EngineError>(trips.remove(index))
        })?;
        tracing::info!(trip_id, "trip removed");
        Ok(removed)
    }

    /// Replaces every stored trip with the demo data set.
    pub async fn seed_demo(&self) -> ResultEngine<Vec<Trip>> {
        let demo = seeds::demo_trips()?;
        let seeded = with_trips!(self, |trips| {
            trips = demo;
            Ok::<_, EngineError>(trips.clone())
        })?;
        tracing::info!(trips = seeded.len(), "demo trips loaded");
        Ok(seeded)
    }
}

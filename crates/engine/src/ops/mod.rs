use tokio::sync::Mutex;

use crate::{
    EngineError, KeyValueStore, ResultEngine, StorageError, Trip, Versioned,
};

mod balances;
mod expenses;
mod trips;

/// Key under which the whole trip list is stored.
pub const TRIPS_KEY: &str = "trips";

/// Run a mutation of the trip list as one read-modify-write cycle.
///
/// The writer lock serializes writers of this engine; the revision read
/// alongside the list guards against writers in other processes.
macro_rules! with_trips {
    ($self:expr, |$trips:ident| $body:expr) => {{
        let _writer = $self.writer.lock().await;
        let (mut $trips, revision) = $self.load_trips().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $self.save_trips(&$trips, revision).await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_trips;

/// Trip operations on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    writer: Mutex<()>,
}

impl<S: KeyValueStore> Engine<S> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<S> {
        EngineBuilder::default()
    }

    /// The injected store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_trips(&self) -> ResultEngine<(Vec<Trip>, Option<u64>)> {
        match self.store.get(TRIPS_KEY).await? {
            None => Ok((Vec::new(), None)),
            Some(Versioned { value, revision }) if value.is_null() => {
                Ok((Vec::new(), Some(revision)))
            }
            Some(Versioned { value, revision }) => {
                let trips: Vec<Trip> = serde_json::from_value(value)?;
                tracing::debug!(revision, trips = trips.len(), "loaded trips");
                Ok((trips, Some(revision)))
            }
        }
    }

    async fn save_trips(&self, trips: &[Trip], revision: Option<u64>) -> ResultEngine<()> {
        let value = serde_json::to_value(trips)?;
        match self.store.set(TRIPS_KEY, value, revision).await {
            Ok(saved) => {
                tracing::debug!(revision = saved, trips = trips.len(), "saved trips");
                Ok(())
            }
            Err(err @ StorageError::Conflict { .. }) => {
                tracing::warn!("trips not saved: {err}");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn find_trip<'a>(trips: &'a [Trip], trip_id: &str) -> ResultEngine<&'a Trip> {
    trips
        .iter()
        .find(|trip| trip.id == trip_id)
        .ok_or_else(|| EngineError::TripNotFound(trip_id.to_string()))
}

fn find_trip_mut<'a>(trips: &'a mut [Trip], trip_id: &str) -> ResultEngine<&'a mut Trip> {
    trips
        .iter_mut()
        .find(|trip| trip.id == trip_id)
        .ok_or_else(|| EngineError::TripNotFound(trip_id.to_string()))
}

/// The builder for `Engine`
#[derive(Debug)]
pub struct EngineBuilder<S> {
    store: Option<S>,
}

impl<S> Default for EngineBuilder<S> {
    fn default() -> Self {
        Self { store: None }
    }
}

impl<S: KeyValueStore> EngineBuilder<S> {
    /// Pass the required store
    pub fn store(mut self, store: S) -> EngineBuilder<S> {
        self.store = Some(store);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine<S>> {
        let store = self.store.ok_or(StorageError::NotConfigured)?;
        Ok(Engine {
            store,
            writer: Mutex::new(()),
        })
    }
}

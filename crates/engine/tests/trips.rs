use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::Database;
use serde_json::{Value, json};

use engine::{
    Engine, EngineError, ExpenseDraft, KeyValueStore, MemoryStore, MoneyCents, NewTrip,
    Participant, ParticipantId, SqlStore, StorageError, TRIPS_KEY, Trip, ValidationError,
    Versioned,
};
use migration::MigratorTrait;

async fn memory_engine() -> Engine<MemoryStore> {
    Engine::builder()
        .store(MemoryStore::new())
        .build()
        .await
        .unwrap()
}

async fn sql_store() -> SqlStore {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    SqlStore::new(db)
}

async fn sql_engine() -> Engine<SqlStore> {
    Engine::builder()
        .store(sql_store().await)
        .build()
        .await
        .unwrap()
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

fn new_trip(name: &str) -> NewTrip {
    NewTrip {
        name: name.to_string(),
        description: "A few days away".to_string(),
        start_date: day(15),
        end_date: day(22),
    }
}

fn draft(description: &str, amount: &str, split: &[&str]) -> ExpenseDraft {
    ExpenseDraft {
        description: description.to_string(),
        amount: amount.to_string(),
        split_between: split.iter().map(|id| ParticipantId::from(*id)).collect(),
        category: None,
    }
}

/// Trip created by `a` and joined by `b` and `c`.
async fn trip_with_three<S: KeyValueStore>(engine: &Engine<S>) -> Trip {
    let trip = engine
        .create_trip(new_trip("Lake house"), Participant::new("a", Some("Ana")))
        .await
        .unwrap();
    engine
        .join_trip(trip.code.as_str(), Participant::new("b", None))
        .await
        .unwrap();
    engine
        .join_trip(&trip.code.as_str().to_lowercase(), Participant::new("c", None))
        .await
        .unwrap()
}

#[tokio::test]
async fn builder_requires_a_store() {
    let err = Engine::<MemoryStore>::builder().build().await.unwrap_err();
    assert_eq!(err, EngineError::Storage(StorageError::NotConfigured));
}

#[tokio::test]
async fn create_and_join_trip() {
    let engine = sql_engine().await;
    let trip = trip_with_three(&engine).await;

    let ids: Vec<_> = trip.participants.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert_eq!(trip.created_by, Some(ParticipantId::from("a")));

    let stored = engine.trip(&trip.id).await.unwrap();
    assert_eq!(stored, trip);
    assert_eq!(engine.trips().await.unwrap().len(), 1);
}

#[tokio::test]
async fn join_rejects_unknown_code_and_existing_participant() {
    let engine = memory_engine().await;
    let trip = trip_with_three(&engine).await;

    let other = if trip.code.as_str() == "ZZZZZZ" { "YYYYYY" } else { "ZZZZZZ" };
    let err = engine
        .join_trip(other, Participant::new("d", None))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidJoinCode(_)));

    let err = engine
        .join_trip("", Participant::new("d", None))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::from(ValidationError::MissingField("code")));

    let err = engine
        .join_trip(trip.code.as_str(), Participant::new("b", Some("Bea")))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadyParticipant("b".to_string()));
    assert_eq!(engine.trip(&trip.id).await.unwrap().participants.len(), 3);
}

#[tokio::test]
async fn exact_split_balances() {
    let engine = memory_engine().await;
    let trip = trip_with_three(&engine).await;

    engine
        .add_expense(&trip.id, draft("Fuel", "100", &["a", "b"]), "a".into(), day(16))
        .await
        .unwrap();

    let balances = engine.balances(&trip.id).await.unwrap();
    assert_eq!(balances.get(&"a".into()), Some(MoneyCents::new(50_00)));
    assert_eq!(balances.get(&"b".into()), Some(MoneyCents::new(-50_00)));
    assert_eq!(balances.get(&"c".into()), Some(MoneyCents::ZERO));
}

#[tokio::test]
async fn non_divisible_split_conserves_the_total() {
    let engine = sql_engine().await;
    let trip = trip_with_three(&engine).await;

    let expense = engine
        .add_expense(&trip.id, draft("Dinner", "100", &["a", "b", "c"]), "b".into(), day(17))
        .await
        .unwrap();

    let shares = engine::shares(&expense).unwrap();
    let amounts: Vec<_> = shares.iter().map(|s| s.amount).collect();
    // The first participant in split order absorbs the extra cent.
    assert_eq!(
        amounts,
        [MoneyCents::new(33_34), MoneyCents::new(33_33), MoneyCents::new(33_33)]
    );
    assert_eq!(amounts.into_iter().sum::<MoneyCents>(), MoneyCents::new(100_00));

    let balances = engine.balances(&trip.id).await.unwrap();
    assert_eq!(balances.get(&"a".into()), Some(MoneyCents::new(-33_34)));
    assert_eq!(balances.get(&"b".into()), Some(MoneyCents::new(66_67)));
    assert_eq!(balances.get(&"c".into()), Some(MoneyCents::new(-33_33)));
    assert_eq!(balances.total(), MoneyCents::ZERO);
}

#[tokio::test]
async fn balances_are_idempotent() {
    let engine = memory_engine().await;
    let trip = trip_with_three(&engine).await;
    for (amount, payer) in [("12.50", "a"), ("7", "c"), ("99.99", "b")] {
        engine
            .add_expense(&trip.id, draft("Stuff", amount, &["a", "b", "c"]), payer.into(), day(18))
            .await
            .unwrap();
    }

    let first = engine.balances(&trip.id).await.unwrap();
    let second = engine.balances(&trip.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total(), MoneyCents::ZERO);
}

#[tokio::test]
async fn invalid_expenses_are_not_persisted() {
    let engine = memory_engine().await;
    let trip = trip_with_three(&engine).await;
    let revision = engine.store().get(TRIPS_KEY).await.unwrap().unwrap().revision;

    let cases = [
        (
            draft("Taxi", "20", &["a"]),
            EngineError::from(ValidationError::InsufficientParticipants),
        ),
        (
            draft("", "20", &["a", "b"]),
            EngineError::from(ValidationError::MissingField("description")),
        ),
        (
            draft("Taxi", "20", &["a", "a"]),
            EngineError::from(ValidationError::DuplicateParticipant("a".to_string())),
        ),
        (
            draft("Taxi", "20", &["a", "zed"]),
            EngineError::UnknownParticipant("zed".to_string()),
        ),
    ];
    for (input, expected) in cases {
        let err = engine
            .add_expense(&trip.id, input, "a".into(), day(19))
            .await
            .unwrap_err();
        assert_eq!(err, expected);
    }

    for amount in ["-5", "abc", "0", "12.345"] {
        let err = engine
            .add_expense(&trip.id, draft("Taxi", amount, &["a", "b"]), "a".into(), day(19))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidAmount(_))
        ));
    }

    let err = engine
        .add_expense("missing", draft("Taxi", "20", &["a", "b"]), "a".into(), day(19))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::TripNotFound("missing".to_string()));

    assert!(engine.trip(&trip.id).await.unwrap().expenses.is_empty());
    let after = engine.store().get(TRIPS_KEY).await.unwrap().unwrap().revision;
    assert_eq!(after, revision);
}

#[tokio::test]
async fn unknown_payer_fails_balance_computation() {
    let engine = memory_engine().await;
    let trip = trip_with_three(&engine).await;

    let mut tampered = engine.trip(&trip.id).await.unwrap();
    tampered.expenses.push(
        engine::Expense::create(draft("Ghost", "10", &["a", "b"]), "ghost".into(), day(20))
            .unwrap(),
    );
    let err = engine.update_trip(tampered.clone()).await.unwrap_err();
    assert_eq!(err, EngineError::UnknownParticipant("ghost".to_string()));

    // Written behind the engine's back.
    let (value, revision) = {
        let stored = engine.store().get(TRIPS_KEY).await.unwrap().unwrap();
        (stored.value, stored.revision)
    };
    let mut trips: Vec<Trip> = serde_json::from_value(value).unwrap();
    trips[0] = tampered;
    engine
        .store()
        .set(TRIPS_KEY, serde_json::to_value(&trips).unwrap(), Some(revision))
        .await
        .unwrap();

    let err = engine.balances(&trip.id).await.unwrap_err();
    assert_eq!(err, EngineError::UnknownParticipant("ghost".to_string()));
}

#[tokio::test]
async fn concurrent_expenses_are_all_kept() {
    let engine = sql_engine().await;
    let trip = trip_with_three(&engine).await;

    let (first, second, third) = tokio::join!(
        engine.add_expense(&trip.id, draft("Bread", "3", &["a", "b"]), "a".into(), day(16)),
        engine.add_expense(&trip.id, draft("Wine", "15", &["b", "c"]), "b".into(), day(16)),
        engine.add_expense(&trip.id, draft("Cheese", "9", &["a", "c"]), "c".into(), day(16)),
    );
    first.unwrap();
    second.unwrap();
    third.unwrap();

    let stored = engine.trip(&trip.id).await.unwrap();
    assert_eq!(stored.expenses.len(), 3);
    assert_eq!(stored.total_spent().unwrap(), MoneyCents::new(27_00));
}

#[tokio::test]
async fn stale_write_is_a_conflict() {
    let store = sql_store().await;

    assert_eq!(store.set("trips", json!([]), None).await.unwrap(), 1);
    assert_eq!(store.set("trips", json!([1]), Some(1)).await.unwrap(), 2);

    let err = store.set("trips", json!([2]), Some(1)).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::Conflict {
            key: "trips".to_string(),
            expected: Some(1),
            found: Some(2),
        }
    );
    let err = store.set("trips", json!([3]), None).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::Conflict {
            key: "trips".to_string(),
            expected: None,
            found: Some(2),
        }
    );

    let stored = store.get("trips").await.unwrap().unwrap();
    assert_eq!(stored.value, json!([1]));
    assert_eq!(stored.revision, 2);

    store.remove("trips").await.unwrap();
    assert_eq!(store.get("trips").await.unwrap(), None);
}

/// Store where another writer rewrites the key right after every read,
/// while `interleave` is on.
#[derive(Default)]
struct InterleavedStore {
    inner: MemoryStore,
    interleave: AtomicBool,
}

impl KeyValueStore for InterleavedStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>, StorageError> {
        let current = self.inner.get(key).await?;
        if self.interleave.load(Ordering::SeqCst)
            && let Some(entry) = &current
        {
            self.inner
                .set(key, entry.value.clone(), Some(entry.revision))
                .await?;
        }
        Ok(current)
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        expected_revision: Option<u64>,
    ) -> Result<u64, StorageError> {
        self.inner.set(key, value, expected_revision).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn engine_reports_conflicts_from_other_writers() {
    let engine = Engine::builder()
        .store(InterleavedStore::default())
        .build()
        .await
        .unwrap();
    let trip = trip_with_three(&engine).await;
    let before = engine.store().inner.get(TRIPS_KEY).await.unwrap().unwrap();

    engine.store().interleave.store(true, Ordering::SeqCst);
    let err = engine
        .add_expense(&trip.id, draft("Ice cream", "6", &["a", "b"]), "a".into(), day(21))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Storage(StorageError::Conflict {
            key: TRIPS_KEY.to_string(),
            expected: Some(before.revision),
            found: Some(before.revision + 1),
        })
    );

    // One foreign write and no retry: the document is the other writer's.
    let after = engine.store().inner.get(TRIPS_KEY).await.unwrap().unwrap();
    assert_eq!(after.revision, before.revision + 1);
    assert_eq!(after.value, before.value);

    engine.store().interleave.store(false, Ordering::SeqCst);
    assert!(engine.trip(&trip.id).await.unwrap().expenses.is_empty());
    engine
        .add_expense(&trip.id, draft("Ice cream", "6", &["a", "b"]), "a".into(), day(21))
        .await
        .unwrap();
    assert_eq!(engine.trip(&trip.id).await.unwrap().expenses.len(), 1);
}

#[tokio::test]
async fn joins_stored_codes_of_any_length() {
    let engine = memory_engine().await;
    let stored = json!([{
        "id": "trip1",
        "name": "Short code",
        "startDate": "2023-07-01T00:00:00.000Z",
        "endDate": "2023-07-03T00:00:00.000Z",
        "participants": ["u1"],
        "code": "AB12C"
    }]);
    engine.store().set(TRIPS_KEY, stored, None).await.unwrap();

    let joined = engine
        .join_trip(" ab12c ", Participant::new("u2", None))
        .await
        .unwrap();
    assert_eq!(joined.participants.len(), 2);
    assert_eq!(joined.code.as_str(), "AB12C");

    let err = engine
        .join_trip("AB12", Participant::new("u3", None))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidJoinCode(_)));
}

#[tokio::test]
async fn loads_legacy_documents() {
    let engine = memory_engine().await;
    let legacy = json!([{
        "id": "trip1",
        "name": "Old trip",
        "startDate": "2023-07-01T00:00:00.000Z",
        "endDate": "2023-07-03T00:00:00.000Z",
        "participants": ["u1", { "id": "u2", "name": "Bea" }],
        "code": "OLD123",
        "expenses": [{
            "id": "e1",
            "description": "Camping",
            "amount": "45.5",
            "paidBy": "u2",
            "date": "2023-07-01T10:00:00.000Z",
            "splitBetween": ["u1", "u2"],
            "currency": "CLP"
        }],
        "messages": [{ "id": "m1", "text": "hi", "userId": "u1" }]
    }]);
    engine.store().set(TRIPS_KEY, legacy, None).await.unwrap();

    let trip = engine.trip("trip1").await.unwrap();
    assert_eq!(trip.participants[0], Participant::new("u1", None));
    assert_eq!(trip.participants[1].display_name(), "Bea");
    assert_eq!(trip.expenses[0].total_amount, MoneyCents::new(45_50));
    assert_eq!(trip.messages.len(), 1);

    let balances = engine.balances("trip1").await.unwrap();
    assert_eq!(balances.get(&"u1".into()), Some(MoneyCents::new(-22_75)));
    assert_eq!(balances.get(&"u2".into()), Some(MoneyCents::new(22_75)));

    // Joining rewrites the document in the current shape.
    engine
        .join_trip("old123", Participant::new("u3", Some("Cata")))
        .await
        .unwrap();
    let stored = engine.store().get(TRIPS_KEY).await.unwrap().unwrap();
    assert_eq!(stored.value[0]["participants"][0], json!("u1"));
    assert_eq!(stored.value[0]["expenses"][0]["totalAmount"], json!(45.5));
}

#[tokio::test]
async fn null_document_reads_as_no_trips() {
    let engine = memory_engine().await;
    engine.store().set(TRIPS_KEY, json!(null), None).await.unwrap();
    assert!(engine.trips().await.unwrap().is_empty());

    engine
        .create_trip(new_trip("Fresh start"), Participant::new("a", None))
        .await
        .unwrap();
    assert_eq!(engine.trips().await.unwrap().len(), 1);
}

#[tokio::test]
async fn seed_and_remove_trips() {
    let engine = sql_engine().await;
    trip_with_three(&engine).await;

    let seeded = engine.seed_demo().await.unwrap();
    assert_eq!(seeded.len(), 2);
    assert_eq!(engine.trips().await.unwrap(), seeded);

    let balances = engine.balances("trip1").await.unwrap();
    assert_eq!(balances.get(&"user1".into()), Some(MoneyCents::new(132_50)));

    let joined = engine
        .join_trip("ABC123", Participant::new("user3", None))
        .await
        .unwrap();
    assert_eq!(joined.participants.len(), 3);

    let removed = engine.remove_trip("trip2").await.unwrap();
    assert_eq!(removed.name, "Weekend in Santiago");
    let err = engine.trip("trip2").await.unwrap_err();
    assert_eq!(err, EngineError::TripNotFound("trip2".to_string()));
}

#[tokio::test]
async fn add_participant_by_trip_id() {
    let engine = memory_engine().await;
    let trip = engine
        .create_trip(new_trip("Ski week"), Participant::new("a", None))
        .await
        .unwrap();

    let updated = engine
        .add_participant(&trip.id, Participant::new("b", Some("  Bea ")))
        .await
        .unwrap();
    assert_eq!(updated.participants[1].display_name(), "Bea");

    let err = engine
        .add_participant(&trip.id, Participant::new("a", None))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadyParticipant("a".to_string()));
}

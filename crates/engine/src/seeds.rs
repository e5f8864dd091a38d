//! Demo data set loaded by `Engine::seed_demo`.

use serde_json::json;

use crate::{ResultEngine, Trip};

/// Two trips shared by `user1` and `user2`, with a few expenses each.
pub fn demo_trips() -> ResultEngine<Vec<Trip>> {
    let trips = json!([
        {
            "id": "trip1",
            "name": "Beach trip",
            "description": "Summer holidays in Viña del Mar",
            "startDate": "2024-01-15T00:00:00.000Z",
            "endDate": "2024-01-22T00:00:00.000Z",
            "createdBy": "user1",
            "participants": [
                { "id": "user1", "name": "Juan Pérez" },
                { "id": "user2", "name": "María García" }
            ],
            "code": "ABC123",
            "expenses": [
                {
                    "id": "exp1",
                    "description": "Hotel",
                    "totalAmount": 300,
                    "paidBy": "user1",
                    "date": "2024-01-15T14:00:00.000Z",
                    "category": "Lodging",
                    "splitBetween": ["user1", "user2"]
                },
                {
                    "id": "exp2",
                    "description": "Restaurant dinner",
                    "totalAmount": 80,
                    "paidBy": "user2",
                    "date": "2024-01-16T20:00:00.000Z",
                    "category": "Food",
                    "splitBetween": ["user1", "user2"]
                },
                {
                    "id": "exp3",
                    "description": "Airport taxi",
                    "totalAmount": 45,
                    "paidBy": "user1",
                    "date": "2024-01-15T12:00:00.000Z",
                    "category": "Transport",
                    "splitBetween": ["user1", "user2"]
                }
            ],
            "messages": [
                {
                    "id": "msg1",
                    "text": "Hotel is booked!",
                    "userId": "user1",
                    "timestamp": "2024-01-10T15:30:00.000Z"
                },
                {
                    "id": "msg2",
                    "text": "Great, I'll take care of transport",
                    "userId": "user2",
                    "timestamp": "2024-01-10T15:35:00.000Z"
                }
            ]
        },
        {
            "id": "trip2",
            "name": "Weekend in Santiago",
            "description": "A weekend in the capital",
            "startDate": "2024-02-01T00:00:00.000Z",
            "endDate": "2024-02-03T00:00:00.000Z",
            "createdBy": "user2",
            "participants": [
                { "id": "user1", "name": "Juan Pérez" },
                { "id": "user2", "name": "María García" }
            ],
            "code": "XYZ789",
            "expenses": [
                {
                    "id": "exp4",
                    "description": "Airbnb",
                    "totalAmount": 150,
                    "paidBy": "user2",
                    "date": "2024-02-01T15:00:00.000Z",
                    "category": "Lodging",
                    "splitBetween": ["user1", "user2"]
                },
                {
                    "id": "exp5",
                    "description": "Groceries",
                    "totalAmount": 60,
                    "paidBy": "user1",
                    "date": "2024-02-02T11:00:00.000Z",
                    "category": "Food",
                    "splitBetween": ["user1", "user2"]
                }
            ],
            "messages": [
                {
                    "id": "msg3",
                    "text": "What time do we arrive?",
                    "userId": "user1",
                    "timestamp": "2024-01-28T18:00:00.000Z"
                }
            ]
        }
    ]);
    Ok(serde_json::from_value(trips)?)
}

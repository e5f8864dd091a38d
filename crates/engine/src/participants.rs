//! Trip participants.
//!
//! A participant is identified by an opaque string id (the username of the
//! session that created or joined the trip). Trips created before anybody
//! joined store participants as bare ids, later joins store `{id, name}`
//! objects; both forms are read and written back unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque participant identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredParticipant", into = "StoredParticipant")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: Option<String>,
}

impl Participant {
    /// Blank names are dropped.
    pub fn new(id: impl Into<ParticipantId>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Name to show in listings, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredParticipant {
    Id(ParticipantId),
    Named {
        id: ParticipantId,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<StoredParticipant> for Participant {
    fn from(value: StoredParticipant) -> Self {
        match value {
            StoredParticipant::Id(id) => Self { id, name: None },
            StoredParticipant::Named { id, name } => Self { id, name },
        }
    }
}

impl From<Participant> for StoredParticipant {
    fn from(value: Participant) -> Self {
        match value.name {
            None => StoredParticipant::Id(value.id),
            Some(name) => StoredParticipant::Named {
                id: value.id,
                name: Some(name),
            },
        }
    }
}

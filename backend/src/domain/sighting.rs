//! Bird sightings.
//!
//! A sighting belongs to one user and one bird. Its location reference is
//! optional; a sighting without one is "unplaced".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BirdId, LocationId, UserId};

/// Maximum length of a sighting note in characters.
pub const SIGHTING_NOTE_MAX: usize = 150;

/// Validation errors for sighting input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SightingValidationError {
    #[error("sighting note must be at most {max} characters")]
    NoteTooLong { max: usize },
}

/// Sighting identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SightingId(Uuid);

impl SightingId {
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Free-text note attached to a sighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SightingNote(String);

impl SightingNote {
    /// Validate a note, counting characters rather than bytes.
    pub fn new(raw: impl Into<String>) -> Result<Self, SightingValidationError> {
        let note = raw.into();
        if note.chars().count() > SIGHTING_NOTE_MAX {
            return Err(SightingValidationError::NoteTooLong {
                max: SIGHTING_NOTE_MAX,
            });
        }
        Ok(Self(note))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for SightingNote {
    type Error = SightingValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SightingNote> for String {
    fn from(value: SightingNote) -> Self {
        value.0
    }
}

/// A user's record of seeing a bird.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub id: SightingId,
    pub user_id: UserId,
    pub bird_id: BirdId,
    pub location_id: Option<LocationId>,
    pub sighted_on: NaiveDate,
    pub note: Option<SightingNote>,
}

impl Sighting {
    /// Whether the sighting has no location reference.
    pub fn is_unplaced(&self) -> bool {
        self.location_id.is_none()
    }
}

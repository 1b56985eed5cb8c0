//! Named user locations.
//!
//! A location is identified for upsert purposes by `(user_id, name)`; the
//! UUID is what sightings reference.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Maximum length of a location name in characters.
pub const LOCATION_NAME_MAX: usize = 100;

/// Validation errors for location input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationValidationError {
    #[error("location name must not be empty")]
    EmptyName,
    #[error("location name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("latitude must be within [-90, 90], got {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be within [-180, 180], got {0}")]
    LongitudeOutOfRange(f64),
}

/// Location identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(Uuid);

impl LocationId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh identifier for a new row.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trimmed, non-empty location name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationName(String);

impl LocationName {
    /// Validate a location name, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, LocationValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LocationValidationError::EmptyName);
        }
        if trimmed.chars().count() > LOCATION_NAME_MAX {
            return Err(LocationValidationError::NameTooLong {
                max: LOCATION_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for LocationName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for LocationName {
    type Error = LocationValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocationName> for String {
    fn from(value: LocationName) -> Self {
        value.0
    }
}

/// WGS84 latitude/longitude pair.
///
/// ## Invariants
/// - `latitude` is finite and within `[-90, 90]`.
/// - `longitude` is finite and within `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate a coordinate pair.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationValidationError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Validated input for location upserts and updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDraft {
    pub name: LocationName,
    pub coordinates: Coordinates,
}

impl LocationDraft {
    /// Validate raw name and coordinates.
    ///
    /// # Examples
    /// ```
    /// use birdwatch::domain::LocationDraft;
    ///
    /// let draft = LocationDraft::new("  Park ", 51.5, -0.12).expect("valid draft");
    /// assert_eq!(draft.name.as_str(), "Park");
    /// assert!(LocationDraft::new("Park", 91.0, 0.0).is_err());
    /// ```
    pub fn new(
        name: impl AsRef<str>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, LocationValidationError> {
        Ok(Self {
            name: LocationName::new(name)?,
            coordinates: Coordinates::new(latitude, longitude)?,
        })
    }
}

/// Persisted location owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub user_id: UserId,
    pub name: LocationName,
    pub coordinates: Coordinates,
}

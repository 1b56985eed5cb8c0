//! Bird reference data.
//!
//! Birds are bulk loaded once and never mutated by the core. Identifiers form
//! a contiguous range `1..=N`, which the rotation relies on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Positive bird identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct BirdId(i32);

/// Validation errors for bird reference data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BirdValidationError {
    #[error("bird id must be positive, got {0}")]
    NonPositiveId(i32),
    #[error("unknown rarity '{0}'")]
    UnknownRarity(String),
}

impl BirdId {
    /// Validate a raw identifier.
    pub fn new(value: i32) -> Result<Self, BirdValidationError> {
        if value < 1 {
            return Err(BirdValidationError::NonPositiveId(value));
        }
        Ok(Self(value))
    }

    /// Raw identifier value.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for BirdId {
    type Error = BirdValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BirdId> for i32 {
    fn from(value: BirdId) -> Self {
        value.0
    }
}

impl fmt::Display for BirdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a bird is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
        }
    }
}

impl FromStr for Rarity {
    type Err = BirdValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "uncommon" => Ok(Self::Uncommon),
            "rare" => Ok(Self::Rare),
            _ => Err(BirdValidationError::UnknownRarity(value.to_owned())),
        }
    }
}

/// Credit for a bird's illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttribution {
    pub url: String,
    pub credit: Option<String>,
}

/// Bird reference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bird {
    pub id: BirdId,
    pub common_name: String,
    pub scientific_name: String,
    pub family: String,
    pub rarity: Rarity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttribution>,
}

//! Stop identifier and stop types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid stop identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// A stable, unique public-transit stop identifier.
///
/// Identifiers are non-empty strings without leading or trailing whitespace.
/// They order lexicographically, which is what the ranker uses as its final
/// tie-break key.
///
/// # Examples
///
/// ```
/// use meetup_server::domain::StopId;
///
/// let andel = StopId::parse("Anděl").unwrap();
/// assert_eq!(andel.as_str(), "Anděl");
///
/// // Surrounding whitespace is trimmed
/// assert_eq!(StopId::parse("  Anděl ").unwrap(), andel);
///
/// // Blank ids are rejected
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopId(String);

impl StopId {
    /// Parse a stop id, trimming surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(InvalidStopId {
                reason: "must not contain control characters",
            });
        }
        Ok(StopId(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StopId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StopId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StopId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Error returned when stop coordinates are out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("stop {id} has invalid coordinates ({lat}, {lon})")]
pub struct InvalidCoordinates {
    pub id: StopId,
    pub lat: f64,
    pub lon: f64,
}

/// A public-transit stop. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    id: StopId,
    name: String,
    lat: f64,
    lon: f64,
}

impl Stop {
    /// Create a stop, validating its coordinates.
    pub fn new(
        id: StopId,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Result<Self, InvalidCoordinates> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return Err(InvalidCoordinates { id, lat, lon });
        }
        Ok(Self {
            id,
            name: name.into(),
            lat,
            lon,
        })
    }

    pub fn id(&self) -> &StopId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

//! Hotel catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a hotel in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotelId(String);

impl HotelId {
    /// Wrap a raw hotel identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HotelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A hotel as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    /// Catalog id.
    pub id: HotelId,
    /// Display name.
    pub name: String,
    /// Marketing description.
    pub description: String,
    /// City and country.
    pub location: String,
}

impl Hotel {
    /// Create a hotel entry.
    pub fn new(
        id: HotelId,
        name: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            location: location.into(),
        }
    }
}

/// The hotels seeded into an empty catalog at startup.
pub fn sample_hotels() -> Vec<Hotel> {
    vec![
        Hotel::new(
            HotelId::generate(),
            "Grand Luxury Hotel",
            "A beautiful hotel with excellent amenities and breathtaking views.",
            "Paris, France",
        ),
        Hotel::new(
            HotelId::generate(),
            "City Comfort Inn",
            "Perfect for business travelers, located in the heart of downtown.",
            "New York, USA",
        ),
        Hotel::new(
            HotelId::generate(),
            "Beachside Resort",
            "Enjoy the serene seaside views and luxurious facilities at our resort.",
            "Malibu, USA",
        ),
    ]
}

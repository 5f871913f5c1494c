//! Cat and breed data model.
//!
//! A [`Cat`] carries two identities:
//!
//! - `id`: the identifier the remote API gave it. It may be missing, and the
//!   same value may show up on more than one page.
//! - `uuid`: a [`CatId`] minted locally the first time the record is decoded.
//!   It is serialized into the cache and never regenerated, so it is the key
//!   used by the favorite set, the cache and de-duplication.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Surrogate identity of a cat.
///
/// Opaque, locally generated and stable across cache round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatId(Uuid);

impl CatId {
    /// Mint a fresh surrogate identity (UUID v4)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. one read back from the cache
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Breed weight ranges as reported by the API, e.g. `"7 - 10"`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreedWeight {
    /// Weight range in pounds
    #[serde(default)]
    pub imperial: Option<String>,
    /// Weight range in kilograms
    #[serde(default)]
    pub metric: Option<String>,
}

/// Descriptive metadata attached to a cat
///
/// Field names follow the remote API's snake_case JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
    /// Breed identifier (e.g. `"siam"`)
    pub id: String,
    /// Display name (e.g. `"Siamese"`)
    pub name: String,
    /// Country or region of origin
    #[serde(default)]
    pub origin: Option<String>,
    /// Comma-separated temperament keywords
    #[serde(default)]
    pub temperament: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Free-text lifespan range in years, e.g. `"12 - 15"`
    #[serde(default)]
    pub life_span: Option<String>,
    /// Wikipedia article
    #[serde(default)]
    pub wikipedia_url: Option<String>,
    /// ISO country code of the origin
    #[serde(default)]
    pub country_code: Option<String>,
    /// Weight ranges
    #[serde(default)]
    pub weight: Option<BreedWeight>,
}

impl Breed {
    /// Breed with only the required fields set
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origin: None,
            temperament: None,
            description: None,
            life_span: None,
            wikipedia_url: None,
            country_code: None,
            weight: None,
        }
    }

    /// Set the origin
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the temperament
    #[must_use]
    pub fn with_temperament(mut self, temperament: impl Into<String>) -> Self {
        self.temperament = Some(temperament.into());
        self
    }

    /// Set the lifespan text
    #[must_use]
    pub fn with_life_span(mut self, life_span: impl Into<String>) -> Self {
        self.life_span = Some(life_span.into());
        self
    }
}

/// A remote-sourced cat image record with optional breed metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cat {
    /// Surrogate identity; minted on decode when the payload has none
    #[serde(default)]
    pub uuid: CatId,
    /// External identifier from the API
    #[serde(default)]
    pub id: Option<String>,
    /// Image URL
    #[serde(default)]
    pub url: Option<String>,
    /// Image width in pixels
    #[serde(default)]
    pub width: Option<u32>,
    /// Image height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    /// Breeds, in API order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub breeds: Vec<Breed>,
    /// Derived favorite flag; the favorite set is authoritative
    #[serde(default, skip_serializing)]
    pub is_favorite: bool,
}

impl Cat {
    /// New cat with a fresh surrogate identity
    #[must_use]
    pub fn new(id: Option<String>, url: Option<String>) -> Self {
        Self {
            uuid: CatId::new(),
            id,
            url,
            width: None,
            height: None,
            breeds: Vec::new(),
            is_favorite: false,
        }
    }

    /// Replace the surrogate identity
    #[must_use]
    pub const fn with_uuid(mut self, uuid: CatId) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the image dimensions
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Append a breed
    #[must_use]
    pub fn with_breed(mut self, breed: Breed) -> Self {
        self.breeds.push(breed);
        self
    }

    /// First breed, the one used for display, search and statistics
    #[must_use]
    pub fn first_breed(&self) -> Option<&Breed> {
        self.breeds.first()
    }

    /// Name shown in lists: the first breed's name, or `"Unknown"`
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_breed()
            .map(|breed| breed.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown")
    }
}

/// The API sends `"breeds": null` for some images
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Breed>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Breed>>::deserialize(deserializer)?.unwrap_or_default())
}

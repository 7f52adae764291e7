use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::numeric::parse_numeric;

// ---------------------------------------------------------------------------
// Catalog rows
// ---------------------------------------------------------------------------

/// A hotel identity row as the catalog returns it, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelRow {
    pub id: i64,
    pub display_name: String,
}

/// Postal address of a hotel. Every line is optional in the attribute store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub address_city: Option<String>,
    pub address_zip: Option<String>,
    pub address_country: Option<String>,
}

/// Typed projection of a hotel's key/value attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotelMetadata {
    pub address: Address,
    pub geo_lat: Option<String>,
    pub geo_lng: Option<String>,
    pub cover_image: Option<String>,
    pub phone: Option<String>,
}

/// Rounded mean and count of a hotel's review ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// `None` when the hotel has no rated reviews.
    pub rating: Option<i64>,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A bookable room, fully loaded from its post row and attributes.
///
/// Attribute-backed fields are optional: a room whose attribute row is missing
/// (or holds something that is not a number) simply lacks that value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub hotel_id: i64,
    pub title: Option<String>,
    pub surface: Option<f64>,
    pub price: Option<f64>,
    pub bed_rooms_count: Option<i64>,
    pub bath_rooms_count: Option<i64>,
    #[serde(rename = "type")]
    pub room_type: Option<String>,
    pub image_url: Option<String>,
}

impl Room {
    /// Price truncated toward zero. Price comparisons always go through this.
    pub fn price_units(&self) -> Option<i64> {
        self.price.map(|p| p.trunc() as i64)
    }
}

/// A hotel as returned by a search: catalog row plus enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: i64,
    pub name: String,
    pub address: Address,
    pub geo_lat: Option<String>,
    pub geo_lng: Option<String>,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<i64>,
    pub rating_count: i64,
    pub cheapest_room: Option<Room>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Hotel {
    pub fn new(row: HotelRow) -> Self {
        Self {
            id: row.id,
            name: row.display_name,
            address: Address::default(),
            geo_lat: None,
            geo_lng: None,
            image_url: None,
            phone: None,
            rating: None,
            rating_count: 0,
            cheapest_room: None,
            distance: None,
        }
    }

    pub fn apply_metadata(&mut self, meta: HotelMetadata) {
        self.address = meta.address;
        self.geo_lat = meta.geo_lat;
        self.geo_lng = meta.geo_lng;
        self.image_url = meta.cover_image;
        self.phone = meta.phone;
    }

    pub fn apply_reviews(&mut self, reviews: ReviewSummary) {
        self.rating = reviews.rating;
        self.rating_count = reviews.count;
    }

    /// Parsed (lat, lng) if both stored values are usable decimals.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = parse_numeric(self.geo_lat.as_deref()?)?;
        let lng = parse_numeric(self.geo_lng.as_deref()?)?;
        Some((lat, lng))
    }
}

// ---------------------------------------------------------------------------
// Search filter
// ---------------------------------------------------------------------------

/// Inclusive range where either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Caller-supplied search criteria. Every field is optional and unknown
/// fields are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    /// Free text. Accepted for compatibility, not used for matching.
    pub search: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub lng: Option<f64>,
    /// Maximum distance from (`lat`, `lng`) in kilometres.
    #[serde(deserialize_with = "number_or_string")]
    pub distance: Option<f64>,
    pub price: Bounds<f64>,
    pub surface: Bounds<f64>,
    /// Minimum bedroom count.
    pub rooms: Option<i64>,
    /// Minimum bathroom count.
    #[serde(rename = "bathRooms", alias = "bath_rooms")]
    pub bath_rooms: Option<i64>,
    /// Allowed room types. Empty means every type is allowed.
    pub types: BTreeSet<String>,
}

impl SearchFilter {
    /// The reference point, when both coordinates were supplied.
    pub fn reference_point(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

/// Accepts `12.5`, `"12.5"`, `""` and `null` for an optional float.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
    }
}

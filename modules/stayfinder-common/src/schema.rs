use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Table prefix and attribute key names of the backing store.
///
/// Defaults match a stock WordPress install. Loaded from TOML when the
/// deployment renames anything.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub table_prefix: String,
    pub hotel_meta: HotelMetaKeys,
    pub room_meta: RoomMetaKeys,
    pub review: ReviewKeys,
}

/// Attribute keys projected into `HotelMetadata`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotelMetaKeys {
    pub address_1: String,
    pub address_2: String,
    pub address_city: String,
    pub address_zip: String,
    pub address_country: String,
    pub geo_lat: String,
    pub geo_lng: String,
    pub cover_image: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomMetaKeys {
    pub post_type: String,
    pub surface: String,
    pub price: String,
    pub bed_rooms: String,
    pub bath_rooms: String,
    pub room_type: String,
    pub cover_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewKeys {
    pub post_type: String,
    pub rating: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            table_prefix: "wp_".to_string(),
            hotel_meta: HotelMetaKeys::default(),
            room_meta: RoomMetaKeys::default(),
            review: ReviewKeys::default(),
        }
    }
}

impl Default for HotelMetaKeys {
    fn default() -> Self {
        Self {
            address_1: "address_1".to_string(),
            address_2: "address_2".to_string(),
            address_city: "address_city".to_string(),
            address_zip: "address_zip".to_string(),
            address_country: "address_country".to_string(),
            geo_lat: "geo_lat".to_string(),
            geo_lng: "geo_lng".to_string(),
            cover_image: "coverImage".to_string(),
            phone: "phone".to_string(),
        }
    }
}

impl Default for RoomMetaKeys {
    fn default() -> Self {
        Self {
            post_type: "room".to_string(),
            surface: "surface".to_string(),
            price: "price".to_string(),
            bed_rooms: "bedrooms_count".to_string(),
            bath_rooms: "bathrooms_count".to_string(),
            room_type: "type".to_string(),
            cover_image: "coverImage".to_string(),
        }
    }
}

impl Default for ReviewKeys {
    fn default() -> Self {
        Self {
            post_type: "review".to_string(),
            rating: "rating".to_string(),
        }
    }
}

impl HotelMetaKeys {
    /// Every key, in a fixed order, for batched lookups.
    pub fn all(&self) -> [&str; 9] {
        [
            &self.address_1,
            &self.address_2,
            &self.address_city,
            &self.address_zip,
            &self.address_country,
            &self.geo_lat,
            &self.geo_lng,
            &self.cover_image,
            &self.phone,
        ]
    }
}

impl SchemaConfig {
    /// Load and parse a TOML schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse schema file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let schema: Self = toml::from_str(content)?;
        anyhow::ensure!(
            schema
                .table_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "table_prefix may only contain ASCII letters, digits and underscores"
        );
        Ok(schema)
    }

    /// Fully prefixed table name, e.g. `wp_postmeta`.
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.table_prefix, name)
    }
}

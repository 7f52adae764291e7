// Read-only store contract for hotel search.
//
// HotelStore is the only seam between the search pipeline and persistence.
// PgHotelStore implements it over the WordPress-style tables; MemoryStore
// implements it over in-process vectors for tests and demos.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use stayfinder_common::{Bounds, HotelRow, ReviewSummary, Room, SearchFilter, StoreResult};

/// Room predicates a store may push down into its candidate query.
///
/// Push-down only narrows the candidate set. The pipeline re-checks every
/// loaded room with [`RoomQuery::matches`], so a store is free to ignore any
/// of these fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomQuery {
    pub surface: Bounds<f64>,
    /// Compared against the price truncated toward zero.
    pub price: Bounds<f64>,
    pub min_bed_rooms: Option<i64>,
    pub min_bath_rooms: Option<i64>,
    /// Empty means every type is allowed.
    pub types: BTreeSet<String>,
}

impl RoomQuery {
    pub fn from_filter(filter: &SearchFilter) -> Self {
        Self {
            surface: filter.surface,
            price: filter.price,
            min_bed_rooms: filter.rooms,
            min_bath_rooms: filter.bath_rooms,
            types: filter.types.clone(),
        }
    }

    /// Whether a loaded room satisfies every predicate.
    ///
    /// A room without a price never matches. Any other missing attribute only
    /// fails the room when a predicate needs it.
    pub fn matches(&self, room: &Room) -> bool {
        let Some(price) = room.price_units() else {
            return false;
        };
        if !self.price.contains(price as f64) {
            return false;
        }

        if !self.surface.is_unbounded() {
            match room.surface {
                Some(surface) if self.surface.contains(surface) => {}
                _ => return false,
            }
        }

        if let Some(min) = self.min_bed_rooms {
            if room.bed_rooms_count.is_none_or(|n| n < min) {
                return false;
            }
        }

        if let Some(min) = self.min_bath_rooms {
            if room.bath_rooms_count.is_none_or(|n| n < min) {
                return false;
            }
        }

        if !self.types.is_empty() {
            match &room.room_type {
                Some(t) if self.types.contains(t) => {}
                _ => return false,
            }
        }

        true
    }
}

#[async_trait]
pub trait HotelStore: Send + Sync {
    /// Every hotel row, unfiltered, in the store's own order.
    async fn hotels(&self) -> StoreResult<Vec<HotelRow>>;

    /// One attribute of a hotel, `None` when the row is absent.
    async fn attribute(&self, entity_id: i64, key: &str) -> StoreResult<Option<String>>;

    /// Several attributes of a hotel at once. Absent keys are simply missing
    /// from the map. Defaults to one `attribute` call per key.
    async fn attributes(
        &self,
        entity_id: i64,
        keys: &[&str],
    ) -> StoreResult<HashMap<String, String>> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.attribute(entity_id, key).await? {
                values.insert((*key).to_string(), value);
            }
        }
        Ok(values)
    }

    /// Rounded mean rating and count over the hotel's reviews.
    async fn review_summary(&self, hotel_id: i64) -> StoreResult<ReviewSummary>;

    /// Ids of the hotel's rooms that may match `query`, cheapest first.
    async fn room_candidates(&self, hotel_id: i64, query: &RoomQuery) -> StoreResult<Vec<i64>>;

    /// Fully load one room. `None` if it no longer exists.
    async fn room(&self, room_id: i64) -> StoreResult<Option<Room>>;
}

//! In-memory `HotelStore` for tests and demos.
//!
//! Mirrors the table layout of the real store: hotel rows with key/value
//! attributes, and posts (rooms, reviews) with their own attributes.
//! Attribute lookups return the first value inserted for a key.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use stayfinder_common::{
    parse_numeric, HotelRow, ReviewSummary, Room, SchemaConfig, StoreError, StoreResult,
};

use crate::rooms::room_from_attributes;
use crate::store::{HotelStore, RoomQuery};

#[derive(Debug, Clone)]
struct Post {
    id: i64,
    author: i64,
    post_type: String,
    title: Option<String>,
}

/// Which operation a `MemoryStore` should fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Catalog,
    Reviews(i64),
    Rooms(i64),
}

#[derive(Default)]
pub struct MemoryStore {
    schema: SchemaConfig,
    users: Vec<HotelRow>,
    user_meta: Vec<(i64, String, String)>,
    posts: Vec<Post>,
    post_meta: Vec<(i64, String, String)>,
    push_down: bool,
    faults: HashSet<Fault>,
    room_loads: AtomicUsize,
}

impl MemoryStore {
    /// Empty store with default schema keys and predicate push-down on.
    pub fn new() -> Self {
        Self {
            push_down: true,
            ..Default::default()
        }
    }

    /// Return every room of a hotel as a candidate, in insertion order,
    /// instead of applying the query.
    pub fn without_push_down(mut self) -> Self {
        self.push_down = false;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.insert(fault);
        self
    }

    pub fn with_hotel(mut self, id: i64, name: &str) -> Self {
        self.users.push(HotelRow {
            id,
            display_name: name.to_string(),
        });
        self
    }

    pub fn with_hotel_meta(mut self, hotel_id: i64, key: &str, value: &str) -> Self {
        self.user_meta.push((hotel_id, key.to_string(), value.to_string()));
        self
    }

    /// Set the hotel's `geo_lat` / `geo_lng` attributes.
    pub fn with_hotel_location(self, hotel_id: i64, lat: f64, lng: f64) -> Self {
        let (lat_key, lng_key) = (
            self.schema.hotel_meta.geo_lat.clone(),
            self.schema.hotel_meta.geo_lng.clone(),
        );
        self.with_hotel_meta(hotel_id, &lat_key, &lat.to_string())
            .with_hotel_meta(hotel_id, &lng_key, &lng.to_string())
    }

    /// Add a post of any type with raw attributes.
    pub fn with_post(
        mut self,
        id: i64,
        author: i64,
        post_type: &str,
        title: Option<&str>,
        attrs: &[(&str, &str)],
    ) -> Self {
        self.posts.push(Post {
            id,
            author,
            post_type: post_type.to_string(),
            title: title.map(String::from),
        });
        for (key, value) in attrs {
            self.post_meta.push((id, key.to_string(), value.to_string()));
        }
        self
    }

    /// Add a room with the usual attributes. Use `with_post` for rooms that
    /// miss some of them.
    pub fn with_room(
        self,
        id: i64,
        hotel_id: i64,
        price: f64,
        surface: f64,
        bed_rooms: i64,
        bath_rooms: i64,
        room_type: &str,
    ) -> Self {
        let keys = self.schema.room_meta.clone();
        let (price, surface, bed_rooms, bath_rooms) = (
            price.to_string(),
            surface.to_string(),
            bed_rooms.to_string(),
            bath_rooms.to_string(),
        );
        self.with_post(
            id,
            hotel_id,
            &keys.post_type,
            None,
            &[
                (keys.price.as_str(), price.as_str()),
                (keys.surface.as_str(), surface.as_str()),
                (keys.bed_rooms.as_str(), bed_rooms.as_str()),
                (keys.bath_rooms.as_str(), bath_rooms.as_str()),
                (keys.room_type.as_str(), room_type),
            ],
        )
    }

    pub fn with_review(self, id: i64, hotel_id: i64, rating: &str) -> Self {
        let keys = self.schema.review.clone();
        self.with_post(id, hotel_id, &keys.post_type, None, &[(keys.rating.as_str(), rating)])
    }

    /// Number of full room loads served so far.
    pub fn room_loads(&self) -> usize {
        self.room_loads.load(Ordering::Relaxed)
    }

    fn check(&self, fault: Fault) -> StoreResult<()> {
        if self.faults.contains(&fault) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn post_attrs(&self, post_id: i64) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        for (id, key, value) in &self.post_meta {
            if *id == post_id {
                attrs.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        attrs
    }

    fn load_room(&self, post: &Post) -> Room {
        room_from_attributes(
            post.id,
            post.author,
            post.title.clone(),
            &self.post_attrs(post.id),
            &self.schema.room_meta,
        )
    }

    fn rooms_of(&self, hotel_id: i64) -> impl Iterator<Item = &Post> {
        let room_type = &self.schema.room_meta.post_type;
        self.posts
            .iter()
            .filter(move |p| p.author == hotel_id && &p.post_type == room_type)
    }
}

#[async_trait]
impl HotelStore for MemoryStore {
    async fn hotels(&self) -> StoreResult<Vec<HotelRow>> {
        self.check(Fault::Catalog)?;
        Ok(self.users.clone())
    }

    async fn attribute(&self, entity_id: i64, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .user_meta
            .iter()
            .find(|(id, k, _)| *id == entity_id && k == key)
            .map(|(_, _, v)| v.clone()))
    }

    async fn review_summary(&self, hotel_id: i64) -> StoreResult<ReviewSummary> {
        self.check(Fault::Reviews(hotel_id))?;

        // Every rating row of every review counts, not just the first per review.
        let review = &self.schema.review;
        let reviews: HashSet<i64> = self
            .posts
            .iter()
            .filter(|p| p.author == hotel_id && p.post_type == review.post_type)
            .map(|p| p.id)
            .collect();
        let ratings: Vec<f64> = self
            .post_meta
            .iter()
            .filter(|(id, key, _)| reviews.contains(id) && *key == review.rating)
            .filter_map(|(_, _, value)| parse_numeric(value))
            .collect();

        if ratings.is_empty() {
            return Ok(ReviewSummary::default());
        }
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        Ok(ReviewSummary {
            rating: Some(mean.round() as i64),
            count: ratings.len() as i64,
        })
    }

    async fn room_candidates(&self, hotel_id: i64, query: &RoomQuery) -> StoreResult<Vec<i64>> {
        self.check(Fault::Rooms(hotel_id))?;

        if !self.push_down {
            return Ok(self.rooms_of(hotel_id).map(|p| p.id).collect());
        }

        let mut matching: Vec<(i64, i64)> = self
            .rooms_of(hotel_id)
            .map(|p| self.load_room(p))
            .filter(|room| query.matches(room))
            .filter_map(|room| Some((room.price_units()?, room.id)))
            .collect();
        matching.sort_unstable();
        Ok(matching.into_iter().map(|(_, id)| id).collect())
    }

    async fn room(&self, room_id: i64) -> StoreResult<Option<Room>> {
        self.room_loads.fetch_add(1, Ordering::Relaxed);
        let room_type = &self.schema.room_meta.post_type;
        Ok(self
            .posts
            .iter()
            .find(|p| p.id == room_id && &p.post_type == room_type)
            .map(|p| self.load_room(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reviews_round_half_away_from_zero() {
        let store = MemoryStore::new()
            .with_hotel(1, "A")
            .with_review(10, 1, "4")
            .with_review(11, 1, "5")
            .with_review(12, 1, "not a number");

        let summary = store.review_summary(1).await.unwrap();
        assert_eq!(summary, ReviewSummary { rating: Some(5), count: 2 });

        let none = store.review_summary(2).await.unwrap();
        assert_eq!(none, ReviewSummary { rating: None, count: 0 });
    }

    #[tokio::test]
    async fn every_rating_row_of_a_review_counts() {
        let store = MemoryStore::new()
            .with_hotel(1, "A")
            .with_post(10, 1, "review", None, &[("rating", "5"), ("rating", "2")])
            .with_review(11, 1, "4")
            .with_review(12, 1, "1e400");

        let summary = store.review_summary(1).await.unwrap();
        assert_eq!(summary, ReviewSummary { rating: Some(4), count: 3 });
    }

    #[tokio::test]
    async fn first_attribute_value_wins() {
        let store = MemoryStore::new()
            .with_hotel(1, "A")
            .with_hotel_meta(1, "phone", "+33 1")
            .with_hotel_meta(1, "phone", "+33 2");

        assert_eq!(store.attribute(1, "phone").await.unwrap().as_deref(), Some("+33 1"));
        assert_eq!(store.attribute(1, "address_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn push_down_orders_by_truncated_price_then_id() {
        let store = MemoryStore::new()
            .with_hotel(1, "A")
            .with_room(5, 1, 80.7, 20.0, 1, 1, "double")
            .with_room(3, 1, 80.2, 20.0, 1, 1, "double")
            .with_room(4, 1, 60.0, 20.0, 1, 1, "single")
            .with_room(9, 2, 10.0, 20.0, 1, 1, "double");

        let ids = store.room_candidates(1, &RoomQuery::default()).await.unwrap();
        assert_eq!(ids, vec![4, 3, 5]);
    }

    #[tokio::test]
    async fn faults_surface_as_store_errors() {
        let store = MemoryStore::new().with_hotel(1, "A").with_fault(Fault::Catalog);
        assert!(matches!(store.hotels().await, Err(StoreError::Database(_))));
    }
}

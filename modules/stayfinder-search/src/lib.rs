//! Hotel search over a key/value attribute store.
//!
//! `HotelSearch::list` fetches the hotel catalog, enriches every hotel
//! concurrently (metadata, review score, cheapest matching room, distance)
//! and returns the survivors in catalog order. Persistence sits behind the
//! `HotelStore` trait: `PgHotelStore` for Postgres, `MemoryStore` for tests.

pub mod geo;
pub mod memory;
pub mod metadata;
pub mod postgres;
pub mod rooms;
pub mod search;
pub mod store;
pub mod timings;

pub use geo::distance_km;
pub use memory::{Fault, MemoryStore};
pub use postgres::PgHotelStore;
pub use rooms::select_cheapest_room;
pub use search::HotelSearch;
pub use store::{HotelStore, RoomQuery};
pub use timings::{NoopRecorder, Stage, StageRecorder, StageStat, StageTimings};

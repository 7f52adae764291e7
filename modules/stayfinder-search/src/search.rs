//! Hotel search orchestration.
//!
//! Catalog fetch → concurrent per-hotel enrichment → ordered result.
//! A hotel that ends in `NoMatch` is dropped; a `StoreError` anywhere aborts
//! the whole search.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use stayfinder_common::{Hotel, HotelRow, Matched, NoMatch, SchemaConfig, SearchFilter, StoreResult};

use crate::geo::distance_km;
use crate::metadata::resolve_metadata;
use crate::rooms::select_cheapest_room;
use crate::store::{HotelStore, RoomQuery};
use crate::timings::{timed, NoopRecorder, Stage, StageRecorder};

const DEFAULT_CONCURRENCY: usize = 5;

/// Search service. Holds the store and the knobs; cheap to clone.
#[derive(Clone, TypedBuilder)]
pub struct HotelSearch {
    store: Arc<dyn HotelStore>,
    #[builder(default)]
    schema: SchemaConfig,
    #[builder(default = Arc::new(NoopRecorder))]
    recorder: Arc<dyn StageRecorder>,
    /// Hotels enriched at once. Size this to the store's connection pool.
    #[builder(default = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

/// Counters for one `list` call, logged when it finishes.
#[derive(Debug, Default)]
struct SearchStats {
    catalog: usize,
    kept: usize,
    excluded: BTreeMap<&'static str, usize>,
}

impl HotelSearch {
    /// Hotels matching `filter`, each with its cheapest qualifying room, in
    /// catalog order.
    #[tracing::instrument(skip(self, filter), fields(concurrency = self.concurrency))]
    pub async fn list(&self, filter: &SearchFilter) -> StoreResult<Vec<Hotel>> {
        let start = Instant::now();
        let rows = timed(&*self.recorder, Stage::Catalog, self.store.hotels()).await?;

        let mut stats = SearchStats {
            catalog: rows.len(),
            ..Default::default()
        };

        let query = RoomQuery::from_filter(filter);
        let query = &query;

        let mut outcomes: Vec<(usize, Matched<Hotel>)> =
            stream::iter(rows.into_iter().enumerate().map(move |(index, row)| async move {
                self.enrich(row, filter, query)
                    .await
                    .map(|outcome| (index, outcome))
            }))
            .buffer_unordered(self.concurrency.max(1))
            .try_collect()
            .await?;

        outcomes.sort_unstable_by_key(|(index, _)| *index);

        let mut hotels = Vec::with_capacity(outcomes.len());
        for (_, outcome) in outcomes {
            match outcome {
                Ok(hotel) => hotels.push(hotel),
                Err(no_match) => *stats.excluded.entry(no_match.reason()).or_default() += 1,
            }
        }
        stats.kept = hotels.len();

        info!(
            catalog = stats.catalog,
            kept = stats.kept,
            excluded = ?stats.excluded,
            took_ms = start.elapsed().as_millis() as u64,
            "Hotel search complete"
        );

        Ok(hotels)
    }

    /// Build one hotel from its catalog row. `Ok(Err(_))` means the hotel is
    /// excluded from the result.
    async fn enrich(
        &self,
        row: HotelRow,
        filter: &SearchFilter,
        query: &RoomQuery,
    ) -> StoreResult<Matched<Hotel>> {
        let start = Instant::now();
        let store = &*self.store;
        let recorder = &*self.recorder;

        let mut hotel = Hotel::new(row);

        let meta = timed(
            recorder,
            Stage::Metadata,
            resolve_metadata(store, hotel.id, &self.schema.hotel_meta),
        )
        .await?;
        hotel.apply_metadata(meta);

        let reviews = timed(recorder, Stage::Reviews, store.review_summary(hotel.id)).await?;
        hotel.apply_reviews(reviews);

        let outcome = timed(
            recorder,
            Stage::CheapestRoom,
            select_cheapest_room(store, hotel.id, query),
        )
        .await?
        .and_then(|room| {
            hotel.cheapest_room = Some(room);
            apply_distance(&mut hotel, filter)
        });

        recorder.record(Stage::Enrichment, start.elapsed());

        match outcome {
            Ok(()) => Ok(Ok(hotel)),
            Err(no_match) => {
                debug!(hotel_id = hotel.id, reason = no_match.reason(), "Hotel excluded: {no_match}");
                Ok(Err(no_match))
            }
        }
    }
}

/// Annotate the distance from the filter's reference point and enforce the
/// maximum distance when one was given.
fn apply_distance(hotel: &mut Hotel, filter: &SearchFilter) -> Matched<()> {
    let Some((ref_lat, ref_lng)) = filter.reference_point() else {
        return Ok(());
    };

    let Some((lat, lng)) = hotel.coordinates() else {
        return match filter.distance {
            Some(_) => Err(NoMatch::MissingCoordinates),
            None => Ok(()),
        };
    };

    let distance = distance_km(ref_lat, ref_lng, lat, lng);
    hotel.distance = Some(distance);

    match filter.distance {
        Some(max_km) if distance > max_km => Err(NoMatch::OutOfRange {
            distance_km: distance,
            max_km,
        }),
        _ => Ok(()),
    }
}

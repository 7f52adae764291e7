//! Cheapest-room selection.

use std::collections::HashMap;

use tracing::debug;

use stayfinder_common::schema::RoomMetaKeys;
use stayfinder_common::{parse_numeric, Matched, NoMatch, Room, StoreResult};

use crate::store::{HotelStore, RoomQuery};

/// Find the cheapest room of `hotel_id` that satisfies `query`.
///
/// Candidates come from the store (which may have pushed the predicates
/// down); each one is loaded in full and checked again before it can win.
pub async fn select_cheapest_room(
    store: &dyn HotelStore,
    hotel_id: i64,
    query: &RoomQuery,
) -> StoreResult<Matched<Room>> {
    let candidate_ids = store.room_candidates(hotel_id, query).await?;

    let mut rooms = Vec::with_capacity(candidate_ids.len());
    for room_id in candidate_ids {
        match store.room(room_id).await? {
            Some(room) if room.hotel_id == hotel_id => rooms.push(room),
            Some(room) => {
                debug!(hotel_id, room_id, owner = room.hotel_id, "Candidate room belongs to another hotel");
            }
            None => debug!(hotel_id, room_id, "Candidate room vanished before load"),
        }
    }

    Ok(pick_cheapest(rooms, query).ok_or(NoMatch::NoQualifyingRoom))
}

/// Lowest truncated price among the rooms matching `query`. The first room
/// seen wins a tie.
pub fn pick_cheapest(rooms: impl IntoIterator<Item = Room>, query: &RoomQuery) -> Option<Room> {
    let mut cheapest: Option<(i64, Room)> = None;
    for room in rooms {
        if !query.matches(&room) {
            continue;
        }
        // matches() guarantees a price
        let Some(price) = room.price_units() else {
            continue;
        };
        if cheapest.as_ref().is_none_or(|(best, _)| price < *best) {
            cheapest = Some((price, room));
        }
    }
    cheapest.map(|(_, room)| room)
}

/// Build a room from its post columns and raw attribute values.
/// Values that are not numbers (see `parse_numeric`) load as `None`.
pub fn room_from_attributes(
    id: i64,
    hotel_id: i64,
    title: Option<String>,
    attrs: &HashMap<String, String>,
    keys: &RoomMetaKeys,
) -> Room {
    let number = |key: &str| attrs.get(key).and_then(|v| parse_numeric(v));

    Room {
        id,
        hotel_id,
        title,
        surface: number(&keys.surface),
        price: number(&keys.price),
        bed_rooms_count: number(&keys.bed_rooms).map(|n| n.trunc() as i64),
        bath_rooms_count: number(&keys.bath_rooms).map(|n| n.trunc() as i64),
        room_type: attrs.get(&keys.room_type).cloned(),
        image_url: attrs.get(&keys.cover_image).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(id: i64, price: f64) -> Room {
        Room {
            id,
            hotel_id: 1,
            title: None,
            surface: Some(25.0),
            price: Some(price),
            bed_rooms_count: Some(3),
            bath_rooms_count: Some(1),
            room_type: Some("double".into()),
            image_url: None,
        }
    }

    #[test]
    fn picks_lowest_price() {
        let rooms = vec![priced(1, 120.0), priced(2, 95.0), priced(3, 200.0)];
        let best = pick_cheapest(rooms, &RoomQuery::default()).unwrap();
        assert_eq!(best.id, 2);
        assert_eq!(best.price, Some(95.0));
    }

    #[test]
    fn first_seen_wins_on_truncated_tie() {
        let rooms = vec![priced(1, 80.9), priced(2, 80.1), priced(3, 80.0)];
        let best = pick_cheapest(rooms, &RoomQuery::default()).unwrap();
        assert_eq!(best.id, 1);
    }

    #[test]
    fn no_qualifying_room_is_none() {
        let rooms = vec![priced(1, 120.0), priced(2, 95.0)];
        let query = RoomQuery {
            min_bed_rooms: Some(5),
            ..Default::default()
        };
        assert!(pick_cheapest(rooms, &query).is_none());
    }

    #[test]
    fn skips_non_matching_cheaper_rooms() {
        let mut small = priced(1, 50.0);
        small.surface = Some(9.0);
        let rooms = vec![small, priced(2, 70.0)];
        let query = RoomQuery {
            surface: stayfinder_common::Bounds::new(Some(10.0), None),
            ..Default::default()
        };
        assert_eq!(pick_cheapest(rooms, &query).unwrap().id, 2);
    }

    #[test]
    fn unparsable_attributes_load_as_none() {
        let keys = RoomMetaKeys::default();
        let attrs = HashMap::from([
            ("surface".to_string(), "n/a".to_string()),
            ("price".to_string(), " 89.50 ".to_string()),
            ("bedrooms_count".to_string(), "2".to_string()),
            ("bathrooms_count".to_string(), "NaN".to_string()),
            ("type".to_string(), "suite".to_string()),
        ]);

        let room = room_from_attributes(4, 1, Some("Suite".into()), &attrs, &keys);
        assert_eq!(room.surface, None);
        assert_eq!(room.price, Some(89.5));
        assert_eq!(room.bed_rooms_count, Some(2));
        assert_eq!(room.bath_rooms_count, None);
        assert_eq!(room.room_type.as_deref(), Some("suite"));
        assert_eq!(room.image_url, None);
    }
}

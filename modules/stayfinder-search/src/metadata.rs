use std::collections::HashMap;

use stayfinder_common::schema::HotelMetaKeys;
use stayfinder_common::{Address, HotelMetadata, StoreResult};

use crate::store::HotelStore;

/// Resolve a hotel's address, geo and contact attributes in one batched
/// lookup. Missing attributes are `None`.
pub async fn resolve_metadata(
    store: &dyn HotelStore,
    hotel_id: i64,
    keys: &HotelMetaKeys,
) -> StoreResult<HotelMetadata> {
    let values = store.attributes(hotel_id, &keys.all()).await?;
    Ok(project(keys, values))
}

/// Map raw key/value pairs onto the typed metadata struct.
pub fn project(keys: &HotelMetaKeys, mut values: HashMap<String, String>) -> HotelMetadata {
    let mut take = |key: &str| values.remove(key);

    HotelMetadata {
        address: Address {
            address_1: take(&keys.address_1),
            address_2: take(&keys.address_2),
            address_city: take(&keys.address_city),
            address_zip: take(&keys.address_zip),
            address_country: take(&keys.address_country),
        },
        geo_lat: take(&keys.geo_lat),
        geo_lng: take(&keys.geo_lng),
        cover_image: take(&keys.cover_image),
        phone: take(&keys.phone),
    }
}

//! `HotelStore` over WordPress-style tables in Postgres.
//!
//! Hotels are rows of `{prefix}users` with attributes in `{prefix}usermeta`.
//! Rooms and reviews are rows of `{prefix}posts` (authored by the hotel) with
//! attributes in `{prefix}postmeta`. Attribute values are text; anything
//! compared numerically goes through `numeric_value`, which yields NULL for
//! text that is not a plain decimal number.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use stayfinder_common::numeric::{MAX_NUMERIC_LEN, NUMERIC_PATTERN};
use stayfinder_common::{Config, HotelRow, ReviewSummary, Room, SchemaConfig, StoreResult};

use crate::rooms::room_from_attributes;
use crate::store::{HotelStore, RoomQuery};

/// Smallest magnitude that rounds to infinity as an f64, rounded up to 60
/// significant digits. Shorter inputs compare against it exactly.
const F64_OVERFLOW: &str = "1.79769313486231580793728971405303415079934132710037826936174e308";

/// Largest magnitude that rounds to zero as an f64, rounded down to 60
/// significant digits.
const F64_UNDERFLOW: &str = "2.47032822920623272088284396434110686182529901307162382212792e-324";

#[derive(Clone)]
pub struct PgHotelStore {
    pool: PgPool,
    schema: SchemaConfig,
}

#[derive(sqlx::FromRow)]
struct RoomPostRow {
    id: i64,
    hotel_id: i64,
    title: Option<String>,
}

#[derive(sqlx::FromRow)]
struct MetaRow {
    meta_key: String,
    meta_value: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    rating: Option<i64>,
    count: i64,
}

impl PgHotelStore {
    pub fn new(pool: PgPool, schema: SchemaConfig) -> Self {
        Self { pool, schema }
    }

    /// Open a pool sized by `config` and wrap it.
    pub async fn connect(config: &Config, schema: SchemaConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await?;
        info!(
            max_connections = config.db_max_connections,
            prefix = schema.table_prefix.as_str(),
            "Connected to hotel store"
        );
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// First value of each requested key on one post, keyed by meta_key.
    async fn post_attributes(&self, post_id: i64, keys: &[&str]) -> StoreResult<HashMap<String, String>> {
        let sql = format!(
            "SELECT DISTINCT ON (meta_key) meta_key, meta_value FROM {} \
             WHERE post_id = $1 AND meta_key = ANY($2) \
             ORDER BY meta_key, meta_id",
            self.schema.table("postmeta")
        );
        let rows = sqlx::query_as::<_, MetaRow>(&sql)
            .bind(post_id)
            .bind(keys)
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_meta(rows))
    }
}

fn collect_meta(rows: Vec<MetaRow>) -> HashMap<String, String> {
    rows.into_iter()
        .filter_map(|row| Some((row.meta_key, row.meta_value?)))
        .collect()
}

/// `alias.meta_value` as double precision, NULL when not numeric.
///
/// Mirrors `parse_numeric`. The value goes through `numeric` first so that
/// magnitudes outside the f64 range become NULL or zero instead of failing
/// the cast.
fn numeric_value(alias: &str) -> String {
    let value = format!("{alias}.meta_value");
    format!(
        "(CASE WHEN length({value}) <= {MAX_NUMERIC_LEN} AND {value} ~ '{NUMERIC_PATTERN}' THEN \
         CASE WHEN abs({value}::numeric) >= {F64_OVERFLOW} THEN NULL \
         WHEN abs({value}::numeric) <= {F64_UNDERFLOW} THEN 0::float8 \
         ELSE {value}::numeric::float8 END END)"
    )
}

/// Lateral join yielding the first value of `key` on post `p` as `alias`.
/// Posts without that attribute drop out of the result.
fn push_meta_join(
    qb: &mut QueryBuilder<'_, Postgres>,
    postmeta: &str,
    alias: &str,
    key: &str,
) {
    qb.push(format!(
        " JOIN LATERAL (SELECT meta_value FROM {postmeta} \
         WHERE post_id = p.ID AND meta_key = "
    ));
    qb.push_bind(key.to_string());
    qb.push(format!(" ORDER BY meta_id LIMIT 1) {alias} ON true"));
}

/// Build the candidate query for one hotel's rooms.
///
/// Every predicate of `query` is pushed down. Rooms lacking a numeric price
/// are never returned. Ordered by truncated price, then id.
fn build_room_candidates_query<'a>(
    schema: &SchemaConfig,
    hotel_id: i64,
    query: &RoomQuery,
) -> QueryBuilder<'a, Postgres> {
    let keys = &schema.room_meta;
    let postmeta = schema.table("postmeta");
    let price = format!("trunc({})", numeric_value("price"));

    let mut qb = QueryBuilder::new(format!("SELECT p.ID AS id FROM {} p", schema.table("posts")));

    push_meta_join(&mut qb, &postmeta, "price", &keys.price);
    let surface_bounded = !query.surface.is_unbounded();
    if surface_bounded {
        push_meta_join(&mut qb, &postmeta, "surface", &keys.surface);
    }
    if query.min_bed_rooms.is_some() {
        push_meta_join(&mut qb, &postmeta, "bed_rooms", &keys.bed_rooms);
    }
    if query.min_bath_rooms.is_some() {
        push_meta_join(&mut qb, &postmeta, "bath_rooms", &keys.bath_rooms);
    }
    if !query.types.is_empty() {
        push_meta_join(&mut qb, &postmeta, "room_type", &keys.room_type);
    }

    qb.push(" WHERE p.post_author = ");
    qb.push_bind(hotel_id);
    qb.push(" AND p.post_type = ");
    qb.push_bind(keys.post_type.clone());
    qb.push(format!(" AND {price} IS NOT NULL"));

    if let Some(min) = query.price.min {
        qb.push(format!(" AND {price} >= "));
        qb.push_bind(min);
    }
    if let Some(max) = query.price.max {
        qb.push(format!(" AND {price} <= "));
        qb.push_bind(max);
    }

    if surface_bounded {
        let surface = numeric_value("surface");
        qb.push(format!(" AND {surface} IS NOT NULL"));
        if let Some(min) = query.surface.min {
            qb.push(format!(" AND {surface} >= "));
            qb.push_bind(min);
        }
        if let Some(max) = query.surface.max {
            qb.push(format!(" AND {surface} <= "));
            qb.push_bind(max);
        }
    }

    if let Some(min) = query.min_bed_rooms {
        qb.push(format!(" AND trunc({}) >= ", numeric_value("bed_rooms")));
        qb.push_bind(min as f64);
    }
    if let Some(min) = query.min_bath_rooms {
        qb.push(format!(" AND trunc({}) >= ", numeric_value("bath_rooms")));
        qb.push_bind(min as f64);
    }

    if !query.types.is_empty() {
        qb.push(" AND room_type.meta_value = ANY(");
        qb.push_bind(query.types.iter().cloned().collect::<Vec<String>>());
        qb.push(")");
    }

    qb.push(format!(" ORDER BY {price} ASC, p.ID ASC"));
    qb
}

#[async_trait]
impl HotelStore for PgHotelStore {
    async fn hotels(&self) -> StoreResult<Vec<HotelRow>> {
        let sql = format!(
            "SELECT ID AS id, display_name FROM {} ORDER BY ID",
            self.schema.table("users")
        );
        let rows = sqlx::query_as::<_, (i64, Option<String>)>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, display_name)| HotelRow {
                id,
                display_name: display_name.unwrap_or_default(),
            })
            .collect())
    }

    async fn attribute(&self, entity_id: i64, key: &str) -> StoreResult<Option<String>> {
        let sql = format!(
            "SELECT meta_value FROM {} WHERE user_id = $1 AND meta_key = $2 \
             ORDER BY umeta_id LIMIT 1",
            self.schema.table("usermeta")
        );
        let value: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(entity_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.flatten())
    }

    async fn attributes(&self, entity_id: i64, keys: &[&str]) -> StoreResult<HashMap<String, String>> {
        let sql = format!(
            "SELECT DISTINCT ON (meta_key) meta_key, meta_value FROM {} \
             WHERE user_id = $1 AND meta_key = ANY($2) \
             ORDER BY meta_key, umeta_id",
            self.schema.table("usermeta")
        );
        let rows = sqlx::query_as::<_, MetaRow>(&sql)
            .bind(entity_id)
            .bind(keys)
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_meta(rows))
    }

    async fn review_summary(&self, hotel_id: i64) -> StoreResult<ReviewSummary> {
        let rating = numeric_value("m");
        let sql = format!(
            "SELECT ROUND(AVG({rating}::numeric))::bigint AS rating, COUNT({rating}) AS count \
             FROM {posts} p JOIN {postmeta} m ON m.post_id = p.ID \
             WHERE p.post_author = $1 AND p.post_type = $2 AND m.meta_key = $3",
            posts = self.schema.table("posts"),
            postmeta = self.schema.table("postmeta"),
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(hotel_id)
            .bind(&self.schema.review.post_type)
            .bind(&self.schema.review.rating)
            .fetch_one(&self.pool)
            .await?;
        Ok(ReviewSummary {
            rating: row.rating,
            count: row.count,
        })
    }

    async fn room_candidates(&self, hotel_id: i64, query: &RoomQuery) -> StoreResult<Vec<i64>> {
        let mut qb = build_room_candidates_query(&self.schema, hotel_id, query);
        let ids = qb
            .build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn room(&self, room_id: i64) -> StoreResult<Option<Room>> {
        let sql = format!(
            "SELECT ID AS id, post_author AS hotel_id, post_title AS title FROM {} \
             WHERE ID = $1 AND post_type = $2",
            self.schema.table("posts")
        );
        let Some(post) = sqlx::query_as::<_, RoomPostRow>(&sql)
            .bind(room_id)
            .bind(&self.schema.room_meta.post_type)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let keys = &self.schema.room_meta;
        let attrs = self
            .post_attributes(
                post.id,
                &[
                    keys.surface.as_str(),
                    keys.price.as_str(),
                    keys.bed_rooms.as_str(),
                    keys.bath_rooms.as_str(),
                    keys.room_type.as_str(),
                    keys.cover_image.as_str(),
                ],
            )
            .await?;

        Ok(Some(room_from_attributes(post.id, post.hotel_id, post.title, &attrs, keys)))
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stayfinder_common::{Bounds, Config, SchemaConfig, SearchFilter};
use stayfinder_search::{HotelSearch, PgHotelStore, StageTimings};

#[derive(Parser, Debug)]
#[command(name = "stayfinder", about = "Search hotels by room, price and distance")]
struct Cli {
    /// Reference latitude for distance search
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Reference longitude for distance search
    #[arg(long, allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Maximum distance from the reference point, in km
    #[arg(long)]
    distance: Option<f64>,

    #[arg(long)]
    price_min: Option<f64>,

    #[arg(long)]
    price_max: Option<f64>,

    #[arg(long)]
    surface_min: Option<f64>,

    #[arg(long)]
    surface_max: Option<f64>,

    /// Minimum number of bedrooms
    #[arg(long)]
    rooms: Option<i64>,

    /// Minimum number of bathrooms
    #[arg(long)]
    bath_rooms: Option<i64>,

    /// Accepted room type, repeatable
    #[arg(long = "type")]
    types: Vec<String>,

    /// Base filter as JSON; flags given alongside override its fields
    #[arg(long)]
    filter_json: Option<String>,

    /// Table prefix and attribute key mapping, overrides STAYFINDER_SCHEMA
    #[arg(long)]
    schema: Option<PathBuf>,
}

impl Cli {
    fn filter(&self) -> Result<SearchFilter> {
        let mut filter: SearchFilter = match &self.filter_json {
            Some(json) => serde_json::from_str(json).context("--filter-json is not a valid filter")?,
            None => SearchFilter::default(),
        };

        if self.lat.is_some() {
            filter.lat = self.lat;
        }
        if self.lng.is_some() {
            filter.lng = self.lng;
        }
        if self.distance.is_some() {
            filter.distance = self.distance;
        }
        filter.price = merge_bounds(filter.price, self.price_min, self.price_max);
        filter.surface = merge_bounds(filter.surface, self.surface_min, self.surface_max);
        if self.rooms.is_some() {
            filter.rooms = self.rooms;
        }
        if self.bath_rooms.is_some() {
            filter.bath_rooms = self.bath_rooms;
        }
        if !self.types.is_empty() {
            filter.types = self.types.iter().cloned().collect();
        }

        Ok(filter)
    }

    fn schema(&self, config: &Config) -> Result<SchemaConfig> {
        match &self.schema {
            Some(path) => SchemaConfig::load(path),
            None => config.schema(),
        }
    }
}

fn merge_bounds(base: Bounds<f64>, min: Option<f64>, max: Option<f64>) -> Bounds<f64> {
    Bounds::new(min.or(base.min), max.or(base.max))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stayfinder=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let filter = cli.filter()?;

    let config = Config::from_env()?;
    config.log_redacted();
    let schema = cli.schema(&config)?;

    let store = PgHotelStore::connect(&config, schema.clone())
        .await
        .context("Failed to connect to the hotel store")?;

    let timings = Arc::new(StageTimings::new());
    let search = HotelSearch::builder()
        .store(Arc::new(store))
        .schema(schema)
        .recorder(timings.clone())
        .concurrency(config.search_concurrency)
        .build();

    let hotels = search.list(&filter).await.context("Hotel search failed")?;

    for (stage, stat) in timings.snapshot() {
        info!(
            stage = stage.as_str(),
            count = stat.count,
            mean_ms = stat.mean().as_secs_f64() * 1000.0,
            max_ms = stat.max.as_secs_f64() * 1000.0,
            "Stage timing"
        );
    }

    println!("{}", serde_json::to_string_pretty(&hotels)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stayfinder").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_build_a_filter() {
        let cli = parse(&[
            "--lat", "-33.86", "--lng", "151.2", "--distance", "25",
            "--price-max", "150", "--rooms", "2", "--type", "single", "--type", "suite",
        ]);
        let filter = cli.filter().unwrap();

        assert_eq!(filter.reference_point(), Some((-33.86, 151.2)));
        assert_eq!(filter.distance, Some(25.0));
        assert_eq!(filter.price, Bounds::new(None, Some(150.0)));
        assert_eq!(filter.rooms, Some(2));
        assert_eq!(filter.bath_rooms, None);
        assert_eq!(filter.types.len(), 2);
    }

    #[test]
    fn flags_override_json_fields() {
        let cli = parse(&[
            "--filter-json",
            r#"{"price": {"min": 50, "max": 100}, "bathRooms": 1, "types": ["double"]}"#,
            "--price-max",
            "80",
        ]);
        let filter = cli.filter().unwrap();

        assert_eq!(filter.price, Bounds::new(Some(50.0), Some(80.0)));
        assert_eq!(filter.bath_rooms, Some(1));
        assert!(filter.types.contains("double"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let cli = parse(&["--filter-json", "{not json"]);
        assert!(cli.filter().is_err());
    }
}

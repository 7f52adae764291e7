//! Per-stage timing collection.
//!
//! The search pipeline reports how long each stage took to an injected
//! `StageRecorder`. `NoopRecorder` discards everything; `StageTimings`
//! aggregates count, total and max per stage for later inspection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Catalog,
    Metadata,
    Reviews,
    CheapestRoom,
    Enrichment,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Metadata => "metadata",
            Self::Reviews => "reviews",
            Self::CheapestRoom => "cheapest_room",
            Self::Enrichment => "enrichment",
        }
    }
}

pub trait StageRecorder: Send + Sync {
    fn record(&self, stage: Stage, elapsed: Duration);
}

pub struct NoopRecorder;

impl StageRecorder for NoopRecorder {
    fn record(&self, _stage: Stage, _elapsed: Duration) {}
}

/// Aggregated timings for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStat {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl StageStat {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total / self.count as u32
    }
}

#[derive(Default)]
pub struct StageTimings {
    stats: Mutex<HashMap<Stage, StageStat>>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current stats, sorted by stage.
    pub fn snapshot(&self) -> Vec<(Stage, StageStat)> {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = stats.iter().map(|(s, v)| (*s, *v)).collect();
        out.sort_by_key(|(stage, _)| *stage);
        out
    }

    pub fn get(&self, stage: Stage) -> StageStat {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.get(&stage).copied().unwrap_or_default()
    }
}

impl StageRecorder for StageTimings {
    fn record(&self, stage: Stage, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        let entry = stats.entry(stage).or_default();
        entry.count += 1;
        entry.total += elapsed;
        entry.max = entry.max.max(elapsed);
    }
}

/// Await `fut` and report its wall time under `stage`, whatever it returns.
pub async fn timed<F: Future>(recorder: &dyn StageRecorder, stage: Stage, fut: F) -> F::Output {
    let start = Instant::now();
    let out = fut.await;
    recorder.record(stage, start.elapsed());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_per_stage() {
        let timings = StageTimings::new();
        timings.record(Stage::Reviews, Duration::from_millis(4));
        timings.record(Stage::Reviews, Duration::from_millis(10));
        timings.record(Stage::Catalog, Duration::from_millis(1));

        let reviews = timings.get(Stage::Reviews);
        assert_eq!(reviews.count, 2);
        assert_eq!(reviews.total, Duration::from_millis(14));
        assert_eq!(reviews.max, Duration::from_millis(10));
        assert_eq!(reviews.mean(), Duration::from_millis(7));

        assert_eq!(timings.get(Stage::Metadata), StageStat::default());

        let stages: Vec<_> = timings.snapshot().into_iter().map(|(s, _)| s).collect();
        assert_eq!(stages, vec![Stage::Catalog, Stage::Reviews]);
    }

    #[tokio::test]
    async fn timed_records_even_on_error() {
        let timings = StageTimings::new();
        let out: Result<(), &str> = timed(&timings, Stage::CheapestRoom, async { Err("boom") }).await;
        assert!(out.is_err());
        assert_eq!(timings.get(Stage::CheapestRoom).count, 1);
    }
}

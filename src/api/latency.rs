//! Store read latency, kept separately for list, count and get-by-id queries.

use std::sync::Mutex;
use std::time::Duration;

use axum::{extract::State, Json};
use hdrhistogram::Histogram;
use serde::Serialize;

use crate::api::routes::ApiState;

/// Slowest recordable read; anything above saturates here.
const MAX_TRACKED_US: u64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    List,
    Count,
    Get,
}

/// Percentiles in milliseconds. All `None` until the first sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpLatency {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

impl OpLatency {
    fn from_histogram(h: &Histogram<u64>) -> Self {
        let at = |q: f64| (h.len() > 0).then(|| h.value_at_quantile(q) as f64 / 1000.0);
        Self {
            p50_ms: at(0.5),
            p95_ms: at(0.95),
            p99_ms: at(0.99),
            sample_count: h.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyResponse {
    pub list: OpLatency,
    pub count: OpLatency,
    pub get: OpLatency,
}

struct Histograms {
    list: Histogram<u64>,
    count: Histogram<u64>,
    get: Histogram<u64>,
}

impl Histograms {
    fn for_op(&mut self, op: StoreOp) -> &mut Histogram<u64> {
        match op {
            StoreOp::List => &mut self.list,
            StoreOp::Count => &mut self.count,
            StoreOp::Get => &mut self.get,
        }
    }
}

/// Written by `EventStore` after each read, served at /stats/latency.
pub struct LatencyStats {
    histograms: Mutex<Histograms>,
}

impl LatencyStats {
    pub fn new() -> Self {
        let fresh = || {
            Histogram::new_with_bounds(1, MAX_TRACKED_US, 3).expect("valid histogram bounds")
        };
        Self {
            histograms: Mutex::new(Histograms {
                list: fresh(),
                count: fresh(),
                get: fresh(),
            }),
        }
    }

    pub fn record(&self, op: StoreOp, elapsed: Duration) {
        let us = elapsed.as_micros().clamp(1, u128::from(MAX_TRACKED_US)) as u64;
        if let Ok(mut histograms) = self.histograms.lock() {
            let _ = histograms.for_op(op).record(us);
        }
    }

    pub fn snapshot(&self) -> LatencyResponse {
        let empty = OpLatency {
            p50_ms: None,
            p95_ms: None,
            p99_ms: None,
            sample_count: 0,
        };
        match self.histograms.lock() {
            Ok(h) => LatencyResponse {
                list: OpLatency::from_histogram(&h.list),
                count: OpLatency::from_histogram(&h.count),
                get: OpLatency::from_histogram(&h.get),
            },
            Err(_) => LatencyResponse {
                list: empty,
                count: empty,
                get: empty,
            },
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(state.latency.snapshot())
}

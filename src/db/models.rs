//! Row types for the upstream `events` table. This service only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One scored event. `category` and `market_impact` stay as raw labels so an
/// unexpected upstream value still decodes; display code maps them leniently.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub source_id: Option<String>,
    pub source_hash: Option<String>,
    pub title: String,
    pub alert: Option<String>,
    pub summary: Vec<String>,
    pub category: String,
    pub severity: i32,
    pub confidence: f64,
    pub market_impact: String,
    pub entities: Vec<String>,
    pub geo: Option<Json<GeoPoint>>,
    pub source_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub ingested_at: Option<DateTime<Utc>>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::api::health::get_health;
use crate::api::latency::{get_stats_latency, LatencyStats};
use crate::config::ALL_CATEGORIES;
use crate::db::{EventRow, EventStore};
use crate::error::AppError;
use crate::feed::html::{landing_page, render_error_page, render_feed_page, render_loading_page, FeedPage};
use crate::feed::EventCard;
use crate::types::{EventFilter, EventQuery};

#[derive(Clone)]
pub struct ApiState {
    pub store: EventStore,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_landing))
        .route("/feed", get(get_feed_page))
        .route("/feed/loading", get(get_feed_loading))
        .route("/api/events", get(get_events))
        .route("/api/events/count", get(get_event_count))
        .route("/api/events/:id", get(get_event))
        .route("/api/feed", get(get_feed))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Page navigation. A cache-busting `t` parameter may also be present and is ignored.
#[derive(Deserialize)]
pub struct FeedPageQuery {
    pub category: Option<String>,
}

impl FeedPageQuery {
    fn selected(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CATEGORIES)
    }
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub category: Option<String>,
    pub min_severity: Option<i32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EventsQuery {
    fn to_event_query(&self) -> EventQuery {
        let mut query = EventQuery::new(EventFilter::new(self.category.as_deref(), self.min_severity));
        if let Some(limit) = self.limit {
            query = query.with_limit(i64::from(limit));
        }
        if let Some(offset) = self.offset {
            query = query.with_offset(i64::from(offset));
        }
        query
    }
}

#[derive(Deserialize)]
pub struct CountQuery {
    pub category: Option<String>,
    pub min_severity: Option<i32>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub category: String,
    pub total: i64,
    pub cards: Vec<EventCard>,
}

// ---------------------------------------------------------------------------
// Page handlers
// ---------------------------------------------------------------------------

async fn get_landing() -> Html<String> {
    Html(landing_page())
}

async fn get_feed_page(State(state): State<ApiState>, Query(params): Query<FeedPageQuery>) -> Response {
    let selected = params.selected();
    let now = Utc::now();
    let query = EventQuery::new(EventFilter::new(Some(selected), None));

    match state.store.list_events(&query).await {
        Ok(rows) => {
            let cards: Vec<EventCard> = rows.iter().map(|r| EventCard::from_row(r, now)).collect();
            Html(render_feed_page(&FeedPage {
                selected,
                cards: &cards,
                limit: query.limit,
                now_ms: now.timestamp_millis(),
            }))
            .into_response()
        }
        Err(e) => {
            error!(category = selected, connectivity = e.is_connectivity(), "Feed render failed: {e}");
            let page = render_error_page(selected, now.timestamp_millis(), &e);
            (e.status(), Html(page)).into_response()
        }
    }
}

async fn get_feed_loading(Query(params): Query<FeedPageQuery>) -> Html<String> {
    Html(render_loading_page(params.selected(), Utc::now().timestamp_millis()))
}

// ---------------------------------------------------------------------------
// JSON handlers
// ---------------------------------------------------------------------------

async fn get_events(
    State(state): State<ApiState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<EventRow>>, AppError> {
    let rows = state.store.list_events(&params.to_event_query()).await?;
    Ok(Json(rows))
}

async fn get_event_count(
    State(state): State<ApiState>,
    Query(params): Query<CountQuery>,
) -> Result<Json<CountResponse>, AppError> {
    let filter = EventFilter::new(params.category.as_deref(), params.min_severity);
    let count = state.store.count_events(&filter).await?;
    Ok(Json(CountResponse { count }))
}

async fn get_event(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<EventRow>, AppError> {
    state
        .store
        .get_event(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("event {id}")))
}

async fn get_feed(
    State(state): State<ApiState>,
    Query(params): Query<FeedPageQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let selected = params.selected();
    let query = EventQuery::new(EventFilter::new(Some(selected), None));
    let rows = state.store.list_events(&query).await?;
    let total = state.store.count_events(&query.filter).await?;

    let now = Utc::now();
    Ok(Json(FeedResponse {
        category: selected.to_string(),
        total,
        cards: rows.iter().map(|r| EventCard::from_row(r, now)).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

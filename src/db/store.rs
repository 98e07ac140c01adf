use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::api::latency::{LatencyStats, StoreOp};
use crate::config::{
    Config, MIN_CONFIDENCE, POOL_ACQUIRE_TIMEOUT_SECS, POOL_IDLE_TIMEOUT_SECS, POOL_MAX_CONNECTIONS,
};
use crate::db::models::EventRow;
use crate::error::Result;
use crate::types::{EventFilter, EventQuery};

/// Column list agreed with the owner of the `events` table. Casts keep decoding
/// tolerant of the exact upstream column types.
const EVENT_COLUMNS: &str = "id::text AS id, source_id::text AS source_id, source_hash, title, alert, \
     COALESCE(summary, '{}') AS summary, category::text AS category, severity::int4 AS severity, \
     confidence::float8 AS confidence, market_impact::text AS market_impact, \
     COALESCE(entities, '{}') AS entities, geo::jsonb AS geo, source_url, \
     published_at::timestamptz AS published_at, ingested_at::timestamptz AS ingested_at, \
     promoted_at::timestamptz AS promoted_at, created_at::timestamptz AS created_at";

/// Lazily connected pool: the server comes up without the database and each
/// render fails on its own if the database is unreachable.
pub fn connect_pool(cfg: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(POOL_MAX_CONNECTIONS)
        .idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
        .acquire_timeout(Duration::from_secs(POOL_ACQUIRE_TIMEOUT_SECS))
        .connect_lazy(&cfg.database_url)?;
    Ok(pool)
}

/// Read-only access to scored events.
///
/// Every call checks out one pooled connection for its single query. The
/// `PoolConnection` guard hands it back on drop, so it is released on success,
/// on query error, and if the request future is dropped mid-query.
#[derive(Clone)]
pub struct EventStore {
    pool: PgPool,
    latency: Arc<LatencyStats>,
}

impl EventStore {
    pub fn new(pool: PgPool, latency: Arc<LatencyStats>) -> Self {
        Self { pool, latency }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Events passing the quality floor, most severe first, newest first within a severity.
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventRow>> {
        let started = Instant::now();
        let mut conn = self.pool.acquire().await?;

        let mut builder = list_query(query);
        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(&mut *conn)
            .await?;

        let elapsed = started.elapsed();
        self.latency.record(StoreOp::List, elapsed);
        debug!(
            category = query.filter.category.as_deref().unwrap_or("All"),
            min_severity = query.filter.min_severity,
            limit = query.limit,
            offset = query.offset,
            rows = rows.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "listed events"
        );
        Ok(rows)
    }

    /// `Ok(None)` when no event has this id.
    pub async fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        let started = Instant::now();
        let mut conn = self.pool.acquire().await?;

        let mut builder = by_id_query(id);
        let row = builder
            .build_query_as::<EventRow>()
            .fetch_optional(&mut *conn)
            .await?;

        self.latency.record(StoreOp::Get, started.elapsed());
        debug!(id, found = row.is_some(), "looked up event");
        Ok(row)
    }

    /// Total rows matching `filter`, ignoring limit and offset.
    pub async fn count_events(&self, filter: &EventFilter) -> Result<i64> {
        let started = Instant::now();
        let mut conn = self.pool.acquire().await?;

        let mut builder = count_query(filter);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?;

        self.latency.record(StoreOp::Count, started.elapsed());
        debug!(
            category = filter.category.as_deref().unwrap_or("All"),
            min_severity = filter.min_severity,
            count,
            "counted events"
        );
        Ok(count)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Query construction
// ---------------------------------------------------------------------------

/// Appends the shared WHERE clause. Caller-supplied values are always bound.
fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &EventFilter) {
    builder
        .push(" WHERE severity >= ")
        .push_bind(filter.min_severity)
        .push(" AND confidence >= ")
        .push(MIN_CONFIDENCE);

    if let Some(category) = &filter.category {
        builder
            .push(" AND category::text = ")
            .push_bind(category.clone());
    }
}

fn list_query(query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder.push(EVENT_COLUMNS).push(" FROM events");
    push_filter(&mut builder, &query.filter);
    builder
        .push(" ORDER BY severity DESC, published_at DESC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    builder
}

fn count_query(filter: &EventFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM events");
    push_filter(&mut builder, filter);
    builder
}

fn by_id_query(id: &str) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder
        .push(EVENT_COLUMNS)
        .push(" FROM events WHERE id::text = ")
        .push_bind(id.to_string());
    builder
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn filter(category: Option<&str>) -> EventFilter {
        EventFilter::new(category, None)
    }

    #[test]
    fn list_without_category_binds_three_values() {
        let builder = list_query(&EventQuery::new(filter(None)));
        let sql = builder.sql();
        assert!(sql.contains(" FROM events WHERE severity >= $1 AND confidence >= 0.5 ORDER BY"));
        assert!(sql.ends_with("ORDER BY severity DESC, published_at DESC LIMIT $2 OFFSET $3"));
        assert!(!sql.contains("category::text ="));
    }

    #[test]
    fn list_with_category_binds_it_second() {
        let builder = list_query(&EventQuery::new(filter(Some("Market"))));
        let sql = builder.sql();
        assert!(sql.contains("WHERE severity >= $1 AND confidence >= 0.5 AND category::text = $2"));
        assert!(sql.ends_with("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn category_value_never_reaches_sql_text() {
        let hostile = "Market' OR '1'='1";
        let builder = list_query(&EventQuery::new(filter(Some(hostile))));
        assert!(!builder.sql().contains(hostile));

        let builder = count_query(&filter(Some(hostile)));
        assert!(!builder.sql().contains(hostile));

        let builder = by_id_query(hostile);
        assert!(!builder.sql().contains(hostile));
    }

    #[test]
    fn all_sentinel_produces_unfiltered_query() {
        let all = list_query(&EventQuery::new(filter(Some("All"))));
        let none = list_query(&EventQuery::new(filter(None)));
        assert_eq!(all.sql(), none.sql());
    }

    #[test]
    fn count_shares_the_list_filter() {
        let builder = count_query(&filter(Some("War")));
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM events WHERE severity >= $1 AND confidence >= 0.5 AND category::text = $2"
        );
    }

    #[test]
    fn by_id_compares_as_text() {
        let builder = by_id_query("42");
        assert!(builder.sql().ends_with("FROM events WHERE id::text = $1"));
    }

    // -----------------------------------------------------------------------
    // Live database tests
    // -----------------------------------------------------------------------

    const CREATE_EVENTS: &str = r#"
        CREATE TEMP TABLE events (
            id text PRIMARY KEY,
            source_id text,
            source_hash text NOT NULL,
            title text NOT NULL,
            alert text,
            summary text[],
            category text NOT NULL,
            severity integer NOT NULL,
            confidence numeric(4, 3) NOT NULL,
            market_impact text NOT NULL,
            entities text[],
            geo jsonb,
            source_url text,
            published_at timestamptz NOT NULL,
            ingested_at timestamptz DEFAULT now(),
            promoted_at timestamptz,
            created_at timestamptz DEFAULT now()
        )
    "#;

    /// (id, category, severity, confidence, hours_ago)
    const FIXTURES: &[(&str, &str, i32, f64, i64)] = &[
        ("e1", "Market", 92, 0.89, 5),
        ("e2", "Market", 92, 0.70, 1),
        ("e3", "Market", 55, 0.90, 2),
        ("e4", "Market", 39, 0.95, 1),
        ("e5", "Market", 70, 0.40, 1),
        ("e6", "War", 95, 0.99, 3),
        ("e7", "Tech", 60, 0.50, 4),
        ("e8", "Weather", 85, 0.80, 6),
    ];

    /// Single-connection pool so the temp table is visible to every query.
    async fn seeded_store() -> EventStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::query(CREATE_EVENTS).execute(&pool).await.expect("create");

        let now = Utc::now();
        for (id, category, severity, confidence, hours_ago) in FIXTURES {
            sqlx::query(
                "INSERT INTO events (id, source_hash, title, summary, category, severity, confidence, \
                 market_impact, entities, published_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7::float8, 'none', $8, $9)",
            )
            .bind(*id)
            .bind(format!("hash-{id}"))
            .bind(format!("Event {id}"))
            .bind(vec!["a".to_string(), "b".to_string()])
            .bind(*category)
            .bind(*severity)
            .bind(*confidence)
            .bind(Vec::<String>::new())
            .bind(now - ChronoDuration::hours(*hours_ago))
            .execute(&pool)
            .await
            .expect("insert");
        }

        EventStore::new(pool, Arc::new(LatencyStats::new()))
    }

    fn assert_feed_order(rows: &[EventRow]) {
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.severity > b.severity
                    || (a.severity == b.severity && a.published_at >= b.published_at),
                "{} should not precede {}",
                a.id,
                b.id
            );
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn market_filter_applies_thresholds_and_order() {
        let store = seeded_store().await;
        let rows = store
            .list_events(&EventQuery::new(filter(Some("Market"))))
            .await
            .unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1", "e3"]);
        assert!(rows.iter().all(|r| r.category == "Market"));
        assert!(rows.iter().all(|r| r.severity >= 40 && r.confidence >= 0.5));
        assert_feed_order(&rows);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn unfiltered_list_respects_limit_offset_and_is_repeatable() {
        let store = seeded_store().await;
        let all = store.list_events(&EventQuery::default()).await.unwrap();
        assert_eq!(all.len(), 6);
        assert_feed_order(&all);

        let again = store.list_events(&EventQuery::default()).await.unwrap();
        assert_eq!(all, again);

        let page = store
            .list_events(&EventQuery::default().with_limit(2).with_offset(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, all[1].id);
        assert_eq!(page[1].id, all[2].id);

        let strict = store
            .list_events(&EventQuery::new(EventFilter::new(None, Some(90))))
            .await
            .unwrap();
        assert!(strict.iter().all(|r| r.severity >= 90));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn count_and_lookup() {
        let store = seeded_store().await;
        assert_eq!(store.count_events(&filter(Some("Market"))).await.unwrap(), 3);
        assert_eq!(store.count_events(&filter(None)).await.unwrap(), 6);
        assert_eq!(store.count_events(&filter(Some("Energy"))).await.unwrap(), 0);

        let found = store.get_event("e6").await.unwrap().expect("e6 exists");
        assert_eq!(found.category, "War");
        assert!(store.get_event("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn connection_is_returned_after_each_call() {
        // One connection total: a leaked checkout would time out the next call.
        let store = seeded_store().await;
        for _ in 0..5 {
            store.list_events(&EventQuery::default()).await.unwrap();
            store.get_event("missing").await.unwrap();
        }
        assert_eq!(store.pool().size(), 1);

        let stats = store.latency.snapshot();
        assert_eq!(stats.list.sample_count, 5);
        assert_eq!(stats.get.sample_count, 5);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a Postgres instance"]
    async fn connection_is_returned_after_a_failed_query() {
        let store = seeded_store().await;
        sqlx::query("ALTER TABLE events DROP COLUMN published_at")
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.list_events(&EventQuery::default()).await.unwrap_err();
        assert!(!err.is_connectivity(), "missing column is a query failure: {err}");
        assert!(store.get_event("e1").await.is_err());

        // Only one connection exists, so this would time out if a failed call kept it.
        sqlx::query("ALTER TABLE events ADD COLUMN published_at timestamptz NOT NULL DEFAULT now()")
            .execute(store.pool())
            .await
            .unwrap();
        let rows = store.list_events(&EventQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(store.pool().size(), 1);
    }
}

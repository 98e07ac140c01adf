use crate::error::{AppError, Result};

/// Pool bounds. Acquisition past `POOL_ACQUIRE_TIMEOUT_SECS` fails the render.
pub const POOL_MAX_CONNECTIONS: u32 = 10;
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 30;
pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Events below this severity are hidden unless the caller asks otherwise.
pub const DEFAULT_MIN_SEVERITY: i32 = 40;
pub const DEFAULT_LIMIT: i64 = 50;
pub const DEFAULT_OFFSET: i64 = 0;

/// Fixed quality floor applied to every read. Not configurable.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Category sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

/// Only this many summary bullets and entity tags are shown on a card.
pub const MAX_SUMMARY_POINTS: usize = 3;
pub const MAX_VISIBLE_ENTITIES: usize = 3;

/// Number of placeholder cards in the loading view.
pub const SKELETON_CARDS: usize = 6;

/// Severity band lower bounds (inclusive).
pub mod severity_thresholds {
    pub const CRITICAL_MIN: i32 = 80;
    pub const SIGNIFICANT_MIN: i32 = 60;
    pub const MODERATE_MIN: i32 = 40;
}

/// Confidence indicator lower bounds (inclusive).
pub mod confidence_thresholds {
    pub const HIGH_MIN: f64 = 0.8;
    pub const MEDIUM_MIN: f64 = 0.5;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source so tests don't touch the process env.
    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match get("DATABASE_URL").filter(|s| !s.is_empty()) {
            Some(url) => url,
            None => compose_database_url(&get)?,
        };

        Ok(Self {
            database_url,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: get("API_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }

    /// Connection string with the password masked, for logging.
    pub fn redacted_database_url(&self) -> String {
        let Some((scheme, rest)) = self.database_url.split_once("://") else {
            return self.database_url.clone();
        };
        let Some((creds, host)) = rest.rsplit_once('@') else {
            return self.database_url.clone();
        };
        match creds.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => self.database_url.clone(),
        }
    }
}

fn compose_database_url<F>(get: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let user = get("DB_USER").unwrap_or_else(|| "postgres".to_string());
    let password = get("DB_PASSWORD").unwrap_or_default();
    let host = get("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = get("DB_PORT")
        .unwrap_or_else(|| "5432".to_string())
        .parse::<u16>()
        .map_err(|_| AppError::Config("DB_PORT must be a valid port number".to_string()))?;
    let name = get("DB_NAME").unwrap_or_else(|| "metanews".to_string());

    Ok(format!("postgresql://{user}:{password}@{host}:{port}/{name}"))
}

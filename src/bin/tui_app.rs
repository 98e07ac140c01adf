use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the server's /api/feed shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeedResponse {
    pub category: String,
    pub total: i64,
    pub cards: Vec<CardResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct CardResponse {
    pub id: String,
    pub title: String,
    pub alert: Option<String>,
    pub category: String,
    pub severity: i32,
    pub severity_band: String,
    pub confidence_level: String,
    pub confidence_percent: i64,
    pub impact: Option<ImpactResponse>,
    pub summary: Vec<String>,
    pub entities: EntityTagsResponse,
    pub relative_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImpactResponse {
    pub label: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EntityTagsResponse {
    pub visible: Vec<String>,
    pub overflow: usize,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub const CATEGORIES: [&str; 8] = ["All", "War", "Market", "Disaster", "Tech", "Policy", "Crypto", "Energy"];

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    /// `None` until the first successful fetch and after any failed one.
    pub feed: Option<FeedResponse>,
    pub category_index: usize,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            feed: None,
            category_index: 0,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn category(&self) -> &'static str {
        CATEGORIES[self.category_index]
    }

    pub fn next_category(&mut self) {
        self.category_index = (self.category_index + 1) % CATEGORIES.len();
    }

    pub fn prev_category(&mut self) {
        self.category_index = (self.category_index + CATEGORIES.len() - 1) % CATEGORIES.len();
    }

    /// "All" omits the parameter, same as clearing filters in the web UI.
    pub fn feed_url(&self) -> String {
        match self.category() {
            "All" => format!("{}/api/feed", self.base_url),
            category => format!("{}/api/feed?category={category}", self.base_url),
        }
    }

    pub fn cards(&self) -> &[CardResponse] {
        self.feed
            .as_ref()
            .map(|f| f.cards.as_slice())
            .unwrap_or_default()
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let resp = match client.get(self.feed_url()).send().await {
            Ok(r) => r,
            Err(e) => {
                self.fail(format!("{e}"));
                return;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.fail(format!("HTTP {}: {}", status.as_u16(), body.trim()));
            return;
        }

        match resp.json::<FeedResponse>().await {
            Ok(feed) => {
                self.feed = Some(feed);
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            Err(e) => self.fail(format!("parse error: {e}")),
        }
    }

    fn fail(&mut self, message: String) {
        self.feed = None;
        self.status = ConnectionStatus::Error(message);
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_entities(tags: &EntityTagsResponse) -> String {
    let mut out = tags.visible.join(", ");
    if tags.overflow > 0 {
        out.push_str(&format!(" +{}", tags.overflow));
    }
    out
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::{ALL_CATEGORIES, DEFAULT_LIMIT, DEFAULT_MIN_SEVERITY, DEFAULT_OFFSET};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    War,
    Market,
    Disaster,
    Tech,
    Policy,
    Crypto,
    Energy,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::War,
        Category::Market,
        Category::Disaster,
        Category::Tech,
        Category::Policy,
        Category::Crypto,
        Category::Energy,
        Category::Other,
    ];

    /// Categories offered in the feed filter bar. `Other` is reachable only through "All".
    pub const FILTERABLE: [Category; 7] = [
        Category::War,
        Category::Market,
        Category::Disaster,
        Category::Tech,
        Category::Policy,
        Category::Crypto,
        Category::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::War => "War",
            Category::Market => "Market",
            Category::Disaster => "Disaster",
            Category::Tech => "Tech",
            Category::Policy => "Policy",
            Category::Crypto => "Crypto",
            Category::Energy => "Energy",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact, case-sensitive match on the stored label.
impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

// ---------------------------------------------------------------------------
// Market impact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketImpact {
    None,
    Low,
    Medium,
    High,
}

impl MarketImpact {
    /// Unrecognised labels are treated as `None` so upstream drift never breaks a render.
    pub fn from_label(s: &str) -> Self {
        match s {
            "low" => MarketImpact::Low,
            "medium" => MarketImpact::Medium,
            "high" => MarketImpact::High,
            _ => MarketImpact::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketImpact::None => "none",
            MarketImpact::Low => "low",
            MarketImpact::Medium => "medium",
            MarketImpact::High => "high",
        }
    }
}

impl std::fmt::Display for MarketImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter shared by the list and count queries.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    /// `None` means every category.
    pub category: Option<String>,
    pub min_severity: i32,
}

impl EventFilter {
    /// Normalises a raw category parameter: absent, empty and "All" all mean no filter.
    pub fn new(category: Option<&str>, min_severity: Option<i32>) -> Self {
        let category = category
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
            .map(str::to_string);
        Self {
            category,
            min_severity: min_severity.unwrap_or(DEFAULT_MIN_SEVERITY),
        }
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub filter: EventFilter,
    pub limit: i64,
    pub offset: i64,
}

impl EventQuery {
    pub fn new(filter: EventFilter) -> Self {
        Self {
            filter,
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for EventQuery {
    fn default() -> Self {
        Self::new(EventFilter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_exact() {
        assert_eq!("Market".parse::<Category>(), Ok(Category::Market));
        assert!("market".parse::<Category>().is_err());
        assert!("Sports".parse::<Category>().is_err());
    }

    #[test]
    fn unknown_impact_falls_back_to_none() {
        assert_eq!(MarketImpact::from_label("high"), MarketImpact::High);
        assert_eq!(MarketImpact::from_label("extreme"), MarketImpact::None);
        assert_eq!(MarketImpact::from_label(""), MarketImpact::None);
    }

    #[test]
    fn all_sentinel_clears_category() {
        assert_eq!(EventFilter::new(Some("All"), None).category, None);
        assert_eq!(EventFilter::new(Some(""), None).category, None);
        assert_eq!(EventFilter::new(None, None).category, None);
        assert_eq!(
            EventFilter::new(Some("Crypto"), None).category.as_deref(),
            Some("Crypto")
        );
    }

    #[test]
    fn category_is_kept_verbatim() {
        assert_eq!(
            EventFilter::new(Some(" Market "), None).category.as_deref(),
            Some(" Market ")
        );
        assert_eq!(EventFilter::new(Some("  "), None).category.as_deref(), Some("  "));
        assert_eq!(EventFilter::new(Some("all"), None).category.as_deref(), Some("all"));
    }

    #[test]
    fn defaults_match_feed_page() {
        let q = EventQuery::default();
        assert_eq!(q.filter.min_severity, 40);
        assert_eq!(q.limit, 50);
        assert_eq!(q.offset, 0);
    }
}

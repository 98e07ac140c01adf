use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{MAX_SUMMARY_POINTS, MAX_VISIBLE_ENTITIES};
use crate::db::models::EventRow;
use crate::types::{Category, MarketImpact};

// ---------------------------------------------------------------------------
// Severity band
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    /// severity >= 80
    Critical,
    /// severity 60–79
    Significant,
    /// severity 40–59
    Moderate,
    /// severity < 40
    Low,
}

impl SeverityBand {
    pub fn from_severity(severity: i32) -> Self {
        use crate::config::severity_thresholds::*;
        if severity >= CRITICAL_MIN {
            SeverityBand::Critical
        } else if severity >= SIGNIFICANT_MIN {
            SeverityBand::Significant
        } else if severity >= MODERATE_MIN {
            SeverityBand::Moderate
        } else {
            SeverityBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Critical => "critical",
            SeverityBand::Significant => "significant",
            SeverityBand::Moderate => "moderate",
            SeverityBand::Low => "low",
        }
    }

    /// CSS color treatment for the band.
    pub fn css_class(&self) -> &'static str {
        match self {
            SeverityBand::Critical => "sev-critical",
            SeverityBand::Significant => "sev-significant",
            SeverityBand::Moderate => "sev-moderate",
            SeverityBand::Low => "sev-low",
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence indicator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// NaN lands in `Low`.
    pub fn from_confidence(confidence: f64) -> Self {
        use crate::config::confidence_thresholds::*;
        if confidence >= HIGH_MIN {
            ConfidenceLevel::High
        } else if confidence >= MEDIUM_MIN {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "\u{2714}",
            ConfidenceLevel::Medium => "\u{25F7}",
            ConfidenceLevel::Low => "\u{26A0}",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high confidence",
            ConfidenceLevel::Medium => "medium confidence",
            ConfidenceLevel::Low => "low confidence",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "conf-high",
            ConfidenceLevel::Medium => "conf-medium",
            ConfidenceLevel::Low => "conf-low",
        }
    }
}

pub fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

// ---------------------------------------------------------------------------
// Category icon and impact badge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryIcon {
    pub name: &'static str,
    pub glyph: &'static str,
}

const GENERIC_ICON: CategoryIcon = CategoryIcon {
    name: "newspaper",
    glyph: "\u{1F4F0}",
};

/// Never fails: labels outside the known set get the generic icon.
pub fn category_icon(label: &str) -> CategoryIcon {
    let Ok(category) = label.parse::<Category>() else {
        return GENERIC_ICON;
    };
    match category {
        Category::War => CategoryIcon { name: "swords", glyph: "\u{2694}" },
        Category::Market => CategoryIcon { name: "trending-up", glyph: "\u{1F4C8}" },
        Category::Disaster => CategoryIcon { name: "cloud-lightning", glyph: "\u{1F329}" },
        Category::Tech => CategoryIcon { name: "cpu", glyph: "\u{1F4BB}" },
        Category::Policy => CategoryIcon { name: "landmark", glyph: "\u{1F3DB}" },
        Category::Crypto => CategoryIcon { name: "bitcoin", glyph: "\u{20BF}" },
        Category::Energy => CategoryIcon { name: "zap", glyph: "\u{26A1}" },
        Category::Other => GENERIC_ICON,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactBadge {
    pub impact: MarketImpact,
    pub label: String,
    pub css_class: &'static str,
}

/// `None` only for the literal "none". Unrecognised labels still show, uppercased,
/// in the neutral color.
pub fn impact_badge(label: &str) -> Option<ImpactBadge> {
    if label == MarketImpact::None.as_str() {
        return None;
    }
    let impact = MarketImpact::from_label(label);
    let css_class = match impact {
        MarketImpact::None => "impact-none",
        MarketImpact::Low => "impact-low",
        MarketImpact::Medium => "impact-medium",
        MarketImpact::High => "impact-high",
    };
    Some(ImpactBadge {
        impact,
        label: label.to_uppercase(),
        css_class,
    })
}

// ---------------------------------------------------------------------------
// Entity tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTags {
    pub visible: Vec<String>,
    /// Count behind the "+N" badge; 0 means no badge.
    pub overflow: usize,
}

pub fn entity_tags(entities: &[String]) -> EntityTags {
    EntityTags {
        visible: entities.iter().take(MAX_VISIBLE_ENTITIES).cloned().collect(),
        overflow: entities.len().saturating_sub(MAX_VISIBLE_ENTITIES),
    }
}

// ---------------------------------------------------------------------------
// Relative time
// ---------------------------------------------------------------------------

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Human distance between `then` and `now`, e.g. "about 3 hours ago" or "in 2 days".
/// Months are 30-day spans rather than calendar months.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let past = seconds >= 0;
    let seconds = seconds.abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    let distance = if minutes < 1 {
        "less than a minute".to_string()
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        format!("about {}", plural(hours, "hour"))
    } else if minutes < 2_520 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        plural(days, "day")
    } else if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        format!("about {}", plural(months, "month"))
    } else {
        let months = minutes / MINUTES_IN_MONTH;
        if months < 12 {
            let nearest = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
            plural(nearest, "month")
        } else {
            let years = months / 12;
            match months % 12 {
                0..=2 => format!("about {}", plural(years, "year")),
                3..=8 => format!("over {}", plural(years, "year")),
                _ => format!("almost {}", plural(years + 1, "year")),
            }
        }
    };

    if past {
        format!("{distance} ago")
    } else {
        format!("in {distance}")
    }
}

// ---------------------------------------------------------------------------
// Card view model
// ---------------------------------------------------------------------------

/// Display-ready shape of one event.
#[derive(Debug, Clone, Serialize)]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub alert: Option<String>,
    pub category: String,
    pub icon: CategoryIcon,
    pub severity: i32,
    pub severity_band: SeverityBand,
    /// Width of the severity bar in percent, 0..=100.
    pub severity_width: i32,
    pub confidence_level: ConfidenceLevel,
    pub confidence_percent: i64,
    pub impact: Option<ImpactBadge>,
    pub summary: Vec<String>,
    pub entities: EntityTags,
    pub published_at: DateTime<Utc>,
    pub relative_time: String,
    pub source_url: Option<String>,
}

impl EventCard {
    pub fn from_row(row: &EventRow, now: DateTime<Utc>) -> Self {
        Self {
            id: row.id.clone(),
            title: row.title.clone(),
            alert: row.alert.clone().filter(|a| !a.is_empty()),
            category: row.category.clone(),
            icon: category_icon(&row.category),
            severity: row.severity,
            severity_band: SeverityBand::from_severity(row.severity),
            severity_width: row.severity.clamp(0, 100),
            confidence_level: ConfidenceLevel::from_confidence(row.confidence),
            confidence_percent: confidence_percent(row.confidence),
            impact: impact_badge(&row.market_impact),
            summary: row.summary.iter().take(MAX_SUMMARY_POINTS).cloned().collect(),
            entities: entity_tags(&row.entities),
            published_at: row.published_at,
            relative_time: relative_time(row.published_at, now),
            source_url: row.source_url.clone().filter(|u| !u.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Server-rendered markup for the landing page and the event feed.

use std::fmt::Write;

use crate::config::{ALL_CATEGORIES, SKELETON_CARDS};
use crate::error::AppError;
use crate::feed::display::EventCard;
use crate::types::Category;

pub const EMPTY_MESSAGE: &str = "No events found for this category.";

const STYLES: &str = r#"
body{margin:0;font-family:system-ui,sans-serif;background:#0b0d12;color:#e5e7eb}
a{color:inherit;text-decoration:none}
.container{max-width:1200px;margin:0 auto;padding:0 16px}
header.top{position:sticky;top:0;border-bottom:1px solid #1f2937;background:#0b0d12f2}
header.top .container{display:flex;justify-content:space-between;align-items:center;height:56px}
.brand{font-weight:700;font-size:1.25rem}
.live{border:1px solid #374151;border-radius:6px;padding:2px 6px;font-size:.75rem;margin-left:12px}
.live-dot{display:inline-block;width:8px;height:8px;border-radius:50%;background:#22c55e;margin-left:4px}
.btn{border:1px solid #374151;border-radius:6px;padding:4px 10px;font-size:.85rem;margin-left:6px}
.filters{border-bottom:1px solid #1f2937;background:#11141b}
.filters .container{display:flex;gap:8px;overflow-x:auto;padding:8px 16px}
.filter{padding:4px 10px;border-radius:6px;font-size:.85rem;color:#9ca3af}
.filter.active{background:#e5e7eb;color:#0b0d12}
main{padding:24px 0}
.event-grid{display:grid;gap:16px;grid-template-columns:repeat(auto-fill,minmax(320px,1fr))}
.card{position:relative;overflow:hidden;border:1px solid #1f2937;border-left-width:4px;border-radius:10px;background:#11141b;padding:16px}
.sev-bar{position:absolute;top:0;left:0;height:4px;background:linear-gradient(90deg,#6366f1,#6366f180)}
.card-head{display:flex;justify-content:space-between;gap:16px}
.icon{padding:6px 8px;border-radius:8px}
.cat{border:1px solid #374151;border-radius:6px;padding:2px 6px;font-size:.75rem;margin-left:6px}
.score{font-size:1.125rem;font-weight:700;text-align:right}
.card h3{font-size:1.1rem;margin:10px 0}
.alert{font-style:italic;color:#9ca3af;border-left:2px solid #6366f1;padding-left:10px}
.summary{color:#9ca3af;font-size:.9rem;padding-left:18px}
.card-foot{display:flex;justify-content:space-between;align-items:center;border-top:1px solid #1f2937;padding-top:8px;font-size:.75rem}
.tag{background:#1f2937;border-radius:6px;padding:2px 6px;margin-right:4px}
.tag.more{background:none;border:1px solid #374151}
.impact{border-radius:6px;padding:2px 6px;margin-right:8px}
.sev-critical{border-left-color:#ef4444}.sev-critical .icon,.sev-critical .score{color:#f87171}.sev-critical .icon{background:#ef444433}
.sev-significant{border-left-color:#f97316}.sev-significant .icon,.sev-significant .score{color:#fb923c}.sev-significant .icon{background:#f9731633}
.sev-moderate{border-left-color:#eab308}.sev-moderate .icon{color:#facc15;background:#eab30833}
.sev-low{border-left-color:#22c55e}.sev-low .icon{color:#4ade80;background:#22c55e33}
.conf-high{color:#4ade80}.conf-medium{color:#facc15}.conf-low{color:#f87171}
.impact-high{background:#ef444433;color:#f87171}.impact-medium{background:#eab30833;color:#facc15}.impact-low{background:#3b82f633;color:#60a5fa}.impact-none{background:#6b728033;color:#9ca3af}
.empty-state,.error-state{text-align:center;padding:80px 0;color:#9ca3af}
.error-state{color:#f87171}
.load-more{display:flex;justify-content:center;margin-top:32px}
.skeleton .block{background:#1f2937;border-radius:4px;margin-bottom:8px}
.skeleton{animation:pulse 2s infinite}
@keyframes pulse{50%{opacity:.5}}
.hero{text-align:center;padding:120px 0 80px}
.hero h1{font-size:3.5rem;margin-bottom:16px}
.features{display:grid;gap:24px;grid-template-columns:repeat(auto-fit,minmax(220px,1fr));padding:40px 0}
.feature{display:block;border:1px solid #1f2937;border-radius:10px;padding:20px}
.feature:hover{border-color:#6366f1}
"#;

/// Escape text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Only web links are rendered; any other scheme from upstream data is dropped.
fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{STYLES}</style></head><body>{body}</body></html>",
        escape_html(title)
    )
}

// ---------------------------------------------------------------------------
// Landing page
// ---------------------------------------------------------------------------

/// (href, title, description)
const FEATURES: &[(&str, &str, &str)] = &[
    ("/feed", "Intel Feed", "Real-time events scored for severity and confidence, filtered before they reach you."),
    ("/feed?category=Market", "Market Impact", "Every event is tagged with its expected effect on financial markets."),
    ("#alerts", "Alerts", "High-severity events are pushed as soon as they clear verification."),
    ("#api", "API", "The same scored feed is available as JSON for your own tooling."),
];

pub fn landing_page() -> String {
    let mut body = String::new();
    body.push_str(
        "<header class=\"top\"><div class=\"container\"><span class=\"brand\">\u{26A1} MetaNews</span>\
         <a class=\"btn\" href=\"/feed\">Feed</a></div></header>",
    );
    body.push_str(
        "<section class=\"hero container\"><span class=\"live\">SYSTEM ONLINE<span class=\"live-dot\"></span></span>\
         <h1>Signal over Noise.</h1>\
         <p>Real-time OSINT and market intelligence engine that detects, verifies, scores, \
         and distributes events that actually matter.</p>\
         <a class=\"btn\" href=\"/feed\">View Live Feed \u{2192}</a></section>",
    );
    body.push_str("<section class=\"container\"><h2>Intelligence at Scale</h2><div class=\"features\">");
    for (href, title, description) in FEATURES {
        let _ = write!(
            body,
            "<a class=\"feature\" href=\"{}\"><h3>{}</h3><p>{}</p></a>",
            escape_html(href),
            escape_html(title),
            escape_html(description)
        );
    }
    body.push_str("</div></section>");
    layout("MetaNews", &body)
}

// ---------------------------------------------------------------------------
// Feed page
// ---------------------------------------------------------------------------

/// Everything the feed page needs. `selected` is the raw category parameter or "All".
pub struct FeedPage<'a> {
    pub selected: &'a str,
    pub cards: &'a [EventCard],
    pub limit: i64,
    /// Millisecond timestamp used to bust caches on the refresh link.
    pub now_ms: i64,
}

fn feed_header(selected: &str, now_ms: i64) -> String {
    format!(
        "<header class=\"top\"><div class=\"container\">\
         <div><a class=\"brand\" href=\"/\">\u{26A1} Intel Feed</a>\
         <span class=\"live\">LIVE<span class=\"live-dot\"></span></span></div>\
         <div><a class=\"btn\" href=\"/feed\">Clear</a>\
         <a class=\"btn\" href=\"/feed?category={}&amp;t={now_ms}\" title=\"Refresh\">\u{21BB}</a></div>\
         </div></header>",
        escape_html(&urlencoding::encode(selected))
    )
}

fn category_bar(selected: &str) -> String {
    let mut out = String::from("<nav class=\"filters\"><div class=\"container\">");
    let options = std::iter::once(ALL_CATEGORIES).chain(Category::FILTERABLE.iter().map(|c| c.as_str()));
    for option in options {
        let href = if option == ALL_CATEGORIES {
            "/feed".to_string()
        } else {
            format!("/feed?category={option}")
        };
        let class = if option == selected { "filter active" } else { "filter" };
        let _ = write!(out, "<a class=\"{class}\" href=\"{href}\">{option}</a>");
    }
    out.push_str("</div></nav>");
    out
}

pub fn render_empty_state() -> String {
    format!("<div class=\"empty-state\"><p>{EMPTY_MESSAGE}</p></div>")
}

pub fn render_card(card: &EventCard) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<article class=\"card {band}\" data-id=\"{id}\" data-band=\"{band_name}\">\
         <div class=\"sev-bar\" style=\"width:{width}%\"></div>\
         <div class=\"card-head\"><div>\
         <span class=\"icon\" data-icon=\"{icon_name}\">{glyph}</span>\
         <span class=\"cat\">{category}</span></div>\
         <div><div class=\"score\">{severity}</div>\
         <div class=\"{conf_class}\" title=\"{conf_label}\">{conf_glyph} {percent}%</div></div></div>\
         <h3>{title}</h3>",
        band = card.severity_band.css_class(),
        id = escape_html(&card.id),
        band_name = card.severity_band.as_str(),
        width = card.severity_width,
        icon_name = card.icon.name,
        glyph = card.icon.glyph,
        category = escape_html(&card.category),
        severity = card.severity,
        conf_class = card.confidence_level.css_class(),
        conf_label = card.confidence_level.label(),
        conf_glyph = card.confidence_level.glyph(),
        percent = card.confidence_percent,
        title = escape_html(&card.title),
    );

    if let Some(alert) = &card.alert {
        let _ = write!(out, "<p class=\"alert\">{}</p>", escape_html(alert));
    }

    if !card.summary.is_empty() {
        out.push_str("<ul class=\"summary\">");
        for point in &card.summary {
            let _ = write!(out, "<li>{}</li>", escape_html(point));
        }
        out.push_str("</ul>");
    }

    out.push_str("<div class=\"card-foot\"><div>");
    for entity in &card.entities.visible {
        let _ = write!(out, "<span class=\"tag\">{}</span>", escape_html(entity));
    }
    if card.entities.overflow > 0 {
        let _ = write!(out, "<span class=\"tag more\">+{}</span>", card.entities.overflow);
    }
    out.push_str("</div><div>");
    if let Some(badge) = &card.impact {
        let _ = write!(
            out,
            "<span class=\"impact {}\">{}</span>",
            badge.css_class,
            escape_html(&badge.label)
        );
    }
    let _ = write!(
        out,
        "<time datetime=\"{}\">{}</time>",
        card.published_at.to_rfc3339(),
        escape_html(&card.relative_time)
    );
    if let Some(url) = card.source_url.as_deref().filter(|u| is_web_url(u)) {
        let _ = write!(
            out,
            " <a class=\"source\" href=\"{}\" rel=\"noopener noreferrer\" target=\"_blank\">source</a>",
            escape_html(url)
        );
    }
    out.push_str("</div></div></article>");
    out
}

pub fn render_skeleton_card() -> String {
    "<article class=\"card skeleton\">\
     <div class=\"card-head\"><div class=\"block\" style=\"width:96px;height:28px\"></div>\
     <div class=\"block\" style=\"width:32px;height:32px\"></div></div>\
     <div class=\"block\" style=\"width:100%;height:24px\"></div>\
     <div class=\"block\" style=\"width:100%;height:16px\"></div>\
     <div class=\"block\" style=\"width:75%;height:16px\"></div>\
     </article>"
        .to_string()
}

pub fn render_feed_page(page: &FeedPage<'_>) -> String {
    let mut body = feed_header(page.selected, page.now_ms);
    body.push_str(&category_bar(page.selected));
    body.push_str("<main class=\"container\">");

    if page.cards.is_empty() {
        body.push_str(&render_empty_state());
    } else {
        body.push_str("<div class=\"event-grid\">");
        for card in page.cards {
            body.push_str(&render_card(card));
        }
        body.push_str("</div>");
    }

    // Placeholder until offset pagination is wired to the page.
    if page.cards.len() as i64 >= page.limit {
        body.push_str(
            "<div class=\"load-more\"><button class=\"btn\" type=\"button\" disabled>Load More Events</button></div>",
        );
    }

    body.push_str("</main>");
    layout("Intel Feed", &body)
}

/// Feed chrome with skeleton cards in place of data.
pub fn render_loading_page(selected: &str, now_ms: i64) -> String {
    let mut body = feed_header(selected, now_ms);
    body.push_str(&category_bar(selected));
    body.push_str("<main class=\"container\"><div class=\"event-grid\" aria-busy=\"true\">");
    for _ in 0..SKELETON_CARDS {
        body.push_str(&render_skeleton_card());
    }
    body.push_str("</div></main>");
    layout("Intel Feed", &body)
}

/// Shown when the events could not be loaded; never confused with the empty state.
pub fn render_error_page(selected: &str, now_ms: i64, err: &AppError) -> String {
    let message = if err.is_connectivity() {
        "The event database is unreachable right now."
    } else {
        "Events could not be loaded."
    };
    let mut body = feed_header(selected, now_ms);
    body.push_str(&category_bar(selected));
    let _ = write!(
        body,
        "<main class=\"container\"><div class=\"error-state\" role=\"alert\">\
         <p>{message}</p><p><a class=\"btn\" href=\"/feed?category={}&amp;t={now_ms}\">Try again</a></p>\
         </div></main>",
        escape_html(&urlencoding::encode(selected))
    );
    layout("Intel Feed", &body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::display::tests::sample_row;
    use chrono::Duration;

    fn card_from(mutate: impl FnOnce(&mut crate::db::EventRow)) -> EventCard {
        let mut row = sample_row();
        mutate(&mut row);
        EventCard::from_row(&row, row.published_at + Duration::minutes(5))
    }

    fn page<'a>(selected: &'a str, cards: &'a [EventCard]) -> String {
        render_feed_page(&FeedPage {
            selected,
            cards,
            limit: 50,
            now_ms: 1_700_000_000_000,
        })
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
        let card = card_from(|r| r.title = "<script>alert(1)</script>".into());
        let html = render_card(&card);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn critical_card_markup() {
        let html = render_card(&card_from(|_| {}));
        assert!(html.contains("class=\"card sev-critical\""));
        assert!(html.contains("class=\"conf-high\""));
        assert!(html.contains("89%"));
        assert!(html.contains("data-icon=\"swords\""));
        assert!(html.contains("width:92%"));
        assert!(html.contains("5 minutes ago"));
    }

    #[test]
    fn impact_badge_only_when_not_none() {
        let none = render_card(&card_from(|r| r.market_impact = "none".into()));
        assert!(!none.contains("class=\"impact "));

        let high = render_card(&card_from(|r| r.market_impact = "high".into()));
        assert!(high.contains("<span class=\"impact impact-high\">HIGH</span>"));

        let unknown = render_card(&card_from(|r| r.market_impact = "severe".into()));
        assert!(unknown.contains("<span class=\"impact impact-none\">SEVERE</span>"));
    }

    #[test]
    fn five_entities_show_three_and_overflow() {
        let html = render_card(&card_from(|_| {}));
        assert_eq!(html.matches("<span class=\"tag\">").count(), 3);
        assert!(html.contains("<span class=\"tag more\">+2</span>"));

        let few = render_card(&card_from(|r| r.entities = vec!["only".into()]));
        assert!(!few.contains("tag more"));
    }

    #[test]
    fn summary_capped_at_three_in_order() {
        let html = render_card(&card_from(|_| {}));
        assert!(html.contains("<li>one</li><li>two</li><li>three</li></ul>"));
        assert!(!html.contains("four"));

        let bare = render_card(&card_from(|r| r.summary.clear()));
        assert!(!bare.contains("<ul"));
    }

    #[test]
    fn unknown_category_still_renders() {
        let html = render_card(&card_from(|r| r.category = "Sports".into()));
        assert!(html.contains("data-icon=\"newspaper\""));
        assert!(html.contains(">Sports</span>"));
    }

    #[test]
    fn empty_feed_uses_empty_state_not_grid() {
        let html = page("Energy", &[]);
        assert!(html.contains(EMPTY_MESSAGE));
        assert!(!html.contains("class=\"event-grid\""));
        assert!(!html.contains("Load More"));
    }

    #[test]
    fn populated_feed_uses_grid() {
        let cards = vec![card_from(|_| {}), card_from(|r| r.id = "evt-2".into())];
        let html = page("All", &cards);
        assert!(html.contains("class=\"event-grid\""));
        assert_eq!(html.matches("<article class=\"card ").count(), 2);
        assert!(!html.contains(EMPTY_MESSAGE));
    }

    #[test]
    fn load_more_placeholder_at_limit() {
        let cards = vec![card_from(|_| {})];
        let html = render_feed_page(&FeedPage {
            selected: "All",
            cards: &cards,
            limit: 1,
            now_ms: 0,
        });
        assert!(html.contains("Load More Events"));
    }

    #[test]
    fn navigation_links() {
        let html = page("Market", &[]);
        assert!(html.contains("<a class=\"filter active\" href=\"/feed?category=Market\">Market</a>"));
        assert!(html.contains("<a class=\"filter\" href=\"/feed\">All</a>"));
        assert!(html.contains("href=\"/feed\">Clear</a>"));
        assert!(html.contains("/feed?category=Market&amp;t=1700000000000"));
        assert!(!html.contains(">Other</a>"));
    }

    #[test]
    fn refresh_link_encodes_category() {
        let html = page("a b&c", &[]);
        assert!(html.contains("/feed?category=a%20b%26c&amp;t="));
    }

    #[test]
    fn loading_page_has_only_skeletons() {
        let html = render_loading_page("All", 0);
        assert_eq!(html.matches("card skeleton").count(), SKELETON_CARDS);
        assert!(!html.contains(EMPTY_MESSAGE));
    }

    #[test]
    fn error_page_is_distinct_from_empty() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        let html = render_error_page("All", 0, &err);
        assert!(html.contains("role=\"alert\""));
        assert!(html.contains("unreachable"));
        assert!(!html.contains(EMPTY_MESSAGE));
    }

    #[test]
    fn landing_links_to_feed() {
        let html = landing_page();
        assert!(html.contains("Signal over Noise."));
        assert!(html.contains("href=\"/feed\""));
        assert!(html.contains("<a class=\"feature\" href=\"/feed?category=Market\"><h3>Market Impact</h3>"));
        assert_eq!(html.matches("<a class=\"feature\"").count(), 4);
    }

    #[test]
    fn source_link_only_for_web_urls() {
        let html = render_card(&card_from(|_| {}));
        assert!(html.contains("href=\"https://example.org/story\""));

        for url in ["javascript:alert(document.cookie)", " JavaScript:alert(1)", "data:text/html,x", "//evil.test"] {
            let html = render_card(&card_from(|r| r.source_url = Some(url.into())));
            assert!(!html.contains("class=\"source\""), "{url} was linked");
            assert!(!html.contains("alert(document.cookie)"));
        }
    }
}

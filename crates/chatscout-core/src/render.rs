//! Minimal text-to-HTML rendering for analysis cards.
//!
//! Only line breaks and `**bold**` spans are converted. Lists, headers, links and
//! code spans pass through as literal text.

use crate::AnalysisCard;
use regex::Regex;
use std::sync::LazyLock;

/// Shown in place of an empty or missing model response.
pub const NO_CONTENT: &str = "暂无内容";

static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    // Non-greedy so `**a** and **b**` yields two spans.
    Regex::new(r"\*\*(.*?)\*\*").expect("static regex")
});

pub fn format_html(text: Option<&str>) -> String {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return NO_CONTENT.to_string(),
    };
    let with_breaks = text.replace('\n', "<br>");
    BOLD.replace_all(&with_breaks, "<b>$1</b>").into_owned()
}

/// Titles come from the template file as plain text.
fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn render_card(card: &AnalysisCard) -> String {
    format!(
        "<div class=\"chatscout-card\"><h3>{}</h3><div class=\"chatscout-card-body\">{}</div></div>",
        escape_text(&card.title),
        card.body_html
    )
}

/// The whole accumulated card list, as written to the display surface.
pub fn render_cards(cards: &[AnalysisCard]) -> String {
    cards.iter().map(render_card).collect()
}

/// Intermediate progress line shown while a stage is in flight.
pub fn render_status(message: &str) -> String {
    format!("<div class=\"chatscout-status\">{message}</div>")
}

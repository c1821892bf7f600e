use serde::{Deserialize, Serialize};

/// Maximum number of organic results kept per search.
pub const MAX_HITS: usize = 5;

/// Appended to every query to keep fiction/fandom pages out of the evidence.
pub const EXCLUSION_SUFFIX: &str =
    " -同人 -小说 -网文 -穿越 -重生 -耽美 -fanfiction -wattpad -webnovel";

/// Evidence text used when the search request itself failed.
pub const SEARCH_FAILED_TEXT: &str = "搜索失败，无法获取外部资料。";

pub const EVIDENCE_HEADER: &str = "Search results:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

/// The exact query string sent to the provider.
pub fn wire_query(query: &str) -> String {
    format!("{query}{EXCLUSION_SUFFIX}")
}

/// Numbered text block, header first. Only the first [`MAX_HITS`] hits are used.
pub fn format_evidence(hits: &[SearchHit]) -> String {
    let mut out = String::from(EVIDENCE_HEADER);
    for (i, h) in hits.iter().take(MAX_HITS).enumerate() {
        out.push('\n');
        out.push_str(&format!("{}. {}\n   {}", i + 1, h.title, h.snippet));
    }
    out
}

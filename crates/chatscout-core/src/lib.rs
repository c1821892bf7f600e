//! Backend-agnostic types and pipeline logic for `chatscout`.
//!
//! This crate does no network IO. HTTP-backed clients live in `chatscout-local`;
//! the host (chat history, notifications, display surface) is reached through
//! the traits in [`host`].

use serde::{Deserialize, Serialize};

pub mod analyze;
pub mod host;
pub mod prompts;
pub mod render;
pub mod search;
pub mod settings;
pub mod shell;

pub use analyze::{Analyzer, RunOutcome, RunReport};
pub use search::{format_evidence, SearchHit, EXCLUSION_SUFFIX, SEARCH_FAILED_TEXT};
pub use settings::{Session, Settings};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One prompt template entry from the template file.
///
/// Entries are taken as written: absent or mistyped fields fall back to empty
/// strings, and only a literal `true` makes an entry a panel template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prompt: String,
    /// Output format hint: "json" asks for JSON, anything else for a list.
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    /// Whether the result is rendered as a card.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub panel: bool,
}

fn lenient_string<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_bool<'de, D>(d: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(matches!(
        serde_json::Value::deserialize(d)?,
        serde_json::Value::Bool(true)
    ))
}

impl PromptTemplate {
    pub fn wants_json(&self) -> bool {
        self.kind.trim().eq_ignore_ascii_case("json")
    }
}

/// A single chat message as exposed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub name: String,
    pub message: String,
}

/// A rendered analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCard {
    pub title: String,
    pub body_html: String,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_type_field_maps_to_kind_and_panel_defaults_false() {
        let js = r#"[
            {"title":"Lore","prompt":"Check lore","type":"json","panel":true},
            {"title":"Hidden","prompt":"x","type":"list"}
        ]"#;
        let ts: Vec<PromptTemplate> = serde_json::from_str(js).unwrap();
        assert_eq!(ts.len(), 2);
        assert!(ts[0].panel);
        assert!(ts[0].wants_json());
        assert!(!ts[1].panel);
        assert!(!ts[1].wants_json());
    }

    #[test]
    fn template_without_type_is_accepted() {
        let t: PromptTemplate =
            serde_json::from_str(r#"{"title":"a","prompt":"b","panel":true}"#).unwrap();
        assert_eq!(t.kind, "");
        assert!(!t.wants_json());
    }

    #[test]
    fn loosely_formed_template_fields_fall_back() {
        let js = r#"[
            {"prompt":"no title","panel":true},
            {"title":"A","prompt":"b","panel":null},
            {"title":7,"prompt":null,"type":false,"panel":"yes"}
        ]"#;
        let ts: Vec<PromptTemplate> = serde_json::from_str(js).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts[0].title, "");
        assert!(ts[0].panel);
        assert!(!ts[1].panel);
        assert_eq!(ts[2].title, "");
        assert_eq!(ts[2].prompt, "");
        assert_eq!(ts[2].kind, "");
        assert!(!ts[2].panel);
    }
}

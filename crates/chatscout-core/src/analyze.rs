//! The analysis pipeline: extract a query, search, run each panel template, render.

use crate::host::{chat_excerpt, ChatHistory, Notifier, Surface, CONTEXT_TURNS};
use crate::render::{format_html, render_cards, render_status};
use crate::search::{format_evidence, SEARCH_FAILED_TEXT};
use crate::{prompts, AnalysisCard, Error, LlmClient, SearchProvider, Session};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stage ran; some cards may still hold the placeholder.
    Completed,
    /// The query-extraction call failed or came back empty; nothing else ran.
    QueryFailed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::QueryFailed => "query_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub query: Option<String>,
    /// Text interpolated into the analysis prompts (may be empty or the failure text).
    pub evidence: Option<String>,
    pub cards: Vec<AnalysisCard>,
}

impl RunReport {
    fn query_failed() -> Self {
        Self {
            outcome: RunOutcome::QueryFailed,
            query: None,
            evidence: None,
            cards: Vec::new(),
        }
    }

    pub fn html(&self) -> String {
        render_cards(&self.cards)
    }
}

#[derive(Clone)]
pub struct Analyzer {
    session: Arc<Session>,
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchProvider>,
    notifier: Arc<dyn Notifier>,
}

impl Analyzer {
    pub fn new(
        session: Arc<Session>,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            llm,
            search,
            notifier,
        }
    }

    /// LLM call with errors surfaced to the user. `None` means "abort this stage".
    async fn ask(&self, prompt: &str) -> Option<String> {
        match self.llm.complete(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(provider = self.llm.name(), error = %e, "llm call failed");
                self.notifier.error(&e.to_string());
                None
            }
        }
    }

    /// Search degraded to prompt text: hits, `""` without a key, or the failure text.
    async fn evidence(&self, query: &str) -> String {
        match self.search.search(query).await {
            Ok(hits) => {
                debug!(hits = hits.len(), "search ok");
                format_evidence(&hits)
            }
            Err(Error::NotConfigured(msg)) => {
                self.notifier.error(&format!("not configured: {msg}"));
                String::new()
            }
            Err(e) => {
                warn!(provider = self.search.name(), error = %e, "search failed");
                SEARCH_FAILED_TEXT.to_string()
            }
        }
    }

    pub async fn run(&self, history: &dyn ChatHistory, surface: &dyn Surface) -> RunReport {
        let excerpt = chat_excerpt(history.recent(CONTEXT_TURNS));

        surface.render(&render_status("正在分析聊天内容，提取搜索关键词…"));
        let Some(raw_query) = self.ask(&prompts::query_extraction(&excerpt)).await else {
            return RunReport::query_failed();
        };
        let query = raw_query.trim().to_string();
        if query.is_empty() {
            warn!("query extraction returned empty text");
            return RunReport::query_failed();
        }
        info!(%query, "extracted search query");

        surface.render(&render_status(&format!("正在搜索：{query}")));
        let evidence = self.evidence(&query).await;

        surface.render(&render_status("正在生成分析结果…"));
        let mut cards = Vec::new();
        for template in self.session.panel_templates() {
            let prompt = prompts::analysis(template, &evidence, &excerpt);
            let text = self.ask(&prompt).await;
            cards.push(AnalysisCard {
                title: template.title.clone(),
                body_html: format_html(text.as_deref()),
            });
            surface.render(&render_cards(&cards));
        }

        RunReport {
            outcome: RunOutcome::Completed,
            query: Some(query),
            evidence: Some(evidence),
            cards,
        }
    }
}

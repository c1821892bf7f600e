use chatscout_core::search::{wire_query, MAX_HITS};
use chatscout_core::{Error, Result, SearchHit, SearchProvider, Settings};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const SERPER_GL: &str = "cn";
const SERPER_HL: &str = "zh-cn";

fn serper_endpoint_from_env() -> Option<String> {
    crate::env("CHATSCOUT_SERPER_ENDPOINT")
}

#[derive(Debug, Clone)]
pub struct SerperSearchProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl SerperSearchProvider {
    pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Self {
        let api_key = Some(settings.search_api_key.trim().to_string()).filter(|k| !k.is_empty());
        Self {
            client,
            api_key,
            endpoint: serper_endpoint_from_env().unwrap_or_else(|| SERPER_ENDPOINT.to_string()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Pick the provider named by `settings.search_provider`.
pub fn provider_from_settings(
    client: reqwest::Client,
    settings: &Settings,
) -> Result<Arc<dyn SearchProvider>> {
    match settings.search_provider.trim().to_ascii_lowercase().as_str() {
        "serper" | "" => Ok(Arc::new(SerperSearchProvider::from_settings(
            client, settings,
        ))),
        other => Err(Error::NotSupported(format!(
            "unknown search_provider {other:?} (allowed: serper)"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    organic: Option<Vec<SerperOrganic>>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    title: Option<String>,
    snippet: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for SerperSearchProvider {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NotConfigured("missing search_api_key".to_string()));
        };
        let t0 = Instant::now();

        let body = serde_json::json!({
            "q": wire_query(query),
            "gl": SERPER_GL,
            "hl": SERPER_HL,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("serper search HTTP {status}")));
        }

        let parsed: SerperResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let out: Vec<SearchHit> = parsed
            .organic
            .unwrap_or_default()
            .into_iter()
            .take(MAX_HITS)
            .map(|r| SearchHit {
                title: r.title.unwrap_or_default(),
                snippet: r.snippet.unwrap_or_default(),
            })
            .collect();
        debug!(
            hits = out.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "serper search"
        );
        Ok(out)
    }
}

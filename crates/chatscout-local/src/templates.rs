use chatscout_core::{Error, PromptTemplate, Result};
use tracing::{error, info, warn};

fn is_url(source: &str) -> bool {
    let s = source.trim_start().to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://")
}

async fn fetch_text(client: &reqwest::Client, source: &str) -> Result<String> {
    if !is_url(source) {
        return std::fs::read_to_string(source).map_err(|e| Error::Io(format!("{source}: {e}")));
    }
    let resp = client
        .get(source)
        .send()
        .await
        .map_err(|e| Error::Config(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Config(format!("template fetch HTTP {status}")));
    }
    resp.text().await.map_err(|e| Error::Config(e.to_string()))
}

pub async fn try_load_templates(
    client: &reqwest::Client,
    source: &str,
) -> Result<Vec<PromptTemplate>> {
    let txt = fetch_text(client, source).await?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&txt).map_err(|e| Error::Config(format!("{source}: {e}")))?;
    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<PromptTemplate>(entry) {
            Ok(t) => out.push(t),
            Err(e) => warn!(%source, index = i, error = %e, "skipping prompt template entry"),
        }
    }
    Ok(out)
}

/// Load the template list from a path or URL. Any failure is logged and yields an empty list.
pub async fn load_templates(client: &reqwest::Client, source: &str) -> Vec<PromptTemplate> {
    match try_load_templates(client, source).await {
        Ok(ts) => {
            info!(
                total = ts.len(),
                panel = ts.iter().filter(|t| t.panel).count(),
                "loaded prompt templates"
            );
            ts
        }
        Err(e) => {
            error!(%source, error = %e, "failed to load prompt templates");
            Vec::new()
        }
    }
}

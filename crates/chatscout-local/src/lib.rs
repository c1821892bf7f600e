use chatscout_core::{Error, Result};

pub mod openai_compat;
pub mod search;
pub mod store;
pub mod templates;

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Shared HTTP client for the LLM, search and template requests.
///
/// No request timeout is set: a stalled call stalls only the run that made it.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("chatscout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Io(e.to_string()))
}

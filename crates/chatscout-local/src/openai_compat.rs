use chatscout_core::{Error, LlmClient, Result, Settings};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Self {
        let api_key = Some(settings.api_key.trim().to_string()).filter(|k| !k.is_empty());
        Self {
            client,
            base_url: settings.api_url.trim().to_string(),
            api_key,
            model: settings.analysis_model.clone(),
        }
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        "openai_compat"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NotConfigured("missing LLM api_key".to_string()));
        };

        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: TEMPERATURE,
        };
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "chat.completions");

        let resp = self
            .client
            .post(self.endpoint_chat_completions())
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "openai_compat chat.completions HTTP {status}"
            )));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::Llm("openai_compat response has no choices".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    // Some servers send null content for refusals.
    #[serde(default)]
    content: Option<String>,
}

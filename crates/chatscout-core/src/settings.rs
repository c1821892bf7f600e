use crate::PromptTemplate;
use serde::{Deserialize, Serialize};

/// Key under which the host keeps this extension's persisted settings.
pub const EXTENSION_KEY: &str = "chatscout";

pub const DEFAULT_SEARCH_PROVIDER: &str = "serper";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub search_api_key: String,
    pub search_provider: String,
    pub analysis_model: String,
    pub api_url: String,
    pub api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_api_key: String::new(),
            search_provider: DEFAULT_SEARCH_PROVIDER.to_string(),
            analysis_model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 5] = [
        "search_api_key",
        "search_provider",
        "analysis_model",
        "api_url",
        "api_key",
    ];

    /// Defaults, overridden key-by-key by whatever string values `persisted` carries.
    ///
    /// Unknown keys and non-string values are ignored; a non-object yields the defaults.
    pub fn merge_persisted(persisted: &serde_json::Value) -> Self {
        let mut out = Self::default();
        let Some(obj) = persisted.as_object() else {
            return out;
        };
        for key in Self::KEYS {
            if let Some(v) = obj.get(key).and_then(|v| v.as_str()) {
                out.set(key, v);
            }
        }
        out
    }

    /// Set one key by name. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "search_api_key" => &mut self.search_api_key,
            "search_provider" => &mut self.search_provider,
            "analysis_model" => &mut self.analysis_model,
            "api_url" => &mut self.api_url,
            "api_key" => &mut self.api_key,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn has_search_api_key(&self) -> bool {
        !self.search_api_key.trim().is_empty()
    }

    /// Settings as JSON with credentials replaced by a presence marker.
    pub fn redacted(&self) -> serde_json::Value {
        fn mask(s: &str) -> &'static str {
            if s.trim().is_empty() {
                ""
            } else {
                "<set>"
            }
        }
        serde_json::json!({
            "search_api_key": mask(&self.search_api_key),
            "search_provider": self.search_provider,
            "analysis_model": self.analysis_model,
            "api_url": self.api_url,
            "api_key": mask(&self.api_key),
        })
    }
}

/// Everything a run reads: settings and the loaded template list.
///
/// Built once at startup and shared; nothing in a run mutates it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub settings: Settings,
    pub templates: Vec<PromptTemplate>,
}

impl Session {
    pub fn new(settings: Settings, templates: Vec<PromptTemplate>) -> Self {
        Self {
            settings,
            templates,
        }
    }

    pub fn panel_templates(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.iter().filter(|t| t.panel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_values_override_defaults_key_by_key() {
        let s = Settings::merge_persisted(&serde_json::json!({
            "api_key": "sk-1",
            "analysis_model": "my-model",
        }));
        assert_eq!(s.api_key, "sk-1");
        assert_eq!(s.analysis_model, "my-model");
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.search_provider, DEFAULT_SEARCH_PROVIDER);
        assert_eq!(s.search_api_key, "");
    }

    #[test]
    fn non_string_and_unknown_keys_are_ignored() {
        let s = Settings::merge_persisted(&serde_json::json!({
            "api_url": 42,
            "something_else": "x",
        }));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn non_object_yields_defaults() {
        assert_eq!(
            Settings::merge_persisted(&serde_json::json!(["api_key"])),
            Settings::default()
        );
        assert_eq!(
            Settings::merge_persisted(&serde_json::Value::Null),
            Settings::default()
        );
    }

    #[test]
    fn redacted_never_contains_secret_values() {
        let mut s = Settings::default();
        s.set("api_key", "sk-secret");
        let v = s.redacted().to_string();
        assert!(!v.contains("sk-secret"));
        assert!(v.contains("<set>"));
    }

    #[test]
    fn whitespace_keys_count_as_missing() {
        let mut s = Settings::default();
        assert!(s.set("search_api_key", "   "));
        assert!(!s.has_search_api_key());
        assert!(!s.set("nope", "x"));
    }

    #[test]
    fn panel_templates_keeps_order_and_filters() {
        let t = |title: &str, panel| PromptTemplate {
            title: title.to_string(),
            prompt: String::new(),
            kind: String::new(),
            panel,
        };
        let session = Session::new(
            Settings::default(),
            vec![t("a", true), t("b", false), t("c", true)],
        );
        let titles: Vec<_> = session.panel_templates().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }
}

//! Settings persistence: a JSON file keyed by extension name, plus env overrides.

use chatscout_core::settings::EXTENSION_KEY;
use chatscout_core::{Error, Result, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.json";
pub const TEMPLATES_FILE: &str = "templates.json";

/// `(env var, settings key)` pairs applied after the file.
const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("CHATSCOUT_API_KEY", "api_key"),
    ("CHATSCOUT_API_URL", "api_url"),
    ("CHATSCOUT_MODEL", "analysis_model"),
    ("CHATSCOUT_SEARCH_API_KEY", "search_api_key"),
    ("CHATSCOUT_SEARCH_PROVIDER", "search_provider"),
];

pub fn default_config_dir() -> PathBuf {
    if let Some(p) = crate::env("CHATSCOUT_CONFIG_DIR") {
        return PathBuf::from(p);
    }
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chatscout")
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// The whole file as a JSON object (other extensions' entries included).
    fn read_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let p = self.path();
        if !p.exists() {
            return Ok(serde_json::Map::new());
        }
        let txt = fs::read_to_string(&p).map_err(|e| Error::Io(e.to_string()))?;
        match serde_json::from_str::<serde_json::Value>(&txt) {
            Ok(serde_json::Value::Object(m)) => Ok(m),
            Ok(_) => Err(Error::Config(format!("{} is not a JSON object", p.display()))),
            Err(e) => Err(Error::Config(format!("{}: {e}", p.display()))),
        }
    }

    /// Persisted values only, merged over defaults. Unreadable files fall back to defaults.
    pub fn load_persisted(&self) -> Settings {
        match self.read_map() {
            Ok(m) => Settings::merge_persisted(
                m.get(EXTENSION_KEY).unwrap_or(&serde_json::Value::Null),
            ),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable settings file");
                Settings::default()
            }
        }
    }

    /// Persisted values with environment overrides applied on top.
    pub fn load(&self) -> Settings {
        let mut s = self.load_persisted();
        apply_env_overrides(&mut s);
        s
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let mut m = self.read_map()?;
        m.insert(
            EXTENSION_KEY.to_string(),
            serde_json::to_value(settings).map_err(|e| Error::Config(e.to_string()))?,
        );
        fs::create_dir_all(&self.dir).map_err(|e| Error::Io(e.to_string()))?;
        let body = serde_json::to_string_pretty(&serde_json::Value::Object(m))
            .map_err(|e| Error::Config(e.to_string()))?;
        fs::write(self.path(), body).map_err(|e| Error::Io(e.to_string()))
    }
}

pub fn apply_env_overrides(settings: &mut Settings) {
    for (var, key) in ENV_OVERRIDES {
        if let Some(v) = crate::env(var) {
            settings.set(key, &v);
        }
    }
}

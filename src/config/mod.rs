use serde::{Deserialize, Serialize};

pub(crate) const FALLBACK_API_URL: &str = "http://localhost:8069";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub db: Option<String>,
    pub log_level: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .filter(|o| o.starts_with("http"));

        Self::from_lookup(
            |key| {
                let env = env.as_ref()?;
                js_sys::Reflect::get(env, &key.into()).ok()?.as_string()
            },
            origin,
        )
    }

    /// Resolve settings from a key lookup.
    ///
    /// We support BOTH upper-case keys (`API_URL`, documented) and lower-case
    /// keys (`api_url`) for each setting.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, origin: Option<String>) -> Self {
        let get = |upper: &str, lower: &str| {
            lookup(upper)
                .or_else(|| lookup(lower))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let api_url = get("API_URL", "api_url")
            .or(origin)
            .unwrap_or_else(|| FALLBACK_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            api_url,
            db: get("DB", "db"),
            log_level: get("LOG_LEVEL", "log_level").unwrap_or_else(|| "info".to_string()),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

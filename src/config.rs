use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/lifemuseum.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` runs the biographer offline.
    pub gemini: Option<GeminiConfig>,
    pub secure_cookies: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} still holds a placeholder value")]
    Placeholder { var: &'static str },
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn is_placeholder(value: &str) -> bool {
    value.contains("YOUR_") || value.contains("PASTE_YOUR")
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        if is_placeholder(&database_url) {
            return Err(ConfigError::Placeholder { var: "DATABASE_URL" });
        }
        if !database_url.starts_with("sqlite:") {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL",
                reason: "expected a sqlite: URL".to_string(),
            });
        }

        let bind_addr: SocketAddr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let secure_cookies = match get("SECURE_COOKIES").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SECURE_COOKIES",
                    reason: format!("expected true or false, got {other}"),
                });
            }
        };

        let gemini = match get("GEMINI_API_KEY") {
            Some(key) if is_placeholder(&key) => {
                tracing::warn!("GEMINI_API_KEY is a placeholder; AI features will use fallbacks");
                None
            }
            Some(api_key) => Some(GeminiConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            }),
            None => {
                tracing::warn!("GEMINI_API_KEY is not set; AI features will use fallbacks");
                None
            }
        };

        Ok(Self {
            database_url,
            bind_addr,
            gemini,
            secure_cookies,
        })
    }
}

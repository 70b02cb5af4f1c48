// src/config.rs
//! Startup configuration: secrets from the environment, tunables from an
//! optional TOML file. Anything missing here is fatal before the run begins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PUSHOVER_USER: &str = "PUSHOVER_USER";
pub const ENV_PUSHOVER_TOKEN: &str = "PUSHOVER_TOKEN";
pub const ENV_CONFIG_PATH: &str = "NEWS_AGENT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("NEWS_AGENT_CONFIG points to non-existent path {}", .0.display())]
    MissingFile(PathBuf),

    #[error("reading config from {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn default_document_path() -> PathBuf {
    PathBuf::from("index.html")
}
fn default_heading() -> String {
    "AI News of the month".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_search_context_size() -> String {
    "high".to_string()
}
fn default_search_timeout_secs() -> u64 {
    120
}
fn default_pushover_url() -> String {
    crate::notify::pushover::DEFAULT_PUSHOVER_URL.to_string()
}
fn default_notify_timeout_secs() -> u64 {
    10
}
fn default_preferred_sources() -> Vec<String> {
    [
        "Science Daily",
        "Nature",
        "arXiv",
        "MIT News",
        "IEEE Spectrum",
        "Stanford News",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Non-secret tunables. Every field has a default so the file is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,
    /// Heading text that marks the replaceable region.
    #[serde(default = "default_heading")]
    pub heading: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    /// "low" | "medium" | "high"
    #[serde(default = "default_search_context_size")]
    pub search_context_size: String,
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_pushover_url")]
    pub pushover_url: String,
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
    #[serde(default)]
    pub notify_priority: i8,
    #[serde(default = "default_preferred_sources")]
    pub preferred_sources: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            heading: default_heading(),
            model: default_model(),
            openai_base_url: default_openai_base_url(),
            search_context_size: default_search_context_size(),
            search_timeout_secs: default_search_timeout_secs(),
            pushover_url: default_pushover_url(),
            notify_timeout_secs: default_notify_timeout_secs(),
            notify_priority: 0,
            preferred_sources: default_preferred_sources(),
        }
    }
}

impl AgentSettings {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data, path)
    }

    fn parse(data: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut settings: AgentSettings =
            toml::from_str(data).map_err(|source| ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;

        settings.search_context_size = settings.search_context_size.to_ascii_lowercase();
        if !matches!(
            settings.search_context_size.as_str(),
            "low" | "medium" | "high"
        ) {
            settings.search_context_size = default_search_context_size();
        }
        settings.notify_priority = settings.notify_priority.clamp(-2, 2);
        settings.openai_base_url = settings.openai_base_url.trim_end_matches('/').to_string();

        Ok(settings)
    }

    /// Resolve settings using:
    /// 1) an explicit path (CLI)
    /// 2) $NEWS_AGENT_CONFIG (must exist)
    /// 3) config/agent.toml
    /// 4) built-in defaults
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(p) = explicit {
            return Self::load_from_file(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingFile(pb));
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default())
    }
}

/// Credentials for the search capability and the push endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub pushover_user: String,
    pub pushover_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key_len", &self.openai_api_key.len())
            .field("pushover_user_len", &self.pushover_user.len())
            .field("pushover_token_len", &self.pushover_token.len())
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` but reads through `lookup`, so tests don't touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        Ok(Self {
            openai_api_key: require(ENV_OPENAI_API_KEY)?,
            pushover_user: require(ENV_PUSHOVER_USER)?,
            pushover_token: require(ENV_PUSHOVER_TOKEN)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub credentials: Credentials,
    pub settings: AgentSettings,
}

impl AgentConfig {
    pub fn load(explicit_settings: Option<&Path>) -> Result<Self, ConfigError> {
        let credentials = Credentials::from_env()?;
        let settings = AgentSettings::load_default(explicit_settings)?;
        Ok(Self {
            credentials,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn all_credentials_present() {
        let creds = Credentials::from_lookup(lookup_from(&[
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_PUSHOVER_USER, " u1 "),
            (ENV_PUSHOVER_TOKEN, "t1"),
        ]))
        .unwrap();
        assert_eq!(creds.openai_api_key, "sk-test");
        assert_eq!(creds.pushover_user, "u1");
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let err = Credentials::from_lookup(lookup_from(&[
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_PUSHOVER_USER, "   "),
            (ENV_PUSHOVER_TOKEN, "t1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_PUSHOVER_USER)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::from_lookup(lookup_from(&[
            (ENV_OPENAI_API_KEY, "sk-very-secret"),
            (ENV_PUSHOVER_USER, "user"),
            (ENV_PUSHOVER_TOKEN, "token"),
        ]))
        .unwrap();
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(dbg.contains("openai_api_key_len"));
    }

    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes() {
        let toml = r#"
heading = "Research pick"
search_context_size = "HUGE"
notify_priority = 7
openai_base_url = "http://localhost:9000/"
"#;
        let s = AgentSettings::parse(toml, Path::new("inline.toml")).unwrap();
        assert_eq!(s.heading, "Research pick");
        assert_eq!(s.search_context_size, "high");
        assert_eq!(s.notify_priority, 2);
        assert_eq!(s.openai_base_url, "http://localhost:9000");
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.document_path, PathBuf::from("index.html"));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        assert_eq!(AgentSettings::load_default(None).unwrap(), AgentSettings::default());

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_PATH),
            r#"model = "gpt-4o""#,
        )
        .unwrap();
        assert_eq!(AgentSettings::load_default(None).unwrap().model, "gpt-4o");

        let p_env = tmp.path().join("other.toml");
        fs::write(&p_env, r#"document_path = "site/index.html""#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
        let s = AgentSettings::load_default(None).unwrap();
        assert_eq!(s.document_path, PathBuf::from("site/index.html"));
        assert_eq!(s.model, "gpt-4o-mini");

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(matches!(
            AgentSettings::load_default(None),
            Err(ConfigError::MissingFile(_))
        ));
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

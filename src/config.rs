//! Startup configuration.
//!
//! Credentials are resolved once, from the process environment after any
//! dotenv files have been loaded, and passed to the pipeline as plain values.
//! Lookups go through a closure so tests can supply their own variables.

use crate::error::{PubmedError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Default E-utilities base URL
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Google Generative Language API, OpenAI-compatible surface
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default model name
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

/// Environment variables holding the LLM credential, in priority order
pub const LLM_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "LLM_API_KEY"];

/// Optional NCBI key, raises the E-utilities rate limit
pub const NCBI_KEY_VAR: &str = "NCBI_API_KEY";

/// Application directory name under the user config dir
const APP_DIR: &str = "rustpubmed";

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    /// Build from a variable lookup. Fails if no credential is set.
    pub fn from_lookup<F>(lookup: F, base_url: &str, model: &str) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = LLM_KEY_VARS
            .iter()
            .find_map(|var| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                PubmedError::Config(format!(
                    "missing LLM API key: set {} in the environment or a .env file",
                    LLM_KEY_VARS.join(" or ")
                ))
            })?;

        if model.trim().is_empty() {
            return Err(PubmedError::Config("LLM model name is empty".to_string()));
        }

        Ok(Self {
            base_url: validate_base_url(base_url)?,
            api_key,
            model: model.trim().to_string(),
        })
    }

    /// Build from the process environment.
    pub fn from_env(base_url: &str, model: &str) -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok(), base_url, model)
    }
}

/// NCBI E-utilities configuration
#[derive(Debug, Clone)]
pub struct EutilsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// ESearch `retmax`
    pub max_results: u32,
}

impl EutilsConfig {
    pub fn from_lookup<F>(lookup: F, base_url: &str, max_results: u32) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if max_results == 0 {
            return Err(PubmedError::Config("--max must be at least 1".to_string()));
        }

        Ok(Self {
            base_url: validate_base_url(base_url)?,
            api_key: lookup(NCBI_KEY_VAR).filter(|k| !k.trim().is_empty()),
            max_results,
        })
    }

    pub fn from_env(base_url: &str, max_results: u32) -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok(), base_url, max_results)
    }
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EUTILS_URL.to_string(),
            api_key: None,
            max_results: 100,
        }
    }
}

/// Check that a base URL is absolute http(s) and strip the trailing slash.
fn validate_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| PubmedError::Config(format!("Invalid URL {:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        other => Err(PubmedError::Config(format!(
            "Unsupported URL scheme {:?} in {}",
            other, raw
        ))),
    }
}

/// User-level config file: `<config_dir>/rustpubmed/config.env`
pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR).join("config.env"))
}

/// Load dotenv files into the process environment.
///
/// Order: the explicit file, `./.env`, then the user config file. Variables
/// already present are never overridden. Returns the files that were loaded.
pub fn load_env_files(explicit: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut loaded = Vec::new();

    if let Some(path) = explicit {
        dotenvy::from_path(path).map_err(|e| {
            PubmedError::Config(format!("Failed to load {}: {}", path.display(), e))
        })?;
        loaded.push(path.to_path_buf());
    }

    match dotenvy::dotenv() {
        Ok(path) => loaded.push(path),
        Err(e) if e.not_found() => debug!("No .env file in working directory"),
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }

    if let Some(path) = user_env_file().filter(|p| p.exists()) {
        match dotenvy::from_path(&path) {
            Ok(()) => loaded.push(path),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable config file"),
        }
    }

    Ok(loaded)
}

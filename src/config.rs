//! TOML configuration and LLM endpoint resolution.
//!
//! The main [`Config`] is read from a TOML file once at startup. The LLM
//! endpoint settings ([`LlmConfig`]) are resolved separately because they
//! can come from three places, highest precedence first:
//!
//! 1. an explicit in-memory [`LlmOverrides`],
//! 2. the persisted JSON settings file (`summarization.llm_config_path`),
//! 3. environment defaults (`OPENAI_API_BASE_URL`, `OPENAI_API_KEY`,
//!    `SUMMARIZATION_MODEL`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub summarization: SummarizationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            language: default_language(),
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
        }
    }
}

fn default_dpi() -> u32 {
    200
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}
fn default_tesseract() -> String {
    "tesseract".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizationConfig {
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fallback_chars")]
    pub fallback_chars: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_llm_config_path")]
    pub llm_config_path: PathBuf,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            summary_max_tokens: default_summary_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            fallback_chars: default_fallback_chars(),
            max_retries: 0,
            llm_config_path: default_llm_config_path(),
        }
    }
}

fn default_max_tokens_per_chunk() -> usize {
    8000
}
fn default_summary_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_fallback_chars() -> usize {
    500
}
fn default_llm_config_path() -> PathBuf {
    PathBuf::from("./config/llm_config.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// A config with every section defaulted, pointing at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            ocr: OcrConfig::default(),
            summarization: SummarizationConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.summarization.max_tokens_per_chunk == 0 {
            anyhow::bail!("summarization.max_tokens_per_chunk must be > 0");
        }
        if self.summarization.fallback_chars == 0 {
            anyhow::bail!("summarization.fallback_chars must be > 0");
        }
        if !(0.0..=2.0).contains(&self.summarization.temperature) {
            anyhow::bail!("summarization.temperature must be in [0.0, 2.0]");
        }
        if self.ocr.dpi == 0 {
            anyhow::bail!("ocr.dpi must be > 0");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

// ============ LLM endpoint settings ============

/// Fully resolved LLM endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// In-memory overrides; each field wins over the file and environment when set.
#[derive(Debug, Clone, Default)]
pub struct LlmOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// On-disk shape of the persisted settings file. Any subset of keys may be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmConfig {
    /// Resolve against the process environment.
    pub fn resolve(file_path: &Path, overrides: &LlmOverrides) -> Self {
        Self::resolve_with_env(file_path, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with_env<F>(file_path: &Path, overrides: &LlmOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            base_url: env("OPENAI_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: env("OPENAI_API_KEY").unwrap_or_default(),
            model: env("SUMMARIZATION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        if let Some(file) = load_llm_config_file(file_path) {
            if let Some(v) = file.base_url {
                config.base_url = v;
            }
            if let Some(v) = file.api_key {
                config.api_key = v;
            }
            if let Some(v) = file.model {
                config.model = v;
            }
        }

        if let Some(v) = &overrides.base_url {
            config.base_url = v.clone();
        }
        if let Some(v) = &overrides.api_key {
            config.api_key = v.clone();
        }
        if let Some(v) = &overrides.model {
            config.model = v.clone();
        }

        config
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// API key with everything but the first and last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "(not set)".to_string();
    }
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Read the persisted settings file. Missing file is `None`; a malformed
/// file is logged and ignored.
pub fn load_llm_config_file(path: &Path) -> Option<LlmConfigFile> {
    if !path.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|s| serde_json::from_str::<LlmConfigFile>(&s).map_err(anyhow::Error::from));
    match parsed {
        Ok(file) => {
            tracing::debug!(path = %path.display(), "loaded LLM config file");
            Some(file)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable LLM config file");
            None
        }
    }
}

pub fn save_llm_config(path: &Path, file: &LlmConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write LLM config file: {}", path.display()))?;
    Ok(())
}

/// Accept only absolute `http`/`https` URLs with a host.
pub fn validate_base_url(url: &str) -> std::result::Result<(), String> {
    if url.trim().is_empty() {
        return Err("Base URL cannot be empty".to_string());
    }
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err("URL must use http or https protocol".to_string());
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err("Invalid URL format".to_string());
    }
    Ok(())
}

//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::chat::prompt::Persona;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::transcript::DEFAULT_TRANSCRIPT_PATH;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Who the assistant speaks as.
    pub persona: Persona,
    /// Sampling temperature for replies.
    pub temperature: f32,
    /// Token cap per reply.
    pub max_tokens: u32,
    /// Number of knowledge chunks put into the prompt.
    pub retrieval_top_k: usize,
    /// Where the JSONL transcript goes.
    pub transcript_path: PathBuf,
    /// Pre-embedded knowledge chunks.
    pub knowledge_path: PathBuf,
    /// Optional keyword-table override for the contact classifier.
    pub keywords_path: Option<PathBuf>,
    /// Print replies character by character.
    pub typing_effect: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            temperature: 0.7,
            max_tokens: 300,
            retrieval_top_k: 1,
            transcript_path: PathBuf::from(DEFAULT_TRANSCRIPT_PATH),
            knowledge_path: PathBuf::from("./folio_chunks.json"),
            keywords_path: None,
            typing_effect: true,
        }
    }
}

/// Everything the binary needs, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    /// Key for the Gemini embedding endpoint; retrieval is off without it.
    pub embedding_api_key: Option<SecretString>,
    pub embedding_model: String,
    /// Directory for rolling log files, if file logging is wanted.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: LlmBackend = match get("FOLIO_LLM_BACKEND") {
            Some(raw) => raw.parse()?,
            None => LlmBackend::Gemini,
        };
        let api_key_var = backend.api_key_var();
        let api_key = get(api_key_var)
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(api_key_var.to_string()))?;
        let model = get("FOLIO_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let defaults = AgentConfig::default();
        let mut persona = defaults.persona.clone();
        if let Some(name) = get("FOLIO_PERSONA_NAME") {
            persona.name = name;
        }
        if let Some(company) = get("FOLIO_COMPANY_NAME") {
            persona.company = company;
        }

        let agent = AgentConfig {
            persona,
            temperature: parse_or(get("FOLIO_TEMPERATURE"), "FOLIO_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_or(get("FOLIO_MAX_TOKENS"), "FOLIO_MAX_TOKENS", defaults.max_tokens)?,
            retrieval_top_k: parse_or(get("FOLIO_TOP_K"), "FOLIO_TOP_K", defaults.retrieval_top_k)?,
            transcript_path: get("FOLIO_TRANSCRIPT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.transcript_path),
            knowledge_path: get("FOLIO_KNOWLEDGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.knowledge_path),
            keywords_path: get("FOLIO_KEYWORDS_PATH").map(PathBuf::from),
            typing_effect: match get("FOLIO_TYPING") {
                Some(raw) => parse_bool(&raw, "FOLIO_TYPING")?,
                None => defaults.typing_effect,
            },
        };

        Ok(Self {
            agent,
            llm: LlmConfig {
                backend,
                api_key,
                model,
            },
            embedding_api_key: get("GEMINI_API_KEY").map(SecretString::from),
            embedding_model: get("FOLIO_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-004".to_string()),
            log_dir: get("FOLIO_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str, key: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Dealscope";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the oracle base URL.
pub const ENV_OLLAMA_URL: &str = "DEALSCOPE_OLLAMA_URL";
/// Environment variable overriding the oracle model name.
pub const ENV_MODEL: &str = "DEALSCOPE_MODEL";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "dealscope=info,warn"
}

/// Get the application data directory (~/.dealscope/).
/// `None` when the home directory cannot be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dealscope"))
}

/// Default location of the SQLite evaluation store.
pub fn default_store_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("evaluations.db"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config TOML is invalid: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Chunking parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_size: usize,
    pub overlap: usize,
    /// Window before `target_size` searched for a paragraph/sentence break.
    pub tolerance: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_size: 1000,
            overlap: 150,
            tolerance: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_size == 0 {
            return Err(ConfigError::Invalid("chunking.target_size must be > 0".into()));
        }
        if self.overlap + self.tolerance >= self.target_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.overlap ({}) + chunking.tolerance ({}) must be below target_size ({})",
                self.overlap, self.tolerance, self.target_size
            )));
        }
        Ok(())
    }
}

/// Evidence retrieval parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per principle.
    pub top_k: usize,
    /// Upper bound applied to any requested `k`.
    pub max_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 6, max_k: 10 }
    }
}

/// Oracle retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts for transient failures (first call included).
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Corrective re-asks after a structurally invalid response.
    pub structural_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            structural_retries: 1,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Reasoning oracle endpoint (Ollama).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Bound on simultaneous oracle calls across one run.
    pub max_concurrent_calls: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.1:8b".into(),
            timeout_secs: 120,
            max_concurrent_calls: 4,
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub retry: RetryConfig,
    pub oracle: OracleConfig,
    /// Optional rubric file; the embedded rubric is used when unset.
    pub rubric_path: Option<PathBuf>,
    /// Optional SQLite store path; `default_store_path()` when unset.
    pub store_path: Option<PathBuf>,
}

impl AnalysisConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalysisConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEALSCOPE_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_OLLAMA_URL) {
            if !url.trim().is_empty() {
                self.oracle.base_url = url;
            }
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                self.oracle.model = model;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 || self.retrieval.max_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k and max_k must be > 0".into()));
        }
        if self.retrieval.top_k > self.retrieval.max_k {
            return Err(ConfigError::Invalid(format!(
                "retrieval.top_k ({}) exceeds max_k ({})",
                self.retrieval.top_k, self.retrieval.max_k
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".into()));
        }
        if self.oracle.max_concurrent_calls == 0 {
            return Err(ConfigError::Invalid("oracle.max_concurrent_calls must be >= 1".into()));
        }
        Ok(())
    }
}

//! JSON pipeline configuration.
//!
//! Every field has a default, so an empty `{}` file (or no file at all) yields
//! the stock detector settings. Provider keys fall back to the environment.

use crate::errors::{SentinelError, SentinelResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONTAMINATION: f64 = 0.1;
const DEFAULT_TREES: usize = 100;
const DEFAULT_MAX_SAMPLES: usize = 256;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_WINDOW: usize = 10;
const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

const BYTEZ_KEY_ENV: &str = "BYTEZ_API_KEY";
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Network-traffic features used when the caller names none
pub const DEFAULT_FEATURES: &[&str] = &[
    "source_port",
    "destination_port",
    "sbytes",
    "dbytes",
    "sttl",
    "dttl",
    "sintpkt",
    "dintpkt",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub outlier: OutlierConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Expected share of outliers, in (0, 0.5]
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    #[serde(default = "default_trees")]
    pub n_estimators: usize,
    /// Upper bound on the per-tree sub-sample
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Explicit feature columns; empty means the network defaults
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_contamination() -> f64 {
    DEFAULT_CONTAMINATION
}

fn default_trees() -> usize {
    DEFAULT_TREES
}

fn default_max_samples() -> usize {
    DEFAULT_MAX_SAMPLES
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            n_estimators: DEFAULT_TREES,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    #[serde(default = "default_window")]
    pub window_size: usize,
    /// Fraction of pattern stages that must be observed in order
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bytez_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_bytez_timeout")]
    pub bytez_timeout_secs: u64,
    #[serde(default = "default_gemini_timeout")]
    pub gemini_timeout_secs: u64,
    #[serde(default = "default_openrouter_timeout")]
    pub openrouter_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_bytez_timeout() -> u64 {
    120
}

fn default_gemini_timeout() -> u64 {
    60
}

fn default_openrouter_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f64 {
    0.3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bytez_api_key: None,
            gemini_api_key: None,
            openrouter_api_key: None,
            bytez_timeout_secs: default_bytez_timeout(),
            gemini_timeout_secs: default_gemini_timeout(),
            openrouter_timeout_secs: default_openrouter_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    /// Fill missing keys from the environment. Empty values count as unset.
    pub fn with_env_keys(mut self) -> Self {
        fn env_key(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        self.bytez_api_key = self.bytez_api_key.filter(|k| !k.is_empty()).or_else(|| env_key(BYTEZ_KEY_ENV));
        self.gemini_api_key = self.gemini_api_key.filter(|k| !k.is_empty()).or_else(|| env_key(GEMINI_KEY_ENV));
        self.openrouter_api_key = self
            .openrouter_api_key
            .filter(|k| !k.is_empty())
            .or_else(|| env_key(OPENROUTER_KEY_ENV));
        self
    }
}

impl PipelineConfig {
    /// Load from a JSON file, then validate.
    pub fn load(path: &Path) -> SentinelResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| SentinelError::io(e, path.to_path_buf()))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SentinelResult<()> {
        let c = self.outlier.contamination;
        if !(c > 0.0 && c <= 0.5) {
            return Err(SentinelError::Config(format!(
                "contamination must be in (0, 0.5], got {}",
                c
            )));
        }
        if self.outlier.n_estimators == 0 {
            return Err(SentinelError::Config("n_estimators must be positive".to_string()));
        }
        if self.outlier.max_samples < 2 {
            return Err(SentinelError::Config("max_samples must be at least 2".to_string()));
        }
        if self.sequence.window_size == 0 {
            return Err(SentinelError::Config("window_size must be positive".to_string()));
        }
        let t = self.sequence.match_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(SentinelError::Config(format!(
                "match_threshold must be in (0, 1], got {}",
                t
            )));
        }
        Ok(())
    }
}

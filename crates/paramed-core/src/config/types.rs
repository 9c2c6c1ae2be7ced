use paramed_skills::MatchConfig;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    120
}

/// OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sqlite_path() -> String {
    "data/paramed.db".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Database file, or `:memory:`.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

fn default_documents_dir() -> String {
    "documents".into()
}

fn default_char_budget() -> usize {
    3000
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_quiz_questions() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    /// Characters of document text included in a prompt.
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
    /// Pause between documents.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Questions requested per document in quiz mode.
    #[serde(default = "default_quiz_questions")]
    pub quiz_questions: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            char_budget: default_char_budget(),
            delay_ms: default_delay_ms(),
            quiz_questions: default_quiz_questions(),
        }
    }
}

fn default_min_description_len() -> usize {
    20
}

fn default_min_time_secs() -> i64 {
    10
}

fn default_max_time_secs() -> i64 {
    1800
}

/// Thresholds used by the step quality report.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualityConfig {
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,
    #[serde(default = "default_min_time_secs")]
    pub min_time_secs: i64,
    #[serde(default = "default_max_time_secs")]
    pub max_time_secs: i64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_description_len: default_min_description_len(),
            min_time_secs: default_min_time_secs(),
            max_time_secs: default_max_time_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Credentials resolved from the environment after loading.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<Secret>,
}

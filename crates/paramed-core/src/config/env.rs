use std::str::FromStr;

use super::Config;
use crate::secret::Secret;

/// Non-empty value of `name`.
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Value of `name` parsed as `T`; unparsable values are logged and ignored.
fn parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Some(url) = var("PARAMED_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = var("PARAMED_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(n) = parsed("PARAMED_LLM_MAX_TOKENS") {
            self.llm.max_tokens = n;
        }
        if let Some(t) = parsed("PARAMED_LLM_TEMPERATURE") {
            self.llm.temperature = t;
        }
        if let Some(path) = var("PARAMED_SQLITE_PATH") {
            self.store.sqlite_path = path;
        }
        if let Some(dir) = var("PARAMED_DOCUMENTS_DIR") {
            self.extraction.documents_dir = dir;
        }
        if let Some(n) = parsed("PARAMED_EXTRACTION_CHAR_BUDGET") {
            self.extraction.char_budget = n;
        }
        if let Some(ms) = parsed("PARAMED_EXTRACTION_DELAY_MS") {
            self.extraction.delay_ms = ms;
        }
        if let Some(ratio) = parsed("PARAMED_MATCH_MIN_RATIO") {
            self.matching.overlap = self.matching.overlap.with_ratio(ratio);
        }
        if let Some(secs) = parsed("PARAMED_MONITOR_INTERVAL") {
            self.monitor.interval_secs = secs;
        }
    }

    /// Pick up the API key from `PARAMED_LLM_API_KEY`, falling back to `OPENAI_API_KEY`.
    pub fn resolve_secrets(&mut self) {
        self.secrets.llm_api_key = var("PARAMED_LLM_API_KEY")
            .or_else(|| var("OPENAI_API_KEY"))
            .map(Secret::new);
    }
}

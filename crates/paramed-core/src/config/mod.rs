mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Used when neither `--config` nor `PARAMED_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        Ok(config)
    }

    /// Config file location: explicit path, then `PARAMED_CONFIG`, then the default.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        std::env::var("PARAMED_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Reject values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }
        if self.llm.base_url.trim().is_empty() {
            anyhow::bail!("llm.base_url must not be empty");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            );
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be positive");
        }
        if self.extraction.char_budget == 0 {
            anyhow::bail!("extraction.char_budget must be positive");
        }
        if self.extraction.quiz_questions == 0 {
            anyhow::bail!("extraction.quiz_questions must be positive");
        }
        if self.quality.min_time_secs > self.quality.max_time_secs {
            anyhow::bail!(
                "quality.min_time_secs ({}) exceeds quality.max_time_secs ({})",
                self.quality.min_time_secs,
                self.quality.max_time_secs
            );
        }
        if self.monitor.interval_secs == 0 {
            anyhow::bail!("monitor.interval_secs must be positive");
        }
        self.matching
            .validate()
            .context("invalid [matching] section")?;
        Ok(())
    }
}

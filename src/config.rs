use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tuning knobs, overridable through the optional `[limits]` section of
/// `diffnote.toml`. Defaults match the hosting platform's documented
/// guidance where one exists.
#[derive(Deserialize, Debug, Clone)]
pub struct Limits {
    /// Inline comments posted per run; the rest goes to the aggregated comment
    #[serde(default = "default_max_inline")]
    pub max_inline: usize,
    /// Wait between retries after a secondary-rate-limit response
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
    /// Attempts per comment before a rate-limited post counts as failed
    #[serde(default = "default_rate_limit_max_attempts")]
    pub rate_limit_max_attempts: u32,
    /// Pause between consecutive comment posts
    #[serde(default = "default_post_delay_ms")]
    pub post_delay_ms: u64,
    /// Character budget per message cell in the aggregated table
    #[serde(default = "default_overflow_message_budget")]
    pub overflow_message_budget: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_inline: default_max_inline(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            rate_limit_max_attempts: default_rate_limit_max_attempts(),
            post_delay_ms: default_post_delay_ms(),
            overflow_message_budget: default_overflow_message_budget(),
        }
    }
}

fn default_max_inline() -> usize {
    20
}

fn default_rate_limit_backoff_ms() -> u64 {
    60_000
}

fn default_rate_limit_max_attempts() -> u32 {
    5
}

fn default_post_delay_ms() -> u64 {
    500
}

fn default_overflow_message_budget() -> usize {
    200
}

#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    #[serde(default)]
    limits: Option<Limits>,
}

impl Limits {
    /// Read limits from a toml file. A missing file yields the defaults;
    /// a present but unparsable file is an error rather than a silent
    /// fallback.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config.limits.unwrap_or_default())
    }
}

/// Everything a run needs, resolved once at startup and passed to every
/// component. No component reads the process environment after this is
/// built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// API token for the hosting platform
    pub token: String,
    /// Repository in `owner/name` form
    pub repository: String,
    /// Pull request number
    pub pr_number: u64,
    /// Head commit the inline comments attach to
    pub commit_sha: String,
    /// API base URL, overridable for self-hosted instances and tests
    pub api_base: String,
    pub limits: Limits,
}

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

//! Configuration and run-level types for the scout pipeline.

use crate::types::EnrichedToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Notification thresholds for the announcement filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Follower count must be strictly greater than this
    pub min_followers: u64,
    /// Reputation score must be greater than or equal to this
    pub min_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_followers: 2000,
            min_score: 0.95,
        }
    }
}

/// Neynar API settings, shared by identity lookup and cast publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeynarConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Managed signer used to publish casts
    pub signer_uuid: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NeynarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.neynar.com/v2/farcaster".to_string(),
            api_key: None,
            signer_uuid: None,
            timeout_seconds: 10,
        }
    }
}

/// Settings for the theme summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_key: None,
            model: "claude-3-5-sonnet-latest".to_string(),
            max_tokens: 1000,
            timeout_seconds: 60,
        }
    }
}

/// Complete configuration for a scout run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Launch page listing the newest tokens
    pub page_url: String,
    /// CSS selectors that must all be present before the page counts as rendered
    pub ready_selectors: Vec<String>,
    /// Upper bound on the wait for the ready selectors
    pub render_timeout_seconds: u64,
    /// Optional browser executable; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
    pub thresholds: Thresholds,
    /// SQLite database file
    pub database_path: PathBuf,
    /// JSON file listing every announced contract address
    pub announced_path: PathBuf,
    pub neynar: NeynarConfig,
    pub summarizer: SummarizerConfig,
    /// Number of themes returned by the theme reducer
    pub top_themes: usize,
    /// Suppress notifications, publishes and announced-set writes
    pub dry_run: bool,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            page_url: "https://www.clanker.world/clanker".to_string(),
            ready_selectors: vec![
                ".flex-1".to_string(),
                "a[href*=\"warpcast.com\"]".to_string(),
            ],
            render_timeout_seconds: 20,
            chrome_executable: None,
            thresholds: Thresholds::default(),
            database_path: PathBuf::from("tokens.db"),
            announced_path: PathBuf::from("notified_tokens.json"),
            neynar: NeynarConfig::default(),
            summarizer: SummarizerConfig::default(),
            top_themes: 3,
            dry_run: false,
        }
    }
}

impl ScoutConfig {
    /// Build a configuration from process environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(url) = var("CLANKER_URL") {
            config.page_url = url;
        }
        if let Some(path) = var("SCOUT_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = var("SCOUT_ANNOUNCED_PATH") {
            config.announced_path = PathBuf::from(path);
        }
        if let Some(followers) = var("SCOUT_MIN_FOLLOWERS").and_then(|v| v.parse().ok()) {
            config.thresholds.min_followers = followers;
        }
        if let Some(score) = var("SCOUT_MIN_SCORE").and_then(|v| v.parse().ok()) {
            config.thresholds.min_score = score;
        }
        if let Some(bin) = var("CHROME_BIN") {
            config.chrome_executable = Some(PathBuf::from(bin));
        }
        if let Some(base) = var("NEYNAR_BASE_URL") {
            config.neynar.base_url = base;
        }
        config.neynar.api_key = var("NEYNAR_API_KEY");
        config.neynar.signer_uuid = var("NEYNAR_SIGNER_UUID");
        config.summarizer.api_key = var("ANTHROPIC_API_KEY");
        config
    }
}

/// Outcome of the announcement step for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Did not meet the thresholds
    Skipped,
    /// Already in the announced set
    AlreadyAnnounced,
    /// Qualified, but dry-run suppressed the publish
    WouldAnnounce,
    /// Published and recorded as announced
    Announced,
    /// Qualified but the publish failed; retried on the next run
    PublishFailed,
}

impl Decision {
    pub fn qualified(&self) -> bool {
        matches!(
            self,
            Decision::WouldAnnounce | Decision::Announced | Decision::PublishFailed
        )
    }
}

/// A token as processed by one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedToken {
    #[serde(flatten)]
    pub enriched: EnrichedToken,
    pub decision: Decision,
}

/// Summary of a single pipeline pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub total_tokens: usize,
    /// Cards that could not be parsed
    pub skipped_cards: usize,
    pub tokens: Vec<ProcessedToken>,
}

impl RunReport {
    pub fn count(&self, decision: Decision) -> usize {
        self.tokens.iter().filter(|t| t.decision == decision).count()
    }
}

/// One theme and its member tokens, as produced by the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub tokens: Vec<String>,
}

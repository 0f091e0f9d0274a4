//! Scout module - discovery, enrichment, dedup and announcement of new Clanker tokens.
//!
//! Each collaborator sits behind a trait so a run can be wired to live
//! services (Chromium, Neynar, SQLite) or to in-memory fakes.

pub mod types;
pub mod error;
pub mod renderer;
pub mod extractor;
pub mod identity;
pub mod neynar;
pub mod filter;
pub mod announced;
pub mod storage;
pub mod announcer;
pub mod themes;
pub mod pipeline;
pub mod report;

// Re-export the primary pipeline and configuration types
pub use pipeline::{CheckOutput, Collaborators, ScoutPipeline};
pub use types::{
    Decision, NeynarConfig, ProcessedToken, RunReport, ScoutConfig, SummarizerConfig, Theme,
    Thresholds,
};

// Re-export collaborator seams and their default implementations
pub use announced::AnnouncedSet;
pub use announcer::{Announcer, FeedPublisher, LogNotifier, Notifier};
pub use error::{NeynarError, RenderError, StoreError, SummarizerError};
pub use extractor::{CardExtractor, ExtractionReport};
pub use filter::should_announce;
pub use identity::{IdentityEnricher, IdentityLookup};
pub use neynar::NeynarClient;
pub use renderer::{ChromiumRenderer, HtmlFileRenderer, PageRenderer};
pub use storage::{SqliteTokenStore, TokenStorage};
pub use themes::{AnthropicSummarizer, Summarizer, ThemeReducer};

use std::path::PathBuf;

/// Scout builder for convenient construction with sensible defaults.
pub struct ScoutBuilder {
    config: ScoutConfig,
}

impl ScoutBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ScoutConfig::default(),
        }
    }

    /// Start from an existing configuration, e.g. `ScoutConfig::from_env()`.
    pub fn from_config(config: ScoutConfig) -> Self {
        Self { config }
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.config.page_url = url.into();
        self
    }

    /// Set the follower and score thresholds.
    pub fn with_thresholds(mut self, min_followers: u64, min_score: f64) -> Self {
        self.config.thresholds = Thresholds {
            min_followers,
            min_score,
        };
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn with_announced_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.announced_path = path.into();
        self
    }

    /// Set the render wait bound in seconds.
    pub fn with_render_timeout(mut self, seconds: u64) -> Self {
        self.config.render_timeout_seconds = seconds;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    /// Set Neynar credentials.
    pub fn with_neynar(mut self, api_key: Option<String>, signer_uuid: Option<String>) -> Self {
        self.config.neynar.api_key = api_key;
        self.config.neynar.signer_uuid = signer_uuid;
        self
    }

    pub fn with_summarizer_key(mut self, api_key: Option<String>) -> Self {
        self.config.summarizer.api_key = api_key;
        self
    }

    pub fn with_top_themes(mut self, n: usize) -> Self {
        self.config.top_themes = n;
        self
    }

    /// Suppress notifications, publishes and announced-set writes.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Build the scout configuration.
    pub fn build_config(self) -> ScoutConfig {
        self.config
    }

    /// Build a pipeline wired to the given collaborators.
    pub fn build(self, parts: Collaborators, announced: AnnouncedSet) -> anyhow::Result<ScoutPipeline> {
        ScoutPipeline::new(self.config, parts, announced)
    }
}

impl Default for ScoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scout_builder() {
        let config = ScoutBuilder::new()
            .with_thresholds(500, 0.8)
            .with_page_url("http://localhost:8080/clanker")
            .with_dry_run(true)
            .with_top_themes(5)
            .build_config();

        assert_eq!(config.thresholds.min_followers, 500);
        assert_eq!(config.thresholds.min_score, 0.8);
        assert_eq!(config.page_url, "http://localhost:8080/clanker");
        assert!(config.dry_run);
        assert_eq!(config.top_themes, 5);
    }

    #[test]
    fn test_scout_builder_defaults() {
        let config = ScoutBuilder::new().build_config();

        assert_eq!(config.thresholds.min_followers, 2000);
        assert_eq!(config.thresholds.min_score, 0.95);
        assert_eq!(config.page_url, "https://www.clanker.world/clanker");
        assert_eq!(config.render_timeout_seconds, 20);
        assert_eq!(config.top_themes, 3);
        assert!(!config.dry_run);
    }
}

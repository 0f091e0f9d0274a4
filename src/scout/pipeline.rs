//! Per-run control flow: render, extract, enrich, persist, decide, announce.
//!
//! Records are processed strictly one after another. Only render and store
//! failures abort a run; everything else degrades per record.

use crate::scout::announced::AnnouncedSet;
use crate::scout::announcer::{AnnounceOutcome, Announcer, FeedPublisher, Notifier};
use crate::scout::extractor::CardExtractor;
use crate::scout::filter::should_announce;
use crate::scout::identity::{handle_from_profile_url, IdentityEnricher, IdentityLookup};
use crate::scout::renderer::PageRenderer;
use crate::scout::storage::TokenStorage;
use crate::scout::types::{Decision, ProcessedToken, RunReport, ScoutConfig};
use crate::types::{EnrichedToken, StoredToken};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// External services a pipeline is wired to.
pub struct Collaborators {
    pub renderer: Arc<dyn PageRenderer>,
    pub lookup: Arc<dyn IdentityLookup>,
    pub publisher: Arc<dyn FeedPublisher>,
    pub notifier: Arc<dyn Notifier>,
    pub storage: Arc<dyn TokenStorage>,
}

/// Result of a `check` run: the report plus the HTML it was built from.
#[derive(Debug)]
pub struct CheckOutput {
    pub report: RunReport,
    pub html: String,
}

pub struct ScoutPipeline {
    config: ScoutConfig,
    renderer: Arc<dyn PageRenderer>,
    extractor: CardExtractor,
    enricher: IdentityEnricher,
    storage: Arc<dyn TokenStorage>,
    announcer: Announcer,
    announced: AnnouncedSet,
}

impl ScoutPipeline {
    pub fn new(config: ScoutConfig, parts: Collaborators, announced: AnnouncedSet) -> Result<Self> {
        let extractor = CardExtractor::for_page(&config.page_url)?;
        let announcer = Announcer::new(parts.publisher, parts.notifier, config.dry_run);

        Ok(Self {
            renderer: parts.renderer,
            extractor,
            enricher: IdentityEnricher::new(parts.lookup),
            storage: parts.storage,
            announcer,
            announced,
            config,
        })
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn announced(&self) -> &AnnouncedSet {
        &self.announced
    }

    pub fn storage(&self) -> Arc<dyn TokenStorage> {
        Arc::clone(&self.storage)
    }

    /// One full pass over the launch page.
    #[instrument(skip(self), fields(url = %self.config.page_url, dry_run = self.config.dry_run))]
    pub async fn run_check(&mut self) -> Result<CheckOutput> {
        info!("Checking for new tokens");
        let html = self
            .renderer
            .render(&self.config.page_url)
            .await
            .context("Failed to render launch page")?;

        let extraction = self.extractor.extract(&html);
        info!(
            "Extracted {} tokens ({} cards skipped)",
            extraction.tokens.len(),
            extraction.skipped
        );

        let mut processed = Vec::with_capacity(extraction.tokens.len());
        for token in extraction.tokens {
            debug!("Processing token: {}", token.name_or_unknown());
            let enriched = self.enricher.enrich(token).await;

            self.storage
                .save_token(&enriched.token, enriched.creator.as_ref())
                .await
                .with_context(|| format!("Failed to store token {}", enriched.token.dedup_key()))?;

            processed.push(self.process(enriched).await?);
        }

        let report = self.finish(processed, extraction.skipped);
        Ok(CheckOutput { report, html })
    }

    /// Re-evaluate tokens stored since `since` using their stored creator
    /// details. Picks up qualifying tokens whose earlier publish failed.
    #[instrument(skip(self), fields(dry_run = self.config.dry_run))]
    pub async fn run_recent(&mut self, since: DateTime<Utc>) -> Result<RunReport> {
        let stored = self
            .storage
            .get_tokens_since(since)
            .await
            .context("Failed to load recent tokens")?;
        info!("Re-evaluating {} tokens stored since {}", stored.len(), since);

        let mut processed = Vec::with_capacity(stored.len());
        for StoredToken { token, creator, .. } in stored {
            let handle = handle_from_profile_url(token.creator_profile_url.as_deref());
            let enriched = EnrichedToken {
                token,
                handle,
                creator,
            };
            processed.push(self.process(enriched).await?);
        }

        Ok(self.finish(processed, 0))
    }

    /// Decide and, when the token qualifies, announce it.
    async fn process(&mut self, enriched: EnrichedToken) -> Result<ProcessedToken> {
        let decision = self.decide(&enriched).await?;
        info!(
            symbol = enriched.token.symbol_or_unknown(),
            followers = ?enriched.follower_count(),
            score = ?enriched.reputation_score(),
            decision = ?decision,
            "Checked token {}",
            enriched.token.name_or_unknown()
        );
        Ok(ProcessedToken { enriched, decision })
    }

    async fn decide(&mut self, enriched: &EnrichedToken) -> Result<Decision> {
        let key = enriched.token.dedup_key();
        let creator = enriched.creator.as_ref();
        if !should_announce(&enriched.token, creator, &self.announced, &self.config.thresholds) {
            return Ok(if self.announced.contains(&key) {
                Decision::AlreadyAnnounced
            } else {
                Decision::Skipped
            });
        }
        // should_announce only passes with a profile present.
        let Some(creator) = creator else {
            return Ok(Decision::Skipped);
        };

        match self.announcer.announce(&enriched.token, creator).await {
            AnnounceOutcome::Suppressed => Ok(Decision::WouldAnnounce),
            AnnounceOutcome::Failed => Ok(Decision::PublishFailed),
            AnnounceOutcome::Published => {
                self.announced
                    .insert(&key)
                    .with_context(|| format!("Failed to record {key} as announced"))?;
                Ok(Decision::Announced)
            }
        }
    }

    fn finish(&self, tokens: Vec<ProcessedToken>, skipped_cards: usize) -> RunReport {
        let report = RunReport {
            timestamp: Utc::now(),
            total_tokens: tokens.len(),
            skipped_cards,
            tokens,
        };
        info!(
            total = report.total_tokens,
            announced = report.count(Decision::Announced),
            would_announce = report.count(Decision::WouldAnnounce),
            failed = report.count(Decision::PublishFailed),
            "Run complete"
        );
        report
    }
}

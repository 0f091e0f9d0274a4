//! Announcement emitter - formats qualifying tokens and publishes them to the feed.

use crate::types::{CreatorProfile, TokenRecord, NOT_AVAILABLE, UNKNOWN};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument};

const SEARCH_URL: &str = "https://warpcast.com/~/search/recent?q=";
const WALLET_ANALYZER_URL: &str = "https://dexcheck.ai/app/wallet-analyzer/";
const WALLET_ANALYZER_QUERY: &str = "?tab=pnl-calculator&chain=base";

/// External social feed.
#[async_trait]
pub trait FeedPublisher: Send + Sync {
    async fn publish(&self, text: &str, embed_url: Option<&str>, reply_to: Option<&str>) -> Result<()>;
}

/// Desktop-style notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str, url: Option<&str>) -> Result<()>;
}

/// Notifier that writes notifications to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str, url: Option<&str>) -> Result<()> {
        info!(url = url.unwrap_or(NOT_AVAILABLE), "{}: {}", title, message);
        Ok(())
    }
}

/// What happened when a qualifying token was handed to the announcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Published,
    Failed,
    /// Dry-run: nothing left the process
    Suppressed,
}

/// Search link for mentions of the token name.
pub fn search_link(name: &str) -> String {
    format!("{SEARCH_URL}{}", name.replace(' ', "+"))
}

/// Wallet-analysis link for one of the creator's verified addresses.
pub fn wallet_analysis_link(address: &str) -> String {
    format!("{WALLET_ANALYZER_URL}{address}{WALLET_ANALYZER_QUERY}")
}

/// Reputation score as a percentage with one decimal, or "N/A".
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.1}%", s * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Render the announcement text for a token and its creator.
pub fn format_announcement(token: &TokenRecord, creator: &CreatorProfile) -> String {
    let link = |l: &Option<String>| l.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let badge = if creator.has_badge { " 🏅" } else { "" };

    let mut text = format!(
        "🚨 New Clanker Token Alert 🚨\n\n\
         ⛓️ ${} by {}\n\
         📈 Creator Followers: {}{}\n\
         🎯 Neynar Score: {}\n\n\
         👤 {}\n\
         🔍 Mentions: {}\n\
         📊 {}\n\
         🌐 {}\n\
         🔒 The user has {} verified ETH addresses on Farcaster.",
        token.symbol.as_deref().unwrap_or(UNKNOWN),
        creator.username,
        creator.follower_count,
        badge,
        format_score(creator.reputation_score),
        link(&token.creator_profile_url),
        search_link(token.name.as_deref().unwrap_or("")),
        link(&token.dex_link),
        link(&token.launch_page_link),
        creator.verified_eth_addresses.len(),
    );

    if !creator.verified_eth_addresses.is_empty() {
        text.push_str("\n🔎 Creator History:");
        let history: String = creator
            .verified_eth_addresses
            .iter()
            .map(|address| format!("\n{}", wallet_analysis_link(address)))
            .collect();
        text.push_str(&history);
    }

    text
}

/// Sends notifications and feed posts for qualifying tokens.
pub struct Announcer {
    publisher: Arc<dyn FeedPublisher>,
    notifier: Arc<dyn Notifier>,
    dry_run: bool,
}

impl Announcer {
    pub fn new(publisher: Arc<dyn FeedPublisher>, notifier: Arc<dyn Notifier>, dry_run: bool) -> Self {
        Self {
            publisher,
            notifier,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Announce one token. Never returns an error: failures are logged and reported
    /// as `AnnounceOutcome::Failed` so the caller can leave the token eligible.
    #[instrument(skip_all, fields(symbol = token.symbol_or_unknown()))]
    pub async fn announce(&self, token: &TokenRecord, creator: &CreatorProfile) -> AnnounceOutcome {
        if self.dry_run {
            return AnnounceOutcome::Suppressed;
        }

        let message = format!(
            "{} created a token: {} with {} followers.",
            creator.username,
            token.name_or_unknown(),
            creator.follower_count
        );
        if let Err(e) = self
            .notifier
            .notify("New Token Created!", &message, token.dex_link.as_deref())
            .await
        {
            error!("Error sending notification: {:#}", e);
        }

        let text = format_announcement(token, creator);
        info!("{}", text);

        match self
            .publisher
            .publish(&text, token.launch_page_link.as_deref(), None)
            .await
        {
            Ok(()) => {
                info!("Successfully announced token: {}", token.name_or_unknown());
                AnnounceOutcome::Published
            }
            Err(e) => {
                error!("Error announcing token: {:#}", e);
                AnnounceOutcome::Failed
            }
        }
    }
}

//! Identity enrichment - maps a creator's profile link to a creator profile.
//!
//! Lookup failures never abort a record: they are logged and the token is
//! carried forward without a profile.

use crate::types::{CreatorProfile, EnrichedToken, TokenRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// External identity directory, queried by handle.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(&self, handle: &str) -> Result<CreatorProfile>;
}

/// Derive a lookup handle from a profile URL: its last non-empty path segment.
pub fn handle_from_profile_url(url: Option<&str>) -> Option<String> {
    let url = url?.trim();
    if url.is_empty() {
        return None;
    }

    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(str::to_string),
    };

    segment.filter(|s| !s.is_empty())
}

/// Attaches creator profiles to freshly extracted tokens.
pub struct IdentityEnricher {
    lookup: Arc<dyn IdentityLookup>,
}

impl IdentityEnricher {
    pub fn new(lookup: Arc<dyn IdentityLookup>) -> Self {
        Self { lookup }
    }

    /// Look up the profile behind `profile_url`; `None` on blank input or any failure.
    pub async fn profile_for(&self, profile_url: Option<&str>) -> (Option<String>, Option<CreatorProfile>) {
        let Some(handle) = handle_from_profile_url(profile_url) else {
            return (None, None);
        };

        match self.lookup.lookup(&handle).await {
            Ok(profile) => {
                debug!(
                    handle = %handle,
                    followers = profile.follower_count,
                    score = ?profile.reputation_score,
                    "Creator profile found"
                );
                (Some(handle), Some(profile))
            }
            Err(e) => {
                warn!("Error fetching identity data for {}: {:#}", handle, e);
                (Some(handle), None)
            }
        }
    }

    pub async fn enrich(&self, token: TokenRecord) -> EnrichedToken {
        let (handle, creator) = self.profile_for(token.creator_profile_url.as_deref()).await;
        EnrichedToken {
            token,
            handle,
            creator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedLookup;

    #[async_trait]
    impl IdentityLookup for FixedLookup {
        async fn lookup(&self, handle: &str) -> Result<CreatorProfile> {
            if handle == "ghost" {
                return Err(anyhow!("user not found"));
            }
            Ok(CreatorProfile {
                username: handle.to_string(),
                verified_eth_addresses: vec![],
                follower_count: 10,
                reputation_score: Some(0.5),
                has_badge: false,
            })
        }
    }

    #[test]
    fn test_handle_is_last_path_segment() {
        assert_eq!(
            handle_from_profile_url(Some("https://warpcast.com/alice")),
            Some("alice".to_string())
        );
        assert_eq!(
            handle_from_profile_url(Some("https://warpcast.com/alice/")),
            Some("alice".to_string())
        );
        assert_eq!(handle_from_profile_url(Some("/bob/")), Some("bob".to_string()));
    }

    #[test]
    fn test_blank_profile_url_has_no_handle() {
        assert_eq!(handle_from_profile_url(None), None);
        assert_eq!(handle_from_profile_url(Some("   ")), None);
        assert_eq!(handle_from_profile_url(Some("https://warpcast.com/")), None);
    }

    #[tokio::test]
    async fn test_enrich_attaches_profile() {
        let enricher = IdentityEnricher::new(Arc::new(FixedLookup));
        let token = TokenRecord {
            creator_profile_url: Some("https://warpcast.com/alice".to_string()),
            ..Default::default()
        };
        let enriched = enricher.enrich(token).await;
        assert_eq!(enriched.handle.as_deref(), Some("alice"));
        assert_eq!(enriched.follower_count(), Some(10));
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_no_profile() {
        let enricher = IdentityEnricher::new(Arc::new(FixedLookup));
        let token = TokenRecord {
            creator_profile_url: Some("https://warpcast.com/ghost".to_string()),
            ..Default::default()
        };
        let enriched = enricher.enrich(token).await;
        assert_eq!(enriched.handle.as_deref(), Some("ghost"));
        assert!(enriched.creator.is_none());
        assert_eq!(enriched.reputation_score(), None);
    }

    #[tokio::test]
    async fn test_missing_profile_link_skips_lookup() {
        let enricher = IdentityEnricher::new(Arc::new(FixedLookup));
        let enriched = enricher.enrich(TokenRecord::default()).await;
        assert!(enriched.handle.is_none());
        assert!(enriched.creator.is_none());
    }
}

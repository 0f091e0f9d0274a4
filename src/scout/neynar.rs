//! Neynar API client: Farcaster user lookup and cast publishing.

use crate::scout::announcer::FeedPublisher;
use crate::scout::error::NeynarError;
use crate::scout::identity::IdentityLookup;
use crate::scout::types::NeynarConfig;
use crate::types::CreatorProfile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: NeynarUser,
}

#[derive(Debug, Deserialize)]
struct NeynarUser {
    username: String,
    follower_count: u64,
    #[serde(default)]
    power_badge: bool,
    #[serde(default)]
    verified_addresses: VerifiedAddresses,
    #[serde(default)]
    experimental: Option<Experimental>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifiedAddresses {
    #[serde(default)]
    eth_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Experimental {
    #[serde(default)]
    neynar_user_score: serde_json::Value,
}

impl From<NeynarUser> for CreatorProfile {
    fn from(user: NeynarUser) -> Self {
        let reputation_score = user
            .experimental
            .and_then(|e| e.neynar_user_score.as_f64())
            .filter(|s| s.is_finite() && (0.0..=1.0).contains(s));

        CreatorProfile {
            username: user.username,
            verified_eth_addresses: user.verified_addresses.eth_addresses,
            follower_count: user.follower_count,
            reputation_score,
            has_badge: user.power_badge,
        }
    }
}

/// Client for the Neynar v2 Farcaster API.
///
/// Built once per process and shared by the enricher and the announcer.
pub struct NeynarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    signer_uuid: Option<String>,
}

impl NeynarClient {
    pub fn new(config: &NeynarConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(NeynarError::NotConfigured("NEYNAR_API_KEY"))
            .context("Neynar API key is required; set NEYNAR_API_KEY")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            signer_uuid: config.signer_uuid.clone(),
        })
    }

    /// Fetch a user by Farcaster username.
    #[instrument(skip(self))]
    pub async fn user_by_username(&self, username: &str) -> Result<CreatorProfile, NeynarError> {
        let resp = self
            .client
            .get(format!("{}/user/by_username", self.base_url))
            .query(&[("username", username)])
            .header("accept", "application/json")
            .header("x-neynar-experimental", "false")
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NeynarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UserResponse = resp.json().await?;
        debug!(username = %body.user.username, "Fetched Neynar user");
        Ok(body.user.into())
    }

    /// Publish a cast from the configured signer.
    #[instrument(skip(self, text))]
    pub async fn post_cast(
        &self,
        text: &str,
        embed_url: Option<&str>,
        parent: Option<&str>,
    ) -> Result<(), NeynarError> {
        let signer_uuid = self
            .signer_uuid
            .as_deref()
            .ok_or(NeynarError::NotConfigured("NEYNAR_SIGNER_UUID"))?;

        let mut body = serde_json::json!({
            "signer_uuid": signer_uuid,
            "text": text,
        });
        if let Some(url) = embed_url {
            body["embeds"] = serde_json::json!([{ "url": url }]);
        }
        if let Some(parent) = parent {
            body["parent"] = serde_json::json!(parent);
        }

        let resp = self
            .client
            .post(format!("{}/cast", self.base_url))
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NeynarError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityLookup for NeynarClient {
    async fn lookup(&self, handle: &str) -> Result<CreatorProfile> {
        Ok(self.user_by_username(handle).await?)
    }
}

#[async_trait]
impl FeedPublisher for NeynarClient {
    async fn publish(&self, text: &str, embed_url: Option<&str>, reply_to: Option<&str>) -> Result<()> {
        Ok(self.post_cast(text, embed_url, reply_to).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_score_is_absent() {
        let body = r#"{"user": {"username": "alice", "follower_count": 12,
            "experimental": {"neynar_user_score": "high"}}}"#;
        let parsed: UserResponse = serde_json::from_str(body).unwrap();
        let profile: CreatorProfile = parsed.user.into();
        assert_eq!(profile.reputation_score, None);
        assert!(profile.verified_eth_addresses.is_empty());
        assert!(!profile.has_badge);
    }

    #[test]
    fn test_out_of_range_score_is_absent() {
        let body = r#"{"user": {"username": "alice", "follower_count": 12,
            "experimental": {"neynar_user_score": 4.2}}}"#;
        let parsed: UserResponse = serde_json::from_str(body).unwrap();
        let profile: CreatorProfile = parsed.user.into();
        assert_eq!(profile.reputation_score, None);
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(NeynarClient::new(&NeynarConfig::default()).is_err());
    }
}

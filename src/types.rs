//! Core types and data structures for the clanker-scout pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contract address of a token on the launch chain.
pub type ContractAddress = String;

/// Display fallback for fields the page did not provide.
pub const UNKNOWN: &str = "Unknown";

/// Display fallback for numeric fields with no value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Prefix of the storage key derived for tokens whose card carried no address.
pub const UNKEYED_PREFIX: &str = "unknown:";

/// A token discovered on the launch page.
///
/// Built fresh from rendered HTML on every run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Contract address; `None` when the card carried no address
    pub contract_address: Option<ContractAddress>,
    /// Token name as shown on the card
    pub name: Option<String>,
    /// Ticker symbol as shown on the card
    pub symbol: Option<String>,
    /// Free-text age label, e.g. "3 minutes ago"
    pub age_label: Option<String>,
    /// Creator handle as displayed on the card
    pub creator_handle: Option<String>,
    /// Link to the creator's social profile
    pub creator_profile_url: Option<String>,
    /// Token artwork
    pub image_url: Option<String>,
    /// Dex chart page
    pub dex_link: Option<String>,
    /// Chain explorer page
    pub explorer_link: Option<String>,
    /// Launch platform's own page for this token
    pub launch_page_link: Option<String>,
}

impl TokenRecord {
    pub fn name_or_unknown(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn symbol_or_unknown(&self) -> &str {
        self.symbol.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn age_or_unknown(&self) -> &str {
        self.age_label.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn address_or_unknown(&self) -> &str {
        self.contract_address.as_deref().unwrap_or(UNKNOWN)
    }

    /// Key used for storage and the announced set.
    ///
    /// The contract address when present. Otherwise a key derived from the
    /// first per-token link on the card, falling back to name, symbol, creator
    /// profile and image, so two different address-less cards never share a
    /// key. The age label is excluded because it changes between runs.
    pub fn dedup_key(&self) -> ContractAddress {
        if let Some(address) = &self.contract_address {
            return address.clone();
        }
        let link = [&self.launch_page_link, &self.dex_link, &self.explorer_link]
            .into_iter()
            .find_map(|l| l.as_deref());
        match link {
            Some(link) => format!("{UNKEYED_PREFIX}{link}"),
            None => format!(
                "{UNKEYED_PREFIX}{}|{}|{}|{}",
                self.name_or_unknown(),
                self.symbol_or_unknown(),
                self.creator_profile_url.as_deref().unwrap_or(UNKNOWN),
                self.image_url.as_deref().unwrap_or(UNKNOWN),
            ),
        }
    }
}

/// Identity profile of a token creator, as returned by the identity lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorProfile {
    pub username: String,
    /// Verified Ethereum addresses, in the order the lookup returned them
    pub verified_eth_addresses: Vec<String>,
    pub follower_count: u64,
    /// Platform reputation score in [0, 1], absent when unknown
    pub reputation_score: Option<f64>,
    /// Whether the creator holds the platform's power badge
    pub has_badge: bool,
}

/// A token together with the outcome of its creator lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedToken {
    pub token: TokenRecord,
    /// Derived lookup handle, if the card had a profile link
    pub handle: Option<String>,
    /// `None` when no lookup was possible or the lookup failed
    pub creator: Option<CreatorProfile>,
}

impl EnrichedToken {
    pub fn follower_count(&self) -> Option<u64> {
        self.creator.as_ref().map(|c| c.follower_count)
    }

    pub fn reputation_score(&self) -> Option<f64> {
        self.creator.as_ref().and_then(|c| c.reputation_score)
    }
}

/// A persisted token row joined with its (possibly absent) creator details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: TokenRecord,
    pub creator: Option<CreatorProfile>,
    /// When the token was first stored
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_display_as_unknown() {
        let token = TokenRecord::default();
        assert_eq!(token.name_or_unknown(), "Unknown");
        assert_eq!(token.symbol_or_unknown(), "Unknown");
        assert_eq!(token.address_or_unknown(), "Unknown");
    }

    #[test]
    fn test_dedup_key_prefers_contract_address() {
        let token = TokenRecord {
            contract_address: Some("0xfoo".to_string()),
            launch_page_link: Some("https://www.clanker.world/clanker/0xfoo".to_string()),
            ..Default::default()
        };
        assert_eq!(token.dedup_key(), "0xfoo");
    }

    #[test]
    fn test_dedup_key_without_address_is_stable_and_distinct() {
        let linked = TokenRecord {
            dex_link: Some("https://dexscreener.com/base/pair1".to_string()),
            age_label: Some("1 minute ago".to_string()),
            ..Default::default()
        };
        let later = TokenRecord {
            age_label: Some("9 minutes ago".to_string()),
            ..linked.clone()
        };
        assert_eq!(linked.dedup_key(), "unknown:https://dexscreener.com/base/pair1");
        assert_eq!(linked.dedup_key(), later.dedup_key());

        let foo = TokenRecord {
            name: Some("Foo".to_string()),
            creator_profile_url: Some("https://warpcast.com/alice".to_string()),
            ..Default::default()
        };
        let bar = TokenRecord {
            name: Some("Bar".to_string()),
            ..foo.clone()
        };
        assert_eq!(foo.dedup_key(), "unknown:Foo|Unknown|https://warpcast.com/alice|Unknown");
        assert_ne!(foo.dedup_key(), bar.dedup_key());
        assert_ne!(foo.dedup_key(), UNKNOWN);
    }

    #[test]
    fn test_enriched_token_without_creator_has_no_metrics() {
        let enriched = EnrichedToken {
            token: TokenRecord::default(),
            handle: Some("alice".to_string()),
            creator: None,
        };
        assert_eq!(enriched.follower_count(), None);
        assert_eq!(enriched.reputation_score(), None);
    }
}

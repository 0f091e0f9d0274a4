//! Dedup and threshold filter - decides whether a token is worth announcing.

use crate::scout::announced::AnnouncedSet;
use crate::scout::types::Thresholds;
use crate::types::{CreatorProfile, TokenRecord};

impl Thresholds {
    /// Whether a creator profile clears both thresholds.
    ///
    /// Followers must be strictly above the minimum; the score may equal its
    /// minimum. A missing profile or score never qualifies.
    pub fn is_met_by(&self, creator: Option<&CreatorProfile>) -> bool {
        let Some(creator) = creator else {
            return false;
        };
        let Some(score) = creator.reputation_score else {
            return false;
        };
        creator.follower_count > self.min_followers && score >= self.min_score
    }
}

/// Pure announcement decision keyed by `TokenRecord::dedup_key`. Does not
/// touch `announced`; the caller inserts the key only after a successful publish.
pub fn should_announce(
    token: &TokenRecord,
    creator: Option<&CreatorProfile>,
    announced: &AnnouncedSet,
    thresholds: &Thresholds,
) -> bool {
    thresholds.is_met_by(creator) && !announced.contains(&token.dedup_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str) -> TokenRecord {
        TokenRecord {
            contract_address: Some(address.to_string()),
            ..Default::default()
        }
    }

    fn creator(followers: u64, score: Option<f64>) -> CreatorProfile {
        CreatorProfile {
            username: "alice".to_string(),
            verified_eth_addresses: vec![],
            follower_count: followers,
            reputation_score: score,
            has_badge: false,
        }
    }

    #[test]
    fn test_qualifies_above_both_thresholds() {
        let announced = AnnouncedSet::in_memory();
        let c = creator(5000, Some(0.97));
        assert!(should_announce(&token("0x1"), Some(&c), &announced, &Thresholds::default()));
    }

    #[test]
    fn test_follower_boundary_is_exclusive() {
        let announced = AnnouncedSet::in_memory();
        let t = Thresholds::default();
        assert!(!should_announce(&token("0x1"), Some(&creator(2000, Some(0.99))), &announced, &t));
        assert!(should_announce(&token("0x1"), Some(&creator(2001, Some(0.99))), &announced, &t));
    }

    #[test]
    fn test_score_boundary_is_inclusive() {
        let announced = AnnouncedSet::in_memory();
        let t = Thresholds::default();
        assert!(should_announce(&token("0x1"), Some(&creator(3000, Some(0.95))), &announced, &t));
        assert!(!should_announce(&token("0x1"), Some(&creator(3000, Some(0.9499))), &announced, &t));
    }

    #[test]
    fn test_absent_values_never_qualify() {
        let announced = AnnouncedSet::in_memory();
        let t = Thresholds::default();
        assert!(!should_announce(&token("0x1"), None, &announced, &t));
        assert!(!should_announce(&token("0x1"), Some(&creator(9000, None)), &announced, &t));
    }

    #[test]
    fn test_already_announced_never_qualifies() {
        let mut announced = AnnouncedSet::in_memory();
        announced.insert("0x1").unwrap();
        let best = creator(u64::MAX, Some(1.0));
        assert!(!should_announce(&token("0x1"), Some(&best), &announced, &Thresholds::default()));
    }

    #[test]
    fn test_token_without_address_is_judged_by_derived_key() {
        let mut announced = AnnouncedSet::in_memory();
        let best = creator(9000, Some(1.0));
        let t = Thresholds::default();
        let token = TokenRecord {
            name: Some("Nameless".to_string()),
            launch_page_link: Some("https://www.clanker.world/clanker/pending".to_string()),
            ..Default::default()
        };
        assert!(should_announce(&token, Some(&best), &announced, &t));

        announced.insert(&token.dedup_key()).unwrap();
        assert!(!should_announce(&token, Some(&best), &announced, &t));
        assert!(should_announce(&TokenRecord::default(), Some(&best), &announced, &t));
    }

    #[test]
    fn test_decision_has_no_side_effects() {
        let announced = AnnouncedSet::in_memory();
        let c = creator(5000, Some(0.97));
        let t = Thresholds::default();
        assert!(should_announce(&token("0x1"), Some(&c), &announced, &t));
        assert!(should_announce(&token("0x1"), Some(&c), &announced, &t));
        assert!(announced.is_empty());
    }
}

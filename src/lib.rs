//! clanker-scout - discovery pipeline for newly launched Clanker tokens
//!
//! Renders the launch page, extracts token cards, enriches each creator with
//! Farcaster identity data, filters against follower and reputation thresholds
//! and announces qualifying tokens at most once across runs.

pub mod types;
pub mod scout;

// Re-export main types for convenience
pub use types::{CreatorProfile, EnrichedToken, StoredToken, TokenRecord};
pub use scout::{ScoutBuilder, ScoutConfig, ScoutPipeline};

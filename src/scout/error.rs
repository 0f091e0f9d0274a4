//! Typed failures of the scout's external collaborators.
//!
//! The pipeline wraps these in `anyhow` context; callers that need to branch
//! on a failure (tests, the store's update precondition) match on them directly.

use thiserror::Error;

/// Failures of calls to the Neynar API (identity lookup and cast publishing).
#[derive(Debug, Error)]
pub enum NeynarError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Missing configuration: {0}")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for NeynarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NeynarError::Decode(err.to_string())
        } else {
            NeynarError::Network(err.to_string())
        }
    }
}

/// Failures of the theme summarizer.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response has no themed_dictionary block")]
    MissingBlock,

    #[error("Malformed themed_dictionary: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SummarizerError {
    fn from(err: reqwest::Error) -> Self {
        SummarizerError::Network(err.to_string())
    }
}

/// Precondition violations raised by the token store.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("No token found with contract address: {0}")]
    UnknownToken(String),
}

/// Failures while rendering the launch page.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {seconds}s waiting for {selector}")]
    Timeout { selector: String, seconds: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let api = NeynarError::Api {
            status: 404,
            message: "user not found".to_string(),
        };
        assert_eq!(api.to_string(), "API error (status 404): user not found");
        assert_eq!(
            StoreError::UnknownToken("0xabc".to_string()).to_string(),
            "No token found with contract address: 0xabc"
        );
        let timeout = RenderError::Timeout {
            selector: "div.flex.flex-col".to_string(),
            seconds: 30,
        };
        assert_eq!(timeout.to_string(), "Timed out after 30s waiting for div.flex.flex-col");
    }
}

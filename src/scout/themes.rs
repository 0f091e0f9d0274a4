//! Theme reducer - groups recent tokens into named themes via an external summarizer.
//!
//! The summarizer answers in free text with a `<themed_dictionary>` block that
//! should hold a JSON object of `theme -> [token, ...]`. The block is parsed as
//! strict JSON; nothing in the answer is ever evaluated.

use crate::scout::error::SummarizerError;
use crate::scout::storage::TokenStorage;
use crate::scout::types::{SummarizerConfig, Theme};
use crate::types::StoredToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const OPEN_TAG: &str = "<themed_dictionary>";
const CLOSE_TAG: &str = "</themed_dictionary>";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Worked example sent ahead of the instructions to pin down the answer shape.
const EXAMPLES: &str = r#"<examples>
<example>
<TOKEN_LIST>
AIMEME,HELLYEAH,HACIENDA,BRICS Currency,Hello December,One Shot,bankr,Torre LATAM,huh dog,I'll be back,Houdini AI,Bictoin,Mexican Coke,AADRAWING,Noodle,From the director of comic sans,Clank Griswold,Science Acceleration,Gamestop on Clanker,Doom,ChickenDog,WE OUTSIDE,For The Culture,Hot Pockets and Coconut Water,AIMEME,HELLYEAH,HACIENDA,BRICS,DECEMBER,5G,ONESHOT,bankr,LATAM,DHUH,BACK,HOUDINI,BCT,COMX,AADWR,$Noodle,PAPYRUS,clankgriswold,SCI/ACC,GME,IDDQD,CHID,OUTSIDE,FTC,HPCW
</TOKEN_LIST>
<ideal_output>
I'll analyze the tokens and group them into specific themes. Here's my categorization:

<themed_dictionary>
{
    "AI-focused Drawing and Creation": ["AADRAWING", "AADWR", "Houdini AI", "HOUDINI"],
    "Dog-themed Meme Tokens": ["ChickenDog", "CHID", "huh dog", "DHUH"],
    "Food and Beverage References": ["Mexican Coke", "Hot Pockets and Coconut Water", "HPCW", "Noodle", "$Noodle"],
    "Gaming Reference Tokens": ["Doom", "IDDQD", "Gamestop on Clanker", "GME"],
    "Cultural Movement Tokens": ["For The Culture", "FTC", "WE OUTSIDE", "OUTSIDE"],
    "Science and Technology Innovation": ["Science Acceleration", "SCI/ACC", "5G"],
    "Typography and Font References": ["From the director of comic sans", "PAPYRUS", "COMX"],
    "Latin American Focused": ["Torre LATAM", "LATAM", "HACIENDA"],
    "Classic Movie References": ["I'll be back", "BACK", "Clank Griswold", "clankgriswold"],
    "Alternative Digital Currency": ["BRICS Currency", "BRICS", "Bictoin", "BCT"]
}
</themed_dictionary>

I've focused on specific themes that group closely related tokens and left out tokens that didn't fit a clear theme rather than forcing them into broad categories.
</ideal_output>
</example>
</examples>

"#;

const PROMPT: &str = r#"You will be given a list of token names and symbols. Your task is to identify specific themes among these tokens and group them accordingly. Here is the list of tokens:

<token_list>
{{TOKEN_LIST}}
</token_list>

Create a dictionary where the keys are themes and the values are lists of tokens that fit those themes. Follow these guidelines:

1. Themes should be as specific as possible, not broad categories.
2. Each theme should contain only a few items (typically 2-4).
3. Not every token needs to be categorized if it doesn't fit a specific theme.
4. Focus on unique or niche themes that accurately represent the grouped tokens.

Avoid overly broad themes such as "internet meme", "finance", "artificial intelligence" or "animals". Prefer themes like "space exploration cryptocurrencies", "food-based meme tokens" or "blockchain gaming assets".

Examples of good themes:
- "Canine-inspired meme tokens"
- "Decentralized file storage projects"
- "Metaverse real estate tokens"

Examples of bad (too broad) themes:
- "Cryptocurrency"
- "Technology"
- "Entertainment"

Think carefully about the connections between the tokens and identify the most specific themes possible. Then provide the themed dictionary as a JSON object in exactly this format:

<themed_dictionary>
{
    "Theme 1": ["Token1", "Token2", "Token3"],
    "Theme 2": ["Token4", "Token5"]
}
</themed_dictionary>

Ensure that your themes are specific and that each group contains only a few closely related tokens."#;

/// Text blocks of the summarizer request: the worked example, then the
/// instructions with `token_list` filled in.
pub fn prompt_blocks(token_list: &str) -> [String; 2] {
    [EXAMPLES.to_string(), PROMPT.replace("{{TOKEN_LIST}}", token_list)]
}

/// External summarization service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Group a comma-joined list of names and symbols into themes.
    async fn summarize(&self, token_list: &str) -> Result<Vec<Theme>>;
}

/// Extract and validate the themed dictionary from a summarizer answer.
///
/// The themes come back in the order they appear in the answer. A missing
/// block or a body that is not a JSON object rejects the answer; individual
/// entries that are not arrays of strings are skipped.
pub fn parse_themed_dictionary(answer: &str) -> Result<Vec<Theme>, SummarizerError> {
    let start = answer.find(OPEN_TAG).ok_or(SummarizerError::MissingBlock)? + OPEN_TAG.len();
    let end = answer[start..]
        .find(CLOSE_TAG)
        .ok_or(SummarizerError::MissingBlock)?
        + start;
    let body = answer[start..end].trim();

    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(body).map_err(|e| SummarizerError::Malformed(e.to_string()))?;

    let mut themes = Vec::with_capacity(map.len());
    for (name, value) in map {
        match serde_json::from_value::<Vec<String>>(value) {
            Ok(tokens) => themes.push(Theme { name, tokens }),
            Err(e) => warn!(theme = %name, "Skipping malformed theme entry: {}", e),
        }
    }
    Ok(themes)
}

/// Order themes by member count, largest first; ties keep their answer order.
pub fn rank_themes(mut themes: Vec<Theme>) -> Vec<Theme> {
    themes.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
    themes
}

/// All names followed by all symbols, comma-joined.
pub fn token_list(tokens: &[StoredToken]) -> String {
    let names = tokens.iter().filter_map(|t| t.token.name.as_deref());
    let symbols = tokens.iter().filter_map(|t| t.token.symbol.as_deref());
    names.chain(symbols).collect::<Vec<_>>().join(",")
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Summarizer backed by the Anthropic Messages API.
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicSummarizer {
    /// `None` when no API key is configured.
    pub fn from_config(config: &SummarizerConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }))
    }

    async fn complete(&self, blocks: &[String]) -> Result<String, SummarizerError> {
        let content: Vec<_> = blocks
            .iter()
            .map(|text| serde_json::json!({ "type": "text", "text": text }))
            .collect();
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "messages": [{ "role": "user", "content": content }],
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SummarizerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| SummarizerError::Malformed(e.to_string()))?;
        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn summarize(&self, token_list: &str) -> Result<Vec<Theme>> {
        let answer = self.complete(&prompt_blocks(token_list)).await?;
        debug!(chars = answer.len(), "Summarizer answered");
        Ok(parse_themed_dictionary(&answer)?)
    }
}

/// Builds and stores theme mappings from recently discovered tokens.
pub struct ThemeReducer {
    storage: Arc<dyn TokenStorage>,
    summarizer: Arc<dyn Summarizer>,
}

impl ThemeReducer {
    pub fn new(storage: Arc<dyn TokenStorage>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            storage,
            summarizer,
        }
    }

    /// Summarize tokens stored since `since`, persist every theme and return
    /// the `top_n` largest. Persisting is skipped when `persist` is false.
    pub async fn reduce_since(&self, since: DateTime<Utc>, top_n: usize, persist: bool) -> Result<Vec<Theme>> {
        let tokens = self.storage.get_tokens_since(since).await?;
        if tokens.is_empty() {
            info!("No tokens since {}, nothing to summarize", since);
            return Ok(Vec::new());
        }

        let themes = rank_themes(self.summarizer.summarize(&token_list(&tokens)).await?);
        info!("Summarizer produced {} themes from {} tokens", themes.len(), tokens.len());

        if persist {
            self.storage.save_themes(&themes).await?;
        }

        Ok(themes.into_iter().take(top_n).collect())
    }
}

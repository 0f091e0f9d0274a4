//! Card extraction - parses rendered launch-page HTML into token records.
//!
//! Extraction is tolerant: absent fields become `None`, and a card that
//! cannot be parsed is logged and skipped without affecting its neighbours.

use crate::types::TokenRecord;
use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const CARD: &str = "div.bg-white.rounded-lg.shadow-sm";
const NAME: &str = "h2.text-lg";
const SYMBOL: &str = "p.text-sm.text-gray-500";
const AGE: &str = "span.text-xs.text-gray-400";
const CREATOR_LINK: &str = "a[href*=\"warpcast.com\"]";
const CONTRACT: &str = "p.break-all";
const IMAGE: &str = "img.w-full.h-full";
const ANY_LINK: &str = "a[href]";

const DEX_MARKER: &str = "dexscreener.com";
const EXPLORER_MARKER: &str = "basescan.org";
const LAUNCH_PAGE_MARKER: &str = "/clanker/";

/// Why a single card was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum CardError {
    #[error("card has no recognisable fields or links")]
    Empty,

    #[error("link {href:?} cannot be resolved: {reason}")]
    InvalidLink { href: String, reason: String },
}

/// Records parsed from one page, plus how many cards were dropped.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub tokens: Vec<TokenRecord>,
    pub skipped: usize,
}

struct Selectors {
    title: Selector,
    card: Selector,
    name: Selector,
    symbol: Selector,
    age: Selector,
    creator_link: Selector,
    contract: Selector,
    image: Selector,
    any_link: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| anyhow!("invalid selector {s}: {e}"));
        Ok(Self {
            title: parse("title")?,
            card: parse(CARD)?,
            name: parse(NAME)?,
            symbol: parse(SYMBOL)?,
            age: parse(AGE)?,
            creator_link: parse(CREATOR_LINK)?,
            contract: parse(CONTRACT)?,
            image: parse(IMAGE)?,
            any_link: parse(ANY_LINK)?,
        })
    }
}

/// Structural parser for launch-page token cards.
pub struct CardExtractor {
    base_url: Url,
    selectors: Selectors,
}

impl CardExtractor {
    pub fn new(base_url: Url) -> Result<Self> {
        Ok(Self {
            base_url,
            selectors: Selectors::new()?,
        })
    }

    /// Extractor for the launch page, resolving links against `page_url`'s origin.
    pub fn for_page(page_url: &str) -> Result<Self> {
        let base = Url::parse(page_url)
            .with_context(|| format!("Invalid page URL: {page_url}"))?;
        Self::new(base)
    }

    /// Parse every card in document order (newest token first).
    pub fn extract(&self, html: &str) -> ExtractionReport {
        let document = Html::parse_document(html);
        let title = document
            .select(&self.selectors.title)
            .next()
            .map(text_of)
            .unwrap_or_default();
        debug!(title = %title, "Starting HTML parsing");

        let mut report = ExtractionReport::default();
        let cards: Vec<ElementRef> = document.select(&self.selectors.card).collect();
        debug!("Found {} token cards", cards.len());

        for (idx, card) in cards.into_iter().enumerate() {
            match self.parse_card(card) {
                Ok(token) => {
                    debug!(
                        "Parsed token: {} ({})",
                        token.name_or_unknown(),
                        token.symbol_or_unknown()
                    );
                    report.tokens.push(token);
                }
                Err(e) => {
                    warn!("Error parsing token card {}: {}", idx + 1, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    fn parse_card(&self, card: ElementRef) -> Result<TokenRecord, CardError> {
        let s = &self.selectors;

        let name = first_text(card, &s.name);
        let symbol = first_text(card, &s.symbol);
        let age_label = first_text(card, &s.age);

        let contract_address = card
            .select(&s.contract)
            .next()
            .and_then(|p| p.value().attr("title"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let (creator_handle, creator_profile_url) = match card.select(&s.creator_link).next() {
            Some(a) => {
                let handle = Some(text_of(a)).filter(|h| !h.is_empty());
                let href = a.value().attr("href").map(str::to_string);
                (handle, href)
            }
            None => {
                debug!("Creator info not found");
                (None, None)
            }
        };

        let image_url = card
            .select(&s.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        let hrefs: Vec<&str> = card
            .select(&s.any_link)
            .filter_map(|a| a.value().attr("href"))
            .collect();

        let recognisable = [&name, &symbol, &age_label, &contract_address, &image_url]
            .iter()
            .any(|field| field.is_some());
        if !recognisable && hrefs.is_empty() {
            return Err(CardError::Empty);
        }

        Ok(TokenRecord {
            contract_address,
            name,
            symbol,
            age_label,
            creator_handle,
            creator_profile_url,
            image_url,
            dex_link: self.classify(&hrefs, DEX_MARKER)?,
            explorer_link: self.classify(&hrefs, EXPLORER_MARKER)?,
            launch_page_link: self.classify(&hrefs, LAUNCH_PAGE_MARKER)?,
        })
    }

    /// First href containing `marker`, resolved to an absolute URL.
    fn classify(&self, hrefs: &[&str], marker: &str) -> Result<Option<String>, CardError> {
        let Some(href) = hrefs.iter().find(|h| h.contains(marker)) else {
            return Ok(None);
        };
        self.base_url
            .join(href)
            .map(|u| Some(u.to_string()))
            .map_err(|e| CardError::InvalidLink {
                href: href.to_string(),
                reason: e.to_string(),
            })
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(card: ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

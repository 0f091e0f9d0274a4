//! Console table and JSON output for run reports.

use crate::scout::announcer::{format_score, search_link, wallet_analysis_link};
use crate::scout::types::{ProcessedToken, RunReport, Theme};
use crate::types::NOT_AVAILABLE;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const HEADERS: [&str; 11] = [
    "Name",
    "Symbol",
    "Dexscreener Link",
    "BaseScan Link",
    "Clanker Link",
    "Warpcast Link",
    "Power Badge",
    "Followers",
    "Neynar Score",
    "Search Link",
    "DEXCheck Links",
];

fn row(token: &ProcessedToken) -> [String; 11] {
    let t = &token.enriched.token;
    let creator = token.enriched.creator.as_ref();
    let link = |l: &Option<String>| l.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let wallets = creator
        .map(|c| &c.verified_eth_addresses)
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.iter()
                .map(|addr| wallet_analysis_link(addr))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    [
        t.name_or_unknown().to_string(),
        t.symbol_or_unknown().to_string(),
        link(&t.dex_link),
        link(&t.explorer_link),
        link(&t.launch_page_link),
        link(&t.creator_profile_url),
        creator.map_or(false, |c| c.has_badge).to_string(),
        creator
            .map(|c| c.follower_count.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        format_score(token.enriched.reputation_score()),
        search_link(t.name_or_unknown()),
        wallets,
    ]
}

/// Render the tokens of a run as a left-aligned, space-padded table.
pub fn render_table(report: &RunReport) -> String {
    let rows: Vec<[String; 11]> = report.tokens.iter().map(row).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for r in &rows {
        for (w, cell) in widths.iter_mut().zip(r) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::from("Clanker Tokens\n");
    let header: [String; 11] = HEADERS.map(str::to_string);
    for r in std::iter::once(&header).chain(rows.iter()) {
        let line = r
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Numbered theme listing.
pub fn render_themes(themes: &[Theme]) -> String {
    themes
        .iter()
        .enumerate()
        .map(|(i, theme)| format!("{}. {}: {}\n", i + 1, theme.name, theme.tokens.join(", ")))
        .collect()
}

/// Write the report as pretty JSON.
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Sibling path for the raw HTML dump: `<output>.html`.
pub fn html_dump_path(output: &Path) -> PathBuf {
    let mut raw = output.as_os_str().to_owned();
    raw.push(".html");
    PathBuf::from(raw)
}

//! Storage abstraction layer for discovered tokens.
//!
//! Defines the persistence contract used by the pipeline and its SQLite
//! implementation. Tokens and creator details are upserted by contract
//! address; themes are upserted by `(theme_name, symbol)`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::scout::error::StoreError;
use crate::scout::types::Theme;
use crate::types::{CreatorProfile, StoredToken, TokenRecord, UNKEYED_PREFIX};

/// Formal contract for the durable token store.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Upsert a token and, when given, its creator details. Last write wins.
    async fn save_token(&self, token: &TokenRecord, creator: Option<&CreatorProfile>) -> Result<()>;

    /// Upsert creator details for a token that must already be stored.
    /// Fails with `StoreError::UnknownToken` otherwise.
    async fn add_creator_details(&self, contract_address: &str, creator: &CreatorProfile) -> Result<()>;

    async fn get_token(&self, contract_address: &str) -> Result<Option<TokenRecord>>;

    async fn get_token_with_creator(&self, contract_address: &str) -> Result<Option<StoredToken>>;

    /// Every stored token, newest first.
    async fn get_all_tokens(&self) -> Result<Vec<StoredToken>>;

    /// Tokens first stored at or after `since`, newest first.
    async fn get_tokens_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredToken>>;

    async fn save_themes(&self, themes: &[Theme]) -> Result<()>;

    /// Stored themes, most recently written first.
    async fn get_themes(&self) -> Result<Vec<Theme>>;

    async fn token_count(&self) -> Result<i64>;

    async fn health_check(&self) -> Result<bool>;
}

const TOKEN_COLUMNS: &str = r#"
    t.contract_address, t.name, t.symbol, t.time_ago, t.creator_name, t.creator_link,
    t.image_url, t.dexscreener_url, t.basescan_url, t.clanker_url, t.created_at,
    cd.username, cd.eth_addresses, cd.follower_count, cd.neynar_score, cd.power_badge
"#;

/// A `tokens` row left-joined with `creator_details`.
#[derive(FromRow)]
struct TokenRow {
    contract_address: String,
    name: Option<String>,
    symbol: Option<String>,
    time_ago: Option<String>,
    creator_name: Option<String>,
    creator_link: Option<String>,
    image_url: Option<String>,
    dexscreener_url: Option<String>,
    basescan_url: Option<String>,
    clanker_url: Option<String>,
    created_at: i64,

    username: Option<String>,
    eth_addresses: Option<String>,
    follower_count: Option<i64>,
    neynar_score: Option<f64>,
    power_badge: Option<bool>,
}

impl TokenRow {
    fn into_stored(self) -> Result<StoredToken> {
        let created_at = Utc
            .timestamp_millis_opt(self.created_at)
            .single()
            .ok_or_else(|| anyhow!("Invalid created_at {} for {}", self.created_at, self.contract_address))?;

        let creator = match (self.username, self.follower_count) {
            (Some(username), Some(followers)) => Some(CreatorProfile {
                username,
                verified_eth_addresses: split_addresses(self.eth_addresses.as_deref()),
                follower_count: u64::try_from(followers).unwrap_or(0),
                reputation_score: self.neynar_score,
                has_badge: self.power_badge.unwrap_or(false),
            }),
            _ => None,
        };

        // Derived keys stand in for an address the card never carried.
        let contract_address =
            Some(self.contract_address).filter(|key| !key.starts_with(UNKEYED_PREFIX));

        Ok(StoredToken {
            token: TokenRecord {
                contract_address,
                name: self.name,
                symbol: self.symbol,
                age_label: self.time_ago,
                creator_handle: self.creator_name,
                creator_profile_url: self.creator_link,
                image_url: self.image_url,
                dex_link: self.dexscreener_url,
                explorer_link: self.basescan_url,
                launch_page_link: self.clanker_url,
            },
            creator,
            created_at,
        })
    }
}

#[derive(FromRow)]
struct ThemeRow {
    theme_name: String,
    symbol: String,
}

fn split_addresses(joined: Option<&str>) -> Vec<String> {
    joined
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn follower_count_column(creator: &CreatorProfile) -> i64 {
    i64::try_from(creator.follower_count).unwrap_or(i64::MAX)
}

/// SQLite implementation of `TokenStorage`.
pub struct SqliteTokenStore {
    pool: Pool<Sqlite>,
}

impl SqliteTokenStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        Self::create_schema(&pool).await?;
        info!("SqliteTokenStore initialized and connected to {}", path.display());

        Ok(Arc::new(Self { pool }))
    }

    /// A private in-memory database, mostly for tests and dry runs.
    pub async fn in_memory() -> Result<Arc<Self>> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::create_schema(&pool).await?;
        Ok(Arc::new(Self { pool }))
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                contract_address TEXT PRIMARY KEY,
                name TEXT,
                symbol TEXT,
                time_ago TEXT,
                creator_name TEXT,
                creator_link TEXT,
                image_url TEXT,
                dexscreener_url TEXT,
                basescan_url TEXT,
                clanker_url TEXT,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create tokens table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS creator_details (
                contract_address TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                eth_addresses TEXT NOT NULL,
                follower_count INTEGER NOT NULL,
                neynar_score REAL,
                power_badge BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (contract_address) REFERENCES tokens (contract_address)
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create creator_details table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS themes (
                theme_name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                theme_rank INTEGER NOT NULL,
                position INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (theme_name, symbol)
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create themes table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tokens_created_at ON tokens (created_at)")
            .execute(pool)
            .await
            .context("Failed to create tokens index")?;

        Ok(())
    }

    /// Upsert with an explicit first-seen timestamp, keyed by
    /// `TokenRecord::dedup_key`. An existing row keeps its original `created_at`.
    pub async fn save_token_at(
        &self,
        token: &TokenRecord,
        creator: Option<&CreatorProfile>,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let key = token.dedup_key();
        let address = key.as_str();
        debug!("Saving token {}", address);

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO tokens (
                contract_address, name, symbol, time_ago, creator_name, creator_link,
                image_url, dexscreener_url, basescan_url, clanker_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (contract_address) DO UPDATE SET
                name = excluded.name,
                symbol = excluded.symbol,
                time_ago = excluded.time_ago,
                creator_name = excluded.creator_name,
                creator_link = excluded.creator_link,
                image_url = excluded.image_url,
                dexscreener_url = excluded.dexscreener_url,
                basescan_url = excluded.basescan_url,
                clanker_url = excluded.clanker_url;
            "#,
        )
        .bind(address)
        .bind(&token.name)
        .bind(&token.symbol)
        .bind(&token.age_label)
        .bind(&token.creator_handle)
        .bind(&token.creator_profile_url)
        .bind(&token.image_url)
        .bind(&token.dex_link)
        .bind(&token.explorer_link)
        .bind(&token.launch_page_link)
        .bind(created_at.timestamp_millis())
        .execute(&mut *tx)
        .await
        .context("Failed to upsert token")?;

        if let Some(creator) = creator {
            upsert_creator(&mut tx, address, creator).await?;
        }

        tx.commit().await.context("Failed to commit token")?;
        Ok(())
    }

    async fn fetch_joined(&self, filter: &str, since_millis: Option<i64>, address: Option<&str>) -> Result<Vec<StoredToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens t \
             LEFT JOIN creator_details cd ON t.contract_address = cd.contract_address \
             {filter} ORDER BY t.created_at DESC, t.rowid DESC"
        );
        let mut query = sqlx::query_as::<_, TokenRow>(&sql);
        if let Some(since) = since_millis {
            query = query.bind(since);
        }
        if let Some(address) = address {
            query = query.bind(address);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch tokens")?;
        rows.into_iter().map(TokenRow::into_stored).collect()
    }
}

async fn upsert_creator(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    address: &str,
    creator: &CreatorProfile,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO creator_details (
            contract_address, username, eth_addresses, follower_count, neynar_score, power_badge
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (contract_address) DO UPDATE SET
            username = excluded.username,
            eth_addresses = excluded.eth_addresses,
            follower_count = excluded.follower_count,
            neynar_score = excluded.neynar_score,
            power_badge = excluded.power_badge;
        "#,
    )
    .bind(address)
    .bind(&creator.username)
    .bind(creator.verified_eth_addresses.join(","))
    .bind(follower_count_column(creator))
    .bind(creator.reputation_score)
    .bind(creator.has_badge)
    .execute(&mut **tx)
    .await
    .context("Failed to upsert creator details")?;
    Ok(())
}

#[async_trait]
impl TokenStorage for SqliteTokenStore {
    async fn save_token(&self, token: &TokenRecord, creator: Option<&CreatorProfile>) -> Result<()> {
        self.save_token_at(token, creator, Utc::now()).await
    }

    async fn add_creator_details(&self, contract_address: &str, creator: &CreatorProfile) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tokens WHERE contract_address = ?")
            .bind(contract_address)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up token")?;
        if exists.is_none() {
            return Err(StoreError::UnknownToken(contract_address.to_string()).into());
        }

        upsert_creator(&mut tx, contract_address, creator).await?;
        tx.commit().await.context("Failed to commit creator details")?;
        Ok(())
    }

    async fn get_token(&self, contract_address: &str) -> Result<Option<TokenRecord>> {
        Ok(self
            .get_token_with_creator(contract_address)
            .await?
            .map(|stored| stored.token))
    }

    async fn get_token_with_creator(&self, contract_address: &str) -> Result<Option<StoredToken>> {
        let mut rows = self
            .fetch_joined("WHERE t.contract_address = ?", None, Some(contract_address))
            .await?;
        Ok(rows.pop())
    }

    async fn get_all_tokens(&self) -> Result<Vec<StoredToken>> {
        self.fetch_joined("", None, None).await
    }

    async fn get_tokens_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredToken>> {
        self.fetch_joined("WHERE t.created_at >= ?", Some(since.timestamp_millis()), None)
            .await
    }

    async fn save_themes(&self, themes: &[Theme]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (rank, theme) in themes.iter().enumerate() {
            for (position, symbol) in theme.tokens.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO themes (theme_name, symbol, theme_rank, position, updated_at)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT (theme_name, symbol) DO UPDATE SET
                        theme_rank = excluded.theme_rank,
                        position = excluded.position,
                        updated_at = excluded.updated_at;
                    "#,
                )
                .bind(&theme.name)
                .bind(symbol)
                .bind(rank as i64)
                .bind(position as i64)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to save theme")?;
            }
        }

        tx.commit().await.context("Failed to commit themes")?;
        Ok(())
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        let rows: Vec<ThemeRow> = sqlx::query_as(
            r#"
            SELECT theme_name, symbol FROM themes
            ORDER BY updated_at DESC, theme_rank ASC, position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch themes")?;

        let mut themes: Vec<Theme> = Vec::new();
        for row in rows {
            match themes.iter_mut().find(|t| t.name == row.theme_name) {
                Some(theme) => theme.tokens.push(row.symbol),
                None => themes.push(Theme {
                    name: row.theme_name,
                    tokens: vec![row.symbol],
                }),
            }
        }
        Ok(themes)
    }

    async fn token_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await
            .context("Failed to get token count")?;
        Ok(count.0)
    }

    async fn health_check(&self) -> Result<bool> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_without_address_is_stored_under_derived_key() {
        let store = SqliteTokenStore::in_memory().await.unwrap();
        let token = TokenRecord {
            name: Some("Nameless".to_string()),
            dex_link: Some("https://dexscreener.com/base/pair1".to_string()),
            ..Default::default()
        };
        store.save_token(&token, None).await.unwrap();
        store.save_token(&token, None).await.unwrap();

        let key = token.dedup_key();
        let stored = store.get_token(&key).await.unwrap().expect("token stored");
        assert_eq!(stored.contract_address, None);
        assert_eq!(stored.dedup_key(), key);
        assert_eq!(store.token_count().await.unwrap(), 1);
    }

    #[test]
    fn test_split_addresses() {
        assert_eq!(split_addresses(Some("0x1,0x2")), vec!["0x1", "0x2"]);
        assert!(split_addresses(Some("")).is_empty());
        assert!(split_addresses(None).is_empty());
    }
}

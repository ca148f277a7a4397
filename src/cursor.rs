//! Durable pagination-token cache.
//!
//! The search provider pages with opaque continuation tokens, and a token is
//! only meaningful for the query that produced it. Tokens are therefore
//! filed under a query fingerprint (see [`crate::query::query_fingerprint`])
//! rather than a single global slot, and persisted to SQLite so "load more"
//! keeps working across process restarts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

/// Cheap cloneable handle that opens a short-lived connection per operation,
/// so callers on blocking task threads never share a connection.
#[derive(Debug, Clone)]
pub struct TokenCache {
    db_path: PathBuf,
}

impl TokenCache {
    /// Opens (and if necessary creates) the cache DB and ensures the schema
    /// exists. WAL mode is enabled to avoid readers blocking writers.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating token cache directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening token cache {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("enabling WAL mode for token cache")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")
            .context("setting token cache synchronous mode")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS page_tokens (
                fingerprint TEXT PRIMARY KEY,
                token TEXT NOT NULL
            );
            "#,
        )
        .context("creating token cache schema")?;

        Ok(Self {
            db_path: path.to_path_buf(),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening token cache {}", self.db_path.display()))?;
        f(&conn)
    }

    /// Persists the most recent continuation token for `fingerprint`,
    /// overwriting any previous value.
    pub fn store(&self, fingerprint: &str, token: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO page_tokens (fingerprint, token)
                VALUES (?1, ?2)
                ON CONFLICT(fingerprint) DO UPDATE SET
                    token = excluded.token
                "#,
                params![fingerprint, token],
            )?;
            Ok(())
        })
    }

    /// Returns the last stored token for `fingerprint`, if any.
    pub fn retrieve(&self, fingerprint: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT token
                FROM page_tokens
                WHERE fingerprint = ?1
                "#,
            )?;
            let token = stmt
                .query_row([fingerprint], |row| row.get(0))
                .optional()
                .context("reading cached page token")?;
            Ok(token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fingerprint_returns_none() -> Result<()> {
        let temp = tempdir()?;
        let cache = TokenCache::open(temp.path().join("catalog.db"))?;
        assert_eq!(cache.retrieve("music::date")?, None);
        Ok(())
    }

    #[test]
    fn stored_token_round_trips() -> Result<()> {
        let temp = tempdir()?;
        let cache = TokenCache::open(temp.path().join("catalog.db"))?;
        cache.store("music::date", "CAoQAA")?;
        assert_eq!(cache.retrieve("music::date")?.as_deref(), Some("CAoQAA"));
        Ok(())
    }

    #[test]
    fn store_overwrites_the_previous_token() -> Result<()> {
        let temp = tempdir()?;
        let cache = TokenCache::open(temp.path().join("catalog.db"))?;
        cache.store("music::date", "CAoQAA")?;
        cache.store("music::date", "CBQQAA")?;
        assert_eq!(cache.retrieve("music::date")?.as_deref(), Some("CBQQAA"));
        Ok(())
    }

    #[test]
    fn fingerprints_do_not_alias() -> Result<()> {
        let temp = tempdir()?;
        let cache = TokenCache::open(temp.path().join("catalog.db"))?;
        cache.store("music::date", "CAoQAA")?;
        cache.store("music::viewCount", "CBQQAA")?;
        assert_eq!(cache.retrieve("music::date")?.as_deref(), Some("CAoQAA"));
        assert_eq!(
            cache.retrieve("music::viewCount")?.as_deref(),
            Some("CBQQAA")
        );
        Ok(())
    }

    #[test]
    fn tokens_survive_reopening_the_cache() -> Result<()> {
        let temp = tempdir()?;
        let db_path = temp.path().join("catalog.db");
        {
            let cache = TokenCache::open(&db_path)?;
            cache.store("music::date", "CAoQAA")?;
        }
        let reopened = TokenCache::open(&db_path)?;
        assert_eq!(reopened.retrieve("music::date")?.as_deref(), Some("CAoQAA"));
        Ok(())
    }

    #[test]
    fn open_creates_missing_parent_directories() -> Result<()> {
        let temp = tempdir()?;
        let nested = temp.path().join("data").join("cache").join("catalog.db");
        let cache = TokenCache::open(&nested)?;
        cache.store("music::date", "CAoQAA")?;
        assert!(nested.exists());
        Ok(())
    }
}

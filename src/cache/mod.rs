//! Persistent key-value cache
//!
//! Durability mirror of the in-memory console state: one JSON document per
//! logical resource snapshot (`"products"`, `"product"`, `"token"`, ...).
//! There is no TTL and no eviction; entries are overwritten wholesale and the
//! whole cache is cleared at the session boundary.

use crate::db::DatabaseManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Well-known cache keys that are not tied to a single resource container
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const CURRENT_USER: &str = "currentUser";
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<crate::core::ConsoleError> for CacheError {
    fn from(err: crate::core::ConsoleError) -> Self {
        CacheError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value store holding JSON documents
pub trait KeyValueCache: Send + Sync {
    /// Read the document stored under `key`
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the document stored under `key`
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove a single entry
    fn clear(&self, key: &str) -> Result<()>;

    /// Remove every entry, returning how many were removed
    fn clear_all(&self) -> Result<usize>;

    /// Keys currently stored, sorted
    fn keys(&self) -> Result<Vec<String>>;
}

/// Shared handle passed to every container
pub type SharedCache = Arc<dyn KeyValueCache>;

/// Read and deserialize a cached document
///
/// Missing, unreadable or mismatched entries all come back as `None`; the
/// cache is a mirror, so a bad entry only costs a refetch.
pub fn load<T: DeserializeOwned>(cache: &dyn KeyValueCache, key: &str) -> Option<T> {
    match cache.get(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, "Ignoring cache entry with unexpected shape: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, "Failed to read cache entry: {}", e);
            None
        }
    }
}

/// Serialize and store a document, logging instead of failing
pub fn store<T: Serialize + ?Sized>(cache: &dyn KeyValueCache, key: &str, value: &T) {
    let result = serde_json::to_value(value)
        .map_err(CacheError::from)
        .and_then(|value| cache.set(key, &value));

    if let Err(e) = result {
        tracing::warn!(key, "Failed to persist cache entry: {}", e);
    }
}

/// Cache stored in the SQLite `cache_entries` table
#[derive(Clone)]
pub struct SqliteCache {
    db: DatabaseManager,
}

impl SqliteCache {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    /// In-memory SQLite cache
    pub fn in_memory() -> crate::core::Result<Self> {
        Ok(Self::new(DatabaseManager::new_in_memory()?))
    }
}

impl KeyValueCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        use rusqlite::OptionalExtension;

        let conn = self.db.get_connection()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(CacheError::from)
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.db.get_connection()?;
        let text = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, text, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute("DELETE FROM cache_entries WHERE key = ?", [key])?;
        Ok(())
    }

    fn clear_all(&self) -> Result<usize> {
        let conn = self.db.get_connection()?;
        Ok(conn.execute("DELETE FROM cache_entries", [])?)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare("SELECT key FROM cache_entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

/// Cache held in process memory only
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn clear_all(&self) -> Result<usize> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn exercise(cache: &dyn KeyValueCache) {
        assert_eq!(cache.get("products").unwrap(), None);

        cache.set("products", &json!([{"id": 1, "name": "Cement"}])).unwrap();
        cache.set("token", &json!("abc")).unwrap();
        assert_eq!(
            cache.get("products").unwrap(),
            Some(json!([{"id": 1, "name": "Cement"}]))
        );

        // Overwritten wholesale, never merged
        cache.set("products", &json!([{"id": 2}])).unwrap();
        assert_eq!(cache.get("products").unwrap(), Some(json!([{"id": 2}])));

        assert_eq!(cache.keys().unwrap(), vec!["products".to_string(), "token".to_string()]);

        cache.clear("token").unwrap();
        assert_eq!(cache.get("token").unwrap(), None);

        cache.set("units", &json!(null)).unwrap();
        assert_eq!(cache.clear_all().unwrap(), 2);
        assert!(cache.keys().unwrap().is_empty());
    }

    #[test]
    fn test_memory_cache_contract() {
        exercise(&MemoryCache::new());
    }

    #[test]
    fn test_sqlite_cache_contract() {
        exercise(&SqliteCache::in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_cache_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");

        {
            let db = DatabaseManager::new(&path, 2, Duration::from_secs(5)).unwrap();
            SqliteCache::new(db).set(keys::TOKEN, &json!("abc")).unwrap();
        }

        let db = DatabaseManager::new(&path, 2, Duration::from_secs(5)).unwrap();
        let cache = SqliteCache::new(db);
        assert_eq!(cache.get(keys::TOKEN).unwrap(), Some(json!("abc")));
    }

    #[test]
    fn test_typed_helpers() {
        let cache = MemoryCache::new();
        store(&cache, "roles", &vec!["admin", "seller"]);
        assert_eq!(
            load::<Vec<String>>(&cache, "roles"),
            Some(vec!["admin".to_string(), "seller".to_string()])
        );

        // Wrong shape reads as absent
        assert_eq!(load::<u64>(&cache, "roles"), None);
        assert_eq!(load::<u64>(&cache, "missing"), None);
    }
}

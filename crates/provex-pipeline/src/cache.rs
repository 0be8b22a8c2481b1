//! Content-addressed cache for model responses.
//!
//! Keys are the hex SHA-256 of the exact input bytes (a page image, or a
//! question's stem+options+answer). Entries are immutable once written:
//! unchanged input always replays the cached response instead of spending an
//! API call.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::dataset::hex_digest;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    /// Cache rooted at one `cache/<year>/<purpose>/` directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn key_for(input: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input);
        hex_digest(hasher)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.entry_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Store a response. An existing entry is left untouched.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.entry_path(key);
        if path.is_file() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_hex_sha256() {
        let key = ContentCache::key_for(b"conteudo");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, ContentCache::key_for(b"conteudo"));
        assert_ne!(key, ContentCache::key_for(b"outro"));
    }

    #[test]
    fn miss_then_hit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path().join("2020").join("enrichment"));
        let key = ContentCache::key_for(b"q01");

        assert!(cache.get::<serde_json::Value>(&key).unwrap().is_none());
        cache.put(&key, &serde_json::json!({"theory": "ok"})).unwrap();
        let hit: serde_json::Value = cache.get(&key).unwrap().unwrap();
        assert_eq!(hit["theory"], "ok");
    }

    #[test]
    fn entries_are_immutable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path());
        let key = ContentCache::key_for(b"q02");
        cache.put(&key, &serde_json::json!({"v": 1})).unwrap();
        cache.put(&key, &serde_json::json!({"v": 2})).unwrap();
        let kept: serde_json::Value = cache.get(&key).unwrap().unwrap();
        assert_eq!(kept["v"], 1);
    }
}

//! Content-addressed cache for extracted document text.
//!
//! Keys are the SHA-256 of the raw upload bytes, so the same document uploaded
//! under a different file name or MIME label still hits. Eviction is strictly
//! insertion order (FIFO); a hit does not refresh an entry's position.
//!
//! Texts live in a `DashMap`, so a hit locks only its own shard. The FIFO
//! order list sits behind a mutex that only inserts take.

use std::collections::VecDeque;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CacheConfig;
use crate::extraction::{normalize_whitespace, ExtractError, Extractor};

/// Hex SHA-256 of the document bytes.
pub fn content_key(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Process-wide extraction cache. Construct once at startup and share via `Arc`.
pub struct ExtractionCache {
    texts: DashMap<String, String>,
    /// Insertion order of `texts` keys. Held for the whole of an insert so
    /// eviction and the new entry land together.
    order: Mutex<VecDeque<String>>,
    capacity: usize,
    min_chars: usize,
}

impl ExtractionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            texts: DashMap::with_capacity(config.capacity),
            order: Mutex::new(VecDeque::with_capacity(config.capacity)),
            capacity: config.capacity.max(1),
            min_chars: config.min_extracted_chars,
        }
    }

    /// Returns the cached text for `bytes`, or extracts, normalizes, checks and
    /// stores it. The lock is never held across the extractor call.
    pub async fn get_or_extract(
        &self,
        bytes: &Bytes,
        mime_type: &str,
        extractor: &dyn Extractor,
    ) -> Result<String, ExtractError> {
        let key = content_key(bytes);

        if let Some(text) = self.get(&key) {
            debug!(key = %&key[..12], "Extraction cache hit");
            return Ok(text);
        }
        debug!(key = %&key[..12], "Extraction cache miss");

        let raw = extractor.extract(bytes.clone(), mime_type).await?;
        let text = normalize_whitespace(&raw);

        let chars = text.chars().count();
        if chars < self.min_chars {
            return Err(ExtractError::InsufficientText {
                chars,
                min: self.min_chars,
            });
        }

        self.insert(key, text.clone());
        Ok(text)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.texts.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: String, text: String) {
        let mut order = self.order.lock();
        // A concurrent miss on the same bytes may have stored it already.
        if self.texts.contains_key(&key) {
            return;
        }
        if order.len() >= self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.texts.remove(&oldest);
            }
        }
        order.push_back(key.clone());
        self.texts.insert(key, text);
    }

    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.texts.contains_key(&content_key(bytes))
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

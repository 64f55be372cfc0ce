//! Batch Executor
//!
//! Splits large multi-key reads into bounded chunks so each remote round
//! trip stays within the protocol's practical key-count and packet limits.

use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::traits::RemoteCache;

/// Result of one chunked multi-get
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Every requested key, `None` where the remote store had nothing
    pub values: HashMap<String, Option<Vec<u8>>>,
    /// Remote calls issued
    pub round_trips: usize,
    /// Chunks whose remote call failed (their keys are reported absent)
    pub failed_chunks: usize,
}

/// Chunked multi-get dispatcher
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    chunk_size: usize,
}

impl BatchExecutor {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fetch `keys` in chunks of at most `chunk_size`
    ///
    /// Duplicate keys are collapsed before chunking so no key is requested
    /// twice. Chunks are dispatched concurrently and merged by union.
    pub async fn get_multi(&self, remote: &dyn RemoteCache, keys: &[String]) -> BatchResult {
        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|key| seen.insert(*key))
            .collect();
        if unique.is_empty() {
            return BatchResult::default();
        }

        let chunks: Vec<&[&str]> = unique.chunks(self.chunk_size).collect();
        let responses = join_all(chunks.iter().map(|chunk| remote.get_multi(chunk))).await;

        let mut result = BatchResult {
            values: HashMap::with_capacity(unique.len()),
            round_trips: chunks.len(),
            failed_chunks: 0,
        };
        for (chunk, response) in chunks.iter().zip(responses) {
            match response {
                Ok(mut found) => {
                    for key in *chunk {
                        result.values.insert((*key).to_owned(), found.remove(*key));
                    }
                }
                Err(e) => {
                    warn!(keys = chunk.len(), error = %e, "Multi-get chunk failed; treating keys as misses");
                    result.failed_chunks += 1;
                    for key in *chunk {
                        result.values.insert((*key).to_owned(), None);
                    }
                }
            }
        }

        debug!(
            keys = unique.len(),
            round_trips = result.round_trips,
            failed = result.failed_chunks,
            "Chunked multi-get completed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;

    #[tokio::test]
    async fn test_chunks_cover_every_key_once() {
        let store = MemoryStore::new();
        store.set("k1", b"1", None).await.unwrap();
        store.set("k7", b"7", None).await.unwrap();

        let keys: Vec<String> = (0..10).map(|i| format!("k{i}")).collect();
        let result = BatchExecutor::new(3).get_multi(&store, &keys).await;

        assert_eq!(result.round_trips, 4);
        assert_eq!(store.multi_get_calls(), 4);
        assert_eq!(result.values.len(), 10);
        assert_eq!(result.values["k1"], Some(b"1".to_vec()));
        assert_eq!(result.values["k7"], Some(b"7".to_vec()));
        assert_eq!(result.values["k0"], None);
    }

    #[tokio::test]
    async fn test_duplicates_are_requested_once() {
        let store = MemoryStore::new();
        let keys = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let result = BatchExecutor::new(2).get_multi(&store, &keys).await;

        assert_eq!(result.round_trips, 1);
        assert_eq!(result.values.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_chunks_report_absent() {
        let store = MemoryStore::new();
        store.set("a", b"1", None).await.unwrap();
        store.set_available(false);

        let keys = vec!["a".to_string(), "b".to_string()];
        let result = BatchExecutor::new(1).get_multi(&store, &keys).await;

        assert_eq!(result.failed_chunks, 2);
        assert_eq!(result.values["a"], None);
    }

    #[tokio::test]
    async fn test_empty_request_skips_remote() {
        let store = MemoryStore::new();
        let result = BatchExecutor::new(10).get_multi(&store, &[]).await;
        assert_eq!(result.round_trips, 0);
        assert_eq!(store.multi_get_calls(), 0);
    }
}

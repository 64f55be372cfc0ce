//! Flush Generations
//!
//! Mass invalidation without wiping the remote store: every physical key
//! embeds its scope's current generation, so rotating the generation makes
//! every older key unreachable. Orphaned entries are left for the remote
//! store's own eviction to reclaim.
//!
//! Generations live in the remote store under fixed bookkeeping keys and
//! are memoized for the rest of the unit of work after the first read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::codecs;
use crate::keys::{KeyBuilder, Scope};
use crate::traits::{RemoteCache, ValueCodec};
use crate::value::CacheValue;

/// Outcome of rotating one scope's generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// The new generation was written to the remote store
    RotatedAndPersisted(i64),
    /// The remote write failed; only this unit of work sees the new generation
    RotatedLocallyOnly(i64),
}

impl Rotation {
    pub fn generation(self) -> i64 {
        match self {
            Self::RotatedAndPersisted(generation) | Self::RotatedLocallyOnly(generation) => {
                generation
            }
        }
    }

    pub fn is_persisted(self) -> bool {
        matches!(self, Self::RotatedAndPersisted(_))
    }
}

/// Per-scope generation counters with a unit-of-work memo
pub struct FlushGenerationStore {
    remote: Arc<dyn RemoteCache>,
    codec: Arc<dyn ValueCodec>,
    keys: KeyBuilder,
    memo: HashMap<Scope, i64>,
}

impl FlushGenerationStore {
    pub fn new(remote: Arc<dyn RemoteCache>, codec: Arc<dyn ValueCodec>, keys: KeyBuilder) -> Self {
        Self {
            remote,
            codec,
            keys,
            memo: HashMap::new(),
        }
    }

    /// Current generation of `scope`
    ///
    /// Reads the remote store once per unit of work. A cold store is
    /// seeded with the current time in microseconds, so entries written
    /// under an assumed generation of 0 never become reachable.
    pub async fn current(&mut self, scope: Scope) -> i64 {
        if let Some(generation) = self.memo.get(&scope) {
            return *generation;
        }

        let key = self.keys.flush_number_key(scope);
        let generation = match self.read(&key).await {
            Some(generation) => generation,
            None => self.initialize(scope, &key).await,
        };

        self.memo.insert(scope, generation);
        generation
    }

    /// Move `scope` to a new generation, distinct from every earlier one
    pub async fn rotate(&mut self, scope: Scope) -> Rotation {
        let current = self.current(scope).await;
        let next = now_micros().max(current.saturating_add(1));
        self.memo.insert(scope, next);

        let key = self.keys.flush_number_key(scope);
        match self.write(&key, next).await {
            Ok(true) => {
                info!(scope = %scope, generation = next, "Rotated flush generation");
                Rotation::RotatedAndPersisted(next)
            }
            Ok(false) => {
                warn!(scope = %scope, generation = next, "Flush generation not stored; rotation is local to this unit of work");
                Rotation::RotatedLocallyOnly(next)
            }
            Err(e) => {
                warn!(scope = %scope, generation = next, error = %e, "Failed to persist flush generation; rotation is local to this unit of work");
                Rotation::RotatedLocallyOnly(next)
            }
        }
    }

    /// Forget memoized generations so the next lookup re-reads the remote store
    pub fn forget(&mut self) {
        self.memo.clear();
    }

    /// Memoized generation of `scope`, without touching the remote store
    pub fn memoized(&self, scope: Scope) -> Option<i64> {
        self.memo.get(&scope).copied()
    }

    async fn read(&self, key: &str) -> Option<i64> {
        match self.remote.get(key).await {
            Ok(Some(bytes)) => match codecs::decode(self.codec.as_ref(), &bytes) {
                Ok(CacheValue::Int(generation)) => Some(generation),
                Ok(other) => {
                    warn!(key = %key, kind = other.kind(), "Flush generation is not an integer; reseeding");
                    None
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Undecodable flush generation; reseeding");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read flush generation");
                None
            }
        }
    }

    async fn initialize(&self, scope: Scope, key: &str) -> i64 {
        let seeded = now_micros();
        let bytes = match codecs::encode(self.codec.as_ref(), &CacheValue::Int(seeded)) {
            Ok(bytes) => bytes,
            Err(_) => return seeded,
        };

        match self.remote.add(key, &bytes, None).await {
            Ok(true) => {
                debug!(scope = %scope, generation = seeded, "Seeded flush generation");
                seeded
            }
            // Another unit of work seeded it first; use theirs.
            Ok(false) => self.read(key).await.unwrap_or(seeded),
            Err(e) => {
                warn!(scope = %scope, error = %e, "Failed to seed flush generation");
                seeded
            }
        }
    }

    async fn write(&self, key: &str, generation: i64) -> anyhow::Result<bool> {
        let bytes = codecs::encode(self.codec.as_ref(), &CacheValue::Int(generation))?;
        self.remote.set(key, &bytes, None).await
    }
}

/// Wall-clock microseconds since the unix epoch
fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)
        })
}

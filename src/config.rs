//! Object Cache Configuration

use std::time::Duration;

use crate::error::ConfigError;

/// Memcached's hard limit on key length
pub const MEMCACHED_MAX_KEY_LENGTH: usize = 250;

/// Keys fetched per remote multi-get round trip
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Memcached treats relative expirations above 30 days as unix timestamps
pub const MAX_RELATIVE_EXPIRATION: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Shortest `max_key_length` that still fits a salted sha256 fallback key
const MIN_KEY_LENGTH: usize = 7 + 64;

/// Configuration shared by every unit of work created from one
/// [`ObjectCacheSystem`](crate::ObjectCacheSystem)
#[derive(Debug, Clone)]
pub struct ObjectCacheConfig {
    /// Prefix applied to every physical key, followed by `:` (appended when
    /// missing). Lets several installs share one store
    pub key_salt: String,
    /// Tenant scope a new unit of work starts in
    pub blog_id: u64,
    /// Maximum number of keys per remote multi-get
    pub batch_size: usize,
    /// Longest physical key sent to the remote store
    pub max_key_length: usize,
    /// Expiration applied when the caller passes none
    pub default_expiration: Option<Duration>,
    /// Upper bound for any expiration sent to the remote store
    pub max_expiration: Duration,
    /// Groups shared across tenants
    pub global_groups: Vec<String>,
    /// Groups that never leave the local tier
    pub non_persistent_groups: Vec<String>,
}

impl Default for ObjectCacheConfig {
    fn default() -> Self {
        Self {
            key_salt: String::new(),
            blog_id: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            max_key_length: MEMCACHED_MAX_KEY_LENGTH,
            default_expiration: None,
            max_expiration: MAX_RELATIVE_EXPIRATION,
            global_groups: Vec::new(),
            non_persistent_groups: Vec::new(),
        }
    }
}

impl ObjectCacheConfig {
    /// Build a configuration from environment variables, falling back to defaults
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `OBJECT_CACHE_KEY_SALT` | `key_salt` |
    /// | `OBJECT_CACHE_BLOG_ID` | `blog_id` |
    /// | `OBJECT_CACHE_BATCH_SIZE` | `batch_size` |
    /// | `OBJECT_CACHE_DEFAULT_EXPIRATION` | `default_expiration` (seconds, 0 = none) |
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(salt) = std::env::var("OBJECT_CACHE_KEY_SALT") {
            config.key_salt = salt;
        }
        if let Some(blog_id) = parse_var("OBJECT_CACHE_BLOG_ID")? {
            config.blog_id = blog_id;
        }
        if let Some(batch_size) = parse_var("OBJECT_CACHE_BATCH_SIZE")? {
            config.batch_size = batch_size;
        }
        if let Some(secs) = parse_var::<u64>("OBJECT_CACHE_DEFAULT_EXPIRATION")? {
            config.default_expiration = (secs > 0).then(|| Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the crate relies on
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size or a key length too short
    /// to hold a hashed key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_key_length < MIN_KEY_LENGTH {
            return Err(ConfigError::KeyLengthTooShort(self.max_key_length));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
        Err(_) => Ok(None),
    }
}

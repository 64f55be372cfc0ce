//! Physical Key Construction
//!
//! Turns a logical `(key, group)` pair into the string sent to the remote
//! store:
//!
//! ```text
//! {salt}{scope}:{generation}:{group}:{key}
//! {salt}{scope}:{group}:flush_number          (bookkeeping keys)
//! {salt}sha256:{hex}                          (anything longer than the limit)
//! ```
//!
//! `scope` is `global` or the decimal tenant id. Group and key are
//! percent-encoded, so they can never contain the `:` separator, whitespace
//! or control bytes.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::groups::{FLUSH_GROUP, GLOBAL_FLUSH_GROUP};

/// Bytes escaped in group names and logical keys
const KEY_COMPONENT: &AsciiSet = &CONTROLS.add(b' ').add(b':').add(b'%');

/// Logical key under which each scope's flush generation is stored
pub const FLUSH_NUMBER_KEY: &str = "flush_number";

const HASHED_PREFIX: &str = "sha256:";

/// Which flush generation a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Shared by every tenant
    Global,
    /// One tenant (blog)
    Blog(u64),
}

impl Scope {
    /// Reserved group holding this scope's flush generation
    pub fn flush_group(self) -> &'static str {
        match self {
            Self::Global => GLOBAL_FLUSH_GROUP,
            Self::Blog(_) => FLUSH_GROUP,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Blog(id) => write!(f, "{id}"),
        }
    }
}

/// Pure physical-key builder
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    salt: String,
    max_len: usize,
}

impl KeyBuilder {
    /// A non-empty salt always ends in `:`, so `x1` + blog 2 and
    /// `x` + blog 12 cannot produce the same prefix.
    pub fn new(salt: impl Into<String>, max_len: usize) -> Self {
        let mut salt = salt.into();
        if !salt.is_empty() && !salt.ends_with(':') {
            salt.push(':');
        }
        Self { salt, max_len }
    }

    /// Key for a generation-scoped entry
    pub fn build(&self, scope: Scope, generation: i64, group: &str, key: &str) -> String {
        self.finish(format!(
            "{}{scope}:{generation}:{}:{}",
            self.salt,
            utf8_percent_encode(group, KEY_COMPONENT),
            utf8_percent_encode(key, KEY_COMPONENT),
        ))
    }

    /// Key for an entry in an exempt group, which carries no generation
    pub fn build_fixed(&self, scope: Scope, group: &str, key: &str) -> String {
        self.finish(format!(
            "{}{scope}:{}:{}",
            self.salt,
            utf8_percent_encode(group, KEY_COMPONENT),
            utf8_percent_encode(key, KEY_COMPONENT),
        ))
    }

    /// Key under which `scope`'s flush generation lives
    pub fn flush_number_key(&self, scope: Scope) -> String {
        self.build_fixed(scope, scope.flush_group(), FLUSH_NUMBER_KEY)
    }

    /// Replace overlong keys with a digest of the whole key
    fn finish(&self, key: String) -> String {
        if key.len() <= self.max_len {
            return key;
        }
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        let salted = format!("{}{HASHED_PREFIX}{digest}", self.salt);
        if salted.len() <= self.max_len {
            salted
        } else {
            // The salt is part of the digest input, so dropping it keeps
            // installs apart.
            format!("{HASHED_PREFIX}{digest}")
        }
    }
}

//! Group Policy
//!
//! Classifies cache groups as global (shared across tenants),
//! non-persistent (local tier only), or the default persistent,
//! tenant-scoped kind.

use std::collections::HashSet;

/// Group used when the caller passes an empty group name
pub const DEFAULT_GROUP: &str = "default";

/// Reserved group holding each tenant's flush generation
pub const FLUSH_GROUP: &str = "object_cache_flush";

/// Reserved global group holding the global flush generation
pub const GLOBAL_FLUSH_GROUP: &str = "object_cache_flush_global";

/// Global and non-persistent group registries for one unit of work
///
/// Registration is additive and idempotent; there is no removal. A group
/// may be both global and non-persistent.
#[derive(Debug, Clone)]
pub struct GroupPolicy {
    global: HashSet<String>,
    non_persistent: HashSet<String>,
}

impl GroupPolicy {
    /// Create a policy with only the reserved global bookkeeping group registered
    pub fn new() -> Self {
        let mut global = HashSet::new();
        global.insert(GLOBAL_FLUSH_GROUP.to_owned());
        Self {
            global,
            non_persistent: HashSet::new(),
        }
    }

    /// Register global groups
    ///
    /// Pass a single name as `["name"]`.
    pub fn add_global<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global.extend(groups.into_iter().map(Into::into));
    }

    /// Register non-persistent groups
    pub fn add_non_persistent<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_persistent
            .extend(groups.into_iter().map(Into::into));
    }

    pub fn is_global(&self, group: &str) -> bool {
        self.global.contains(group)
    }

    pub fn is_non_persistent(&self, group: &str) -> bool {
        self.non_persistent.contains(group)
    }

    /// Whether values in this group are mirrored to the remote store
    pub fn is_persistent(&self, group: &str) -> bool {
        !self.is_non_persistent(group)
    }

    /// Bookkeeping groups skip generation prefixing and are never flushed
    pub fn is_exempt(group: &str) -> bool {
        group == FLUSH_GROUP || group == GLOBAL_FLUSH_GROUP
    }

    /// Map an empty group name to [`DEFAULT_GROUP`]
    pub fn normalize(group: &str) -> &str {
        if group.is_empty() { DEFAULT_GROUP } else { group }
    }

    pub fn global_groups(&self) -> impl Iterator<Item = &str> {
        self.global.iter().map(String::as_str)
    }

    pub fn non_persistent_groups(&self) -> impl Iterator<Item = &str> {
        self.non_persistent.iter().map(String::as_str)
    }
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self::new()
    }
}

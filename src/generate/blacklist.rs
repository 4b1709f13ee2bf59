//! Per-dataset bookkeeping of string prefixes already used in predicates.
//!
//! Once a prefix family has been chosen for a path, later queries against
//! the same (derived) dataset must not reselect it. Sorted containers keep
//! iteration order independent of insertion history.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blacklist {
    ignored_prefixes: BTreeMap<String, BTreeSet<String>>,
}

impl Blacklist {
    /// Whether `prefix` (or any extension of it) was already used at `path`.
    pub fn is_blacklisted(&self, path: &str, prefix: &str) -> bool {
        self.ignored_prefixes
            .get(path)
            .is_some_and(|used| used.iter().any(|p| p.starts_with(prefix)))
    }

    /// Records `prefix` as used at `path`.
    pub fn add(&mut self, path: &str, prefix: &str) {
        self.ignored_prefixes
            .entry(path.to_string())
            .or_default()
            .insert(prefix.to_string());
    }

    /// Prefixes recorded for a path, in sorted order.
    pub fn prefixes(&self, path: &str) -> impl Iterator<Item = &str> {
        self.ignored_prefixes
            .get(path)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_prefixes_of_recorded_entries() {
        let mut blacklist = Blacklist::default();
        blacklist.add("/name", "abc");
        // "ab" matches because the recorded "abc" extends it.
        assert!(blacklist.is_blacklisted("/name", "ab"));
        assert!(blacklist.is_blacklisted("/name", "abc"));
        // Longer or diverging candidates stay allowed.
        assert!(!blacklist.is_blacklisted("/name", "abcd"));
        assert!(!blacklist.is_blacklisted("/name", "x"));
        assert!(!blacklist.is_blacklisted("/other", "ab"));
    }
}

//! Local store: this node's share of the keyspace, in memory only.

use crate::version::Versioned;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Key → versioned value map scoped to one node.
///
/// Entries are locked per shard by `DashMap`; no method hands out a guard,
/// so callers can hold results across `.await`.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: DashMap<String, Versioned>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().value.clone())
    }

    pub fn get_versioned(&self, key: &str) -> Option<Versioned> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores `entry` unless the stored copy supersedes it. Returns whether
    /// the store changed.
    pub fn put(&self, key: impl Into<String>, entry: Versioned) -> bool {
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut stored) => {
                if entry.supersedes(stored.get()) {
                    stored.insert(entry);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn delete(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Removes `key` only while it still holds `expected`. A write that
    /// landed after `expected` was read keeps its value.
    pub fn remove_if_unchanged(&self, key: &str, expected: &Versioned) -> bool {
        self.entries
            .remove_if(key, |_, current| current == expected)
            .is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of every value, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    /// Owned copy of every entry with its version.
    pub fn entries(&self) -> Vec<(String, Versioned)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

//! Tag Index Module
//!
//! Secondary index mapping tags to key sets for bulk invalidation.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

// == Tag Index ==
/// Mapping from tag to the set of keys carrying it.
///
/// The index is a deletion hint, not a liveness record: keys stay listed
/// after they expire or are deleted through other paths, and such stale
/// references simply make the eventual invalidation a no-op for them. The
/// one exclusive lock is held only for map work, never while store
/// deletions run.
#[derive(Debug, Default)]
pub struct TagIndex {
    index: RwLock<HashMap<String, HashSet<String>>>,
}

impl TagIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Add ==
    /// Adds `key` to each tag's key set, creating tags as needed.
    ///
    /// # Arguments
    /// * `key` - The key to associate
    /// * `tags` - Tags to associate it with; an empty slice is a no-op
    pub fn add(&self, key: &str, tags: &[&str]) {
        if tags.is_empty() {
            return;
        }
        let mut index = self.index.write();
        for tag in tags {
            index
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    // == Take ==
    /// Removes each named tag from the index and returns the union of
    /// their key sets. Unknown tags contribute nothing.
    pub fn take(&self, tags: &[&str]) -> HashSet<String> {
        let mut keys = HashSet::new();
        let mut index = self.index.write();
        for tag in tags {
            if let Some(tagged) = index.remove(*tag) {
                keys.extend(tagged);
            }
        }
        keys
    }

    // == Clear ==
    /// Drops every tag association.
    pub fn clear(&self) {
        self.index.write().clear();
    }

    // == Len ==
    /// Number of tags currently indexed.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Returns true when no tags are indexed.
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

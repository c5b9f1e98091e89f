//! Reverse index from tag to document paths.
//!
//! The index is a cache derived from the Docs collection. It can be rebuilt at
//! any time from the doc records and is never consulted without re-checking
//! the records it points at.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct TagIndex {
    paths_by_tag: RwLock<HashMap<String, HashSet<String>>>,
}

impl TagIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole index with the given `(path, tags)` pairs.
    pub fn rebuild<'a, I>(&self, docs: I)
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
    {
        let mut fresh: HashMap<String, HashSet<String>> = HashMap::new();
        for (path, tags) in docs {
            for tag in tags {
                fresh
                    .entry(tag.clone())
                    .or_default()
                    .insert(path.to_string());
            }
        }
        *self.write() = fresh;
    }

    /// Records that `path` moved from `old` tags to `new` tags.
    pub fn update(&self, path: &str, old: &BTreeSet<String>, new: &BTreeSet<String>) {
        let mut index = self.write();
        for tag in old.difference(new) {
            if let Some(paths) = index.get_mut(tag) {
                paths.remove(path);
                if paths.is_empty() {
                    index.remove(tag);
                }
            }
        }
        for tag in new {
            index
                .entry(tag.clone())
                .or_default()
                .insert(path.to_string());
        }
    }

    pub fn remove(&self, path: &str, tags: &BTreeSet<String>) {
        self.update(path, tags, &BTreeSet::new());
    }

    /// Paths carrying every tag in `tags`.
    ///
    /// Returns `None` when `tags` is empty, meaning no tag constraint applies.
    /// Runs one lookup per tag and intersects from the smallest set outward.
    #[must_use]
    pub fn candidates(&self, tags: &[String]) -> Option<HashSet<String>> {
        if tags.is_empty() {
            return None;
        }

        let index = self.read();
        let mut sets: Vec<&HashSet<String>> = Vec::with_capacity(tags.len());
        for tag in tags {
            match index.get(tag) {
                Some(paths) => sets.push(paths),
                None => return Some(HashSet::new()),
            }
        }
        sets.sort_by_key(|s| s.len());

        let (smallest, rest) = sets.split_first()?;
        Some(
            smallest
                .iter()
                .filter(|path| rest.iter().all(|set| set.contains(*path)))
                .cloned()
                .collect(),
        )
    }

    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, HashSet<String>>> {
        self.paths_by_tag.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, HashSet<String>>> {
        self.paths_by_tag.write().unwrap_or_else(|e| e.into_inner())
    }
}

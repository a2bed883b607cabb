//! In-process backend used for ephemeral stores and tests

use super::{BatchOp, KvBackend, PersistenceResult, WriteBatch};
use std::collections::{BTreeMap, BTreeSet};

/// Backend that keeps the keyspace in ordered maps
///
/// Map operations cannot fail halfway, so every batch is trivially atomic.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    sets: BTreeMap<String, BTreeSet<String>>,
    hashes: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty hashes (used to check nothing dangles)
    pub fn hash_count(&self) -> usize {
        self.hashes.len()
    }

    fn apply_op(&mut self, op: BatchOp) {
        match op {
            BatchOp::SetAdd { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
            BatchOp::SetRemove { key, member } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove(&member);
                    if set.is_empty() {
                        self.sets.remove(&key);
                    }
                }
            }
            BatchOp::HashSet { key, field, value } => {
                self.hashes.entry(key).or_default().insert(field, value);
            }
            BatchOp::HashDelete { key, field } => {
                if let Some(hash) = self.hashes.get_mut(&key) {
                    hash.remove(&field);
                    if hash.is_empty() {
                        self.hashes.remove(&key);
                    }
                }
            }
            BatchOp::HashClear { key } => {
                self.hashes.remove(&key);
            }
        }
    }
}

impl KvBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn set_members(&self, key: &str) -> PersistenceResult<Vec<String>> {
        Ok(self
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn hash_get_all(&self, key: &str) -> PersistenceResult<BTreeMap<String, String>> {
        Ok(self.hashes.get(key).cloned().unwrap_or_default())
    }

    fn apply(&mut self, batch: WriteBatch) -> PersistenceResult<()> {
        for op in batch {
            self.apply_op(op);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_primitives() {
        let mut backend = MemoryBackend::new();
        backend.set_add("locs", "B").unwrap();
        backend.set_add("locs", "A").unwrap();
        backend.set_add("locs", "A").unwrap();

        assert_eq!(backend.set_members("locs").unwrap(), vec!["A", "B"]);

        backend.set_remove("locs", "A").unwrap();
        backend.set_remove("locs", "missing").unwrap();
        assert_eq!(backend.set_members("locs").unwrap(), vec!["B"]);
        assert!(backend.set_members("other").unwrap().is_empty());
    }

    #[test]
    fn test_hash_primitives() {
        let mut backend = MemoryBackend::new();
        backend.hash_set("A", "B", "1").unwrap();
        backend.hash_set("A", "C", "4").unwrap();
        backend.hash_set("A", "B", "2").unwrap();

        let all = backend.hash_get_all("A").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["B"], "2");

        backend.hash_delete("A", "B").unwrap();
        backend.hash_delete("A", "C").unwrap();
        assert!(backend.hash_get_all("A").unwrap().is_empty());
        assert_eq!(backend.hash_count(), 0);
    }

    #[test]
    fn test_hash_clear() {
        let mut backend = MemoryBackend::new();
        let mut batch = WriteBatch::new();
        batch.hash_set("A", "B", "1").hash_set("A", "C", "2").hash_clear("A");
        backend.apply(batch).unwrap();

        assert!(backend.hash_get_all("A").unwrap().is_empty());
    }
}

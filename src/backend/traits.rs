//! Backend trait shared by the on-disk and in-memory stores

use super::{PersistenceResult, WriteBatch};
use std::collections::BTreeMap;

/// Set + hash key-value primitives the graph store persists through
///
/// Writes go through [`KvBackend::apply`], which must commit the whole batch
/// or none of it. The single-operation helpers are one-element batches.
pub trait KvBackend: Send {
    /// Name of this backend (for logging)
    fn name(&self) -> &str;

    /// All members of a set (empty if the set does not exist)
    fn set_members(&self, key: &str) -> PersistenceResult<Vec<String>>;

    /// All field/value pairs of a hash (empty if the hash does not exist)
    fn hash_get_all(&self, key: &str) -> PersistenceResult<BTreeMap<String, String>>;

    /// Atomically apply a batch of writes, in order
    fn apply(&mut self, batch: WriteBatch) -> PersistenceResult<()>;

    fn set_add(&mut self, key: &str, member: &str) -> PersistenceResult<()> {
        let mut batch = WriteBatch::new();
        batch.set_add(key, member);
        self.apply(batch)
    }

    fn set_remove(&mut self, key: &str, member: &str) -> PersistenceResult<()> {
        let mut batch = WriteBatch::new();
        batch.set_remove(key, member);
        self.apply(batch)
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &str) -> PersistenceResult<()> {
        let mut batch = WriteBatch::new();
        batch.hash_set(key, field, value);
        self.apply(batch)
    }

    fn hash_delete(&mut self, key: &str, field: &str) -> PersistenceResult<()> {
        let mut batch = WriteBatch::new();
        batch.hash_delete(key, field);
        self.apply(batch)
    }
}

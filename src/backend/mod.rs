//! Key-value persistence for the route graph
//!
//! The store only needs two shapes of data: a set of strings (every known
//! location) and one string hash per location (destination -> weight).
//! Backends expose those primitives and apply writes in atomic batches.

mod memory;
mod redb_store;
mod traits;

pub use memory::MemoryBackend;
pub use redb_store::RedbBackend;
pub use traits::KvBackend;

use thiserror::Error;

/// Errors raised by a persistence backend
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt entry in '{key}' field '{field}': {reason}")]
    Corrupt {
        key: String,
        field: String,
        reason: String,
    },

    /// The backend can't be reached at all. Neither built-in backend raises
    /// it; it is for custom backends (remote stores, test doubles) to report
    /// an outage without a redb or IO error to wrap.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

// redb reports failures through several error types; funnel them all into
// redb::Error so backend code can use `?` directly.
macro_rules! redb_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PersistenceError {
                fn from(e: $ty) -> Self {
                    PersistenceError::Redb(e.into())
                }
            }
        )*
    };
}

redb_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A single write against the keyspace
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    SetAdd { key: String, member: String },
    SetRemove { key: String, member: String },
    HashSet { key: String, field: String, value: String },
    HashDelete { key: String, field: String },
    /// Drop every field of a hash
    HashClear { key: String },
}

/// Ordered list of writes committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_add(&mut self, key: &str, member: &str) -> &mut Self {
        self.ops.push(BatchOp::SetAdd {
            key: key.to_string(),
            member: member.to_string(),
        });
        self
    }

    pub fn set_remove(&mut self, key: &str, member: &str) -> &mut Self {
        self.ops.push(BatchOp::SetRemove {
            key: key.to_string(),
            member: member.to_string(),
        });
        self
    }

    pub fn hash_set(&mut self, key: &str, field: &str, value: &str) -> &mut Self {
        self.ops.push(BatchOp::HashSet {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn hash_delete(&mut self, key: &str, field: &str) -> &mut Self {
        self.ops.push(BatchOp::HashDelete {
            key: key.to_string(),
            field: field.to_string(),
        });
        self
    }

    pub fn hash_clear(&mut self, key: &str) -> &mut Self {
        self.ops.push(BatchOp::HashClear {
            key: key.to_string(),
        });
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        let mut batch = WriteBatch::new();
        batch
            .set_add("locs", "A")
            .hash_set("A", "B", "1")
            .hash_delete("A", "C");

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.ops()[0],
            BatchOp::SetAdd {
                key: "locs".into(),
                member: "A".into()
            }
        );
        assert!(matches!(batch.ops()[2], BatchOp::HashDelete { .. }));
    }

    #[test]
    fn test_corrupt_error_message_names_entry() {
        let err = PersistenceError::Corrupt {
            key: "A".into(),
            field: "B".into(),
            reason: "not a number".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'A'"));
        assert!(msg.contains("'B'"));
    }
}

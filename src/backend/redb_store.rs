//! On-disk backend using redb (ACID, single file)

use super::{BatchOp, KvBackend, PersistenceResult, WriteBatch};
use redb::{
    Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// redb table definitions
const SETS_TABLE: MultimapTableDefinition<&str, &str> = MultimapTableDefinition::new("sets");
const HASHES_TABLE: TableDefinition<(&str, &str), &str> = TableDefinition::new("hashes");

/// Keyspace stored in a redb database file
///
/// Sets live in a multimap table (set key -> member). Hashes live in a
/// table keyed by `(hash key, field)`, so one hash is a contiguous key range.
pub struct RedbBackend {
    db: Database,
    path: PathBuf,
}

impl RedbBackend {
    /// Create or open the database file at `path`
    pub fn open(path: &Path) -> PersistenceResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        // Make sure both tables exist so reads on a fresh file don't fail
        let write_txn = db.begin_write()?;
        {
            write_txn.open_multimap_table(SETS_TABLE)?;
            write_txn.open_table(HASHES_TABLE)?;
        }
        write_txn.commit()?;

        debug!("Opened redb backend at {}", path.display());

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }
}

impl KvBackend for RedbBackend {
    fn name(&self) -> &str {
        "redb"
    }

    fn set_members(&self, key: &str) -> PersistenceResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_multimap_table(SETS_TABLE)?;

        let mut members = Vec::new();
        for item in table.get(key)? {
            members.push(item?.value().to_string());
        }
        Ok(members)
    }

    fn hash_get_all(&self, key: &str) -> PersistenceResult<BTreeMap<String, String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HASHES_TABLE)?;

        let mut fields = BTreeMap::new();
        for item in table.range((key, "")..)? {
            let (k, v) = item?;
            let (hash_key, field) = k.value();
            if hash_key != key {
                break;
            }
            fields.insert(field.to_string(), v.value().to_string());
        }
        Ok(fields)
    }

    fn apply(&mut self, batch: WriteBatch) -> PersistenceResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let op_count = batch.len();

        // An early return drops the transaction uncommitted, which aborts it
        let write_txn = self.db.begin_write()?;
        {
            let mut sets = write_txn.open_multimap_table(SETS_TABLE)?;
            let mut hashes = write_txn.open_table(HASHES_TABLE)?;

            for op in batch {
                match op {
                    BatchOp::SetAdd { key, member } => {
                        sets.insert(key.as_str(), member.as_str())?;
                    }
                    BatchOp::SetRemove { key, member } => {
                        sets.remove(key.as_str(), member.as_str())?;
                    }
                    BatchOp::HashSet { key, field, value } => {
                        hashes.insert((key.as_str(), field.as_str()), value.as_str())?;
                    }
                    BatchOp::HashDelete { key, field } => {
                        hashes.remove((key.as_str(), field.as_str()))?;
                    }
                    BatchOp::HashClear { key } => {
                        let mut fields = Vec::new();
                        for item in hashes.range((key.as_str(), "")..)? {
                            let (k, _) = item?;
                            let (hash_key, field) = k.value();
                            if hash_key != key {
                                break;
                            }
                            fields.push(field.to_string());
                        }
                        for field in &fields {
                            hashes.remove((key.as_str(), field.as_str()))?;
                        }
                    }
                }
            }
        }
        write_txn.commit()?;

        debug!("Committed {} write(s) to {}", op_count, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sets_and_hashes_survive_reopen() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("kv.redb");

        {
            let mut backend = RedbBackend::open(&path).expect("open backend");
            let mut batch = WriteBatch::new();
            batch
                .set_add("locs", "A")
                .set_add("locs", "B")
                .hash_set("A", "B", "1.5")
                .hash_set("AB", "x", "9");
            backend.apply(batch).expect("apply batch");
        }

        let backend = RedbBackend::open(&path).expect("reopen backend");
        assert_eq!(backend.set_members("locs").unwrap(), vec!["A", "B"]);

        // "AB" sorts right after "A" and must not leak into A's hash
        let a = backend.hash_get_all("A").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a["B"], "1.5");
    }

    #[test]
    fn test_missing_keys_read_empty() {
        let dir = tempdir().expect("create temp dir");
        let backend = RedbBackend::open(&dir.path().join("kv.redb")).expect("open backend");

        assert!(backend.set_members("nothing").unwrap().is_empty());
        assert!(backend.hash_get_all("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempdir().expect("create temp dir");
        let mut backend = RedbBackend::open(&dir.path().join("kv.redb")).expect("open backend");

        let mut batch = WriteBatch::new();
        batch
            .set_add("locs", "A")
            .hash_set("A", "B", "1")
            .hash_set("A", "C", "2")
            .hash_set("B", "A", "3");
        backend.apply(batch).unwrap();

        backend.set_remove("locs", "A").unwrap();
        backend.hash_delete("B", "A").unwrap();
        let mut clear = WriteBatch::new();
        clear.hash_clear("A");
        backend.apply(clear).unwrap();

        assert!(backend.set_members("locs").unwrap().is_empty());
        assert!(backend.hash_get_all("A").unwrap().is_empty());
        assert!(backend.hash_get_all("B").unwrap().is_empty());
    }
}

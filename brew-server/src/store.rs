//! redb-backed document store
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `products` | external product id | JSON `Product` |
//! | `collections` | external collection id | JSON `Collection` |
//! | `orders` | `ord_<snowflake>` | JSON `Order` |
//! | `admins` | username | JSON `Admin` |
//!
//! redb serializes write transactions, so a read-check-write performed in
//! [`DocumentStore::update`] is atomic with respect to every other writer.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Document table: key = business identifier, value = JSON document
pub type Table = TableDefinition<'static, &'static str, &'static [u8]>;

pub const PRODUCTS: Table = TableDefinition::new("products");
pub const COLLECTIONS: Table = TableDefinition::new("collections");
pub const ORDERS: Table = TableDefinition::new("orders");
pub const ADMINS: Table = TableDefinition::new("admins");

const ALL_TABLES: [Table; 4] = [PRODUCTS, COLLECTIONS, ORDERS, ADMINS];

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an [`DocumentStore::update`] closure
pub enum Write<T, R> {
    /// Persist the document and return `R`
    Put(T, R),
    /// Leave the stored document untouched and return `R`
    Skip(R),
}

/// JSON document store backed by redb
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Database>,
}

impl DocumentStore {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: data is persistent as soon
    /// as `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and ephemeral runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            for table in ALL_TABLES {
                let _ = write_txn.open_table(table)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Fetch one document by key
    pub fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let doc = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(doc)
    }

    /// All documents in key order
    pub fn list<T: DeserializeOwned>(&self, table: Table) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut docs = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            docs.push(serde_json::from_slice(value.value())?);
        }
        Ok(docs)
    }

    /// First document matching `pred`, scanning in key order
    pub fn find_where<T, F>(&self, table: Table, pred: F) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        for result in table.iter()? {
            let (_key, value) = result?;
            let doc: T = serde_json::from_slice(value.value())?;
            if pred(&doc) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    pub fn count(&self, table: Table) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.len()?)
    }

    /// Insert a document under a key that must not exist yet
    pub fn insert_new<T: Serialize>(&self, table: Table, key: &str, doc: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table)?;
            if table.get(key)?.is_some() {
                drop(table);
                write_txn.abort()?;
                return Err(StoreError::AlreadyExists(key.to_string()));
            }
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Insert or overwrite a document
    pub fn put<T: Serialize>(&self, table: Table, key: &str, doc: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table)?;
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read-check-write of one document inside a single write transaction.
    ///
    /// `f` sees the current document (if any) and decides whether to write.
    /// When `f` fails or returns [`Write::Skip`] nothing is committed.
    pub fn update<T, R, E, F>(&self, table: Table, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(Option<T>) -> Result<Write<T, R>, E>,
    {
        let write_txn = self.db.begin_write().map_err(StoreError::from)?;
        let decision = {
            let mut handle = write_txn.open_table(table).map_err(StoreError::from)?;
            let current: Option<T> = match handle.get(key).map_err(StoreError::from)? {
                Some(value) => {
                    Some(serde_json::from_slice(value.value()).map_err(StoreError::from)?)
                }
                None => None,
            };

            match f(current) {
                Ok(Write::Put(doc, result)) => {
                    let bytes = serde_json::to_vec(&doc).map_err(StoreError::from)?;
                    handle
                        .insert(key, bytes.as_slice())
                        .map_err(StoreError::from)?;
                    Ok((true, result))
                }
                Ok(Write::Skip(result)) => Ok((false, result)),
                Err(e) => Err(e),
            }
        };

        match decision {
            Ok((true, result)) => {
                write_txn.commit().map_err(StoreError::from)?;
                Ok(result)
            }
            Ok((false, result)) => {
                write_txn.abort().map_err(StoreError::from)?;
                Ok(result)
            }
            Err(e) => {
                write_txn.abort().map_err(StoreError::from)?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: String,
        n: u32,
    }

    fn doc(id: &str, n: u32) -> Doc {
        Doc {
            id: id.to_string(),
            n,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert_new(ORDERS, "a", &doc("a", 1)).unwrap();

        let loaded: Option<Doc> = store.get(ORDERS, "a").unwrap();
        assert_eq!(loaded, Some(doc("a", 1)));
        let missing: Option<Doc> = store.get(ORDERS, "b").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_insert_new_rejects_duplicate_key() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert_new(ORDERS, "a", &doc("a", 1)).unwrap();

        let err = store.insert_new(ORDERS, "a", &doc("a", 2)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref k) if k == "a"));
        let loaded: Doc = store.get(ORDERS, "a").unwrap().unwrap();
        assert_eq!(loaded.n, 1);
    }

    #[test]
    fn test_update_put_and_skip() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(PRODUCTS, "p", &doc("p", 1)).unwrap();

        let n = store
            .update::<Doc, u32, StoreError, _>(PRODUCTS, "p", |cur| {
                let mut d = cur.unwrap();
                d.n += 1;
                let n = d.n;
                Ok(Write::Put(d, n))
            })
            .unwrap();
        assert_eq!(n, 2);

        store
            .update::<Doc, (), StoreError, _>(PRODUCTS, "p", |_| Ok(Write::Skip(())))
            .unwrap();
        let loaded: Doc = store.get(PRODUCTS, "p").unwrap().unwrap();
        assert_eq!(loaded.n, 2);
    }

    #[test]
    fn test_update_error_leaves_document() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(PRODUCTS, "p", &doc("p", 1)).unwrap();

        #[derive(Debug)]
        struct Rejected;
        impl From<StoreError> for Rejected {
            fn from(_: StoreError) -> Self {
                Rejected
            }
        }

        let result = store.update::<Doc, (), Rejected, _>(PRODUCTS, "p", |_| Err(Rejected));
        assert!(result.is_err());
        let loaded: Doc = store.get(PRODUCTS, "p").unwrap().unwrap();
        assert_eq!(loaded.n, 1);
    }

    #[test]
    fn test_list_find_and_count() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.put(COLLECTIONS, "b", &doc("b", 2)).unwrap();
        store.put(COLLECTIONS, "a", &doc("a", 1)).unwrap();

        let all: Vec<Doc> = store.list(COLLECTIONS).unwrap();
        assert_eq!(all, vec![doc("a", 1), doc("b", 2)]);
        assert_eq!(store.count(COLLECTIONS).unwrap(), 2);

        let found: Option<Doc> = store.find_where(COLLECTIONS, |d: &Doc| d.n == 2).unwrap();
        assert_eq!(found.map(|d| d.id), Some("b".to_string()));
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("brew.redb");
        {
            let store = DocumentStore::open(&path).unwrap();
            store.put(ADMINS, "root", &doc("root", 7)).unwrap();
        }
        let store = DocumentStore::open(&path).unwrap();
        let loaded: Option<Doc> = store.get(ADMINS, "root").unwrap();
        assert_eq!(loaded, Some(doc("root", 7)));
    }
}

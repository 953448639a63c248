use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;

/// Minimal `table_id -> DbFile` registry. The storage/transaction core
/// only ever needs to resolve a `PageId`'s table id to the file that
/// owns it; query/SQL-facing name and primary-key lookups live elsewhere.
pub struct Catalog {
    tables: RwLock<HashMap<i32, Arc<HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, table: Arc<HeapFile>) {
        self.tables.write().unwrap().insert(table.table_id(), table);
    }

    pub fn table(&self, table_id: i32) -> DbResult<Arc<HeapFile>> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchElement(format!("unknown table id {}", table_id)))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

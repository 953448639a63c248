use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Addresses a single fixed-size page within a table file.
///
/// Value type: equality and hashing are by components, matching the data
/// model's requirement that two `PageId`s referring to the same page
/// compare equal regardless of when or where they were constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: i32,
    pub page_no: usize,
}

impl PageId {
    pub fn new(table_id: i32, page_no: usize) -> Self {
        Self { table_id, page_no }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "page({}, {})", self.table_id, self.page_no)
    }
}

/// Derives a stable table id from the absolute path of a table file.
///
/// Equal canonicalized paths yield equal ids within and across runs; the
/// hash is truncated to `i32` since `PageId::table_id` is signed.
pub fn table_id_of_path(path: &Path) -> i32 {
    let canonical = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    (hasher.finish() & 0x7fff_ffff) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn deterministic_table_id() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.dat");
        let b = dir.path().join("b.dat");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        let id_a = table_id_of_path(&a);
        let id_b = table_id_of_path(&b);
        assert_ne!(id_a, id_b);
        assert_eq!(id_a, table_id_of_path(&a));
    }

    #[test]
    fn page_id_equality_by_components() {
        let p1 = PageId::new(7, 3);
        let p2 = PageId::new(7, 3);
        let p3 = PageId::new(7, 4);
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }
}

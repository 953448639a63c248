use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::DbResult;
use crate::page_id::{table_id_of_path, PageId};
use crate::PAGE_SIZE;

/// Durable storage of fixed-size pages for one table file.
///
/// A single `Mutex<File>` guard makes each seek+read and seek+write atomic
/// without holding the guard across unrelated buffer pool work.
///
/// The seek offset is always `page_no * PAGE_SIZE`, computed by
/// multiplication; a bitwise AND in its place would degenerate to `0` or
/// `PAGE_SIZE` depending on the parity of `page_no` and silently corrupt
/// offsets for every other page.
pub struct HeapFileStore {
    file: Mutex<File>,
    table_id: i32,
}

impl HeapFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let table_id = table_id_of_path(&path);
        Ok(Self {
            file: Mutex::new(file),
            table_id,
        })
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }

    /// Reads `PAGE_SIZE` bytes at `pid`'s offset; pages past end-of-file
    /// are materialized zero-filled rather than erroring, so newly
    /// allocated pages can be read before they are ever written.
    pub fn read_page(&self, pid: PageId) -> DbResult<Vec<u8>> {
        let mut file = self.file.lock().unwrap();
        let offset = pid.page_no as u64 * PAGE_SIZE as u64;
        let len = file.metadata()?.len();

        let mut buf = vec![0u8; PAGE_SIZE];
        if offset >= len {
            return Ok(buf);
        }

        file.seek(SeekFrom::Start(offset))?;
        let available = (len - offset).min(PAGE_SIZE as u64) as usize;
        file.read_exact(&mut buf[..available])?;
        Ok(buf)
    }

    /// Writes exactly `PAGE_SIZE` bytes at the page's offset, extending the
    /// file with implicit zero-fill if the offset lies past the current
    /// end (the standard behavior of a seek-past-EOF write).
    pub fn write_page(&self, pid: PageId, bytes: &[u8]) -> DbResult<()> {
        assert_eq!(bytes.len(), PAGE_SIZE, "page write must be PAGE_SIZE bytes");
        let mut file = self.file.lock().unwrap();
        let offset = pid.page_no as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len();
        Ok(((len + PAGE_SIZE as u64 - 1) / PAGE_SIZE as u64) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_past_eof_is_zero_filled() {
        let dir = tempdir().unwrap();
        let store = HeapFileStore::open(dir.path().join("t.dat")).unwrap();
        let page = store.read_page(PageId::new(store.table_id(), 0)).unwrap();
        assert_eq!(page.len(), PAGE_SIZE);
        assert!(page.iter().all(|&b| b == 0));
        assert_eq!(store.num_pages().unwrap(), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = HeapFileStore::open(dir.path().join("t.dat")).unwrap();
        let pid = PageId::new(store.table_id(), 0);
        let mut bytes = vec![0u8; PAGE_SIZE];
        bytes[0] = 0xAB;
        store.write_page(pid, &bytes).unwrap();

        let read_back = store.read_page(pid).unwrap();
        assert_eq!(read_back, bytes);
        assert_eq!(store.num_pages().unwrap(), 1);
    }

    #[test]
    fn writing_page_two_extends_file_and_counts_pages() {
        let dir = tempdir().unwrap();
        let store = HeapFileStore::open(dir.path().join("t.dat")).unwrap();
        let pid = PageId::new(store.table_id(), 2);
        store.write_page(pid, &vec![1u8; PAGE_SIZE]).unwrap();
        assert_eq!(store.num_pages().unwrap(), 3);

        let page0 = store.read_page(PageId::new(store.table_id(), 0)).unwrap();
        assert!(page0.iter().all(|&b| b == 0));
    }
}

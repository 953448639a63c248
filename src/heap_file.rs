use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::error::{DbError, DbResult};
use crate::heap_page::HeapPage;
use crate::lock_manager::LockMode;
use crate::page::Page;
use crate::page_id::PageId;
use crate::page_store::HeapFileStore;
use crate::schema::TupleDesc;
use crate::tuple::Tuple;
use crate::tx_id::TxId;
use crate::PAGE_SIZE;

/// Physical tuple storage for one table, backed by one `HeapFileStore`.
/// `insert_tuple`/`delete_tuple` go through the buffer pool's `get_page`
/// so that the pages they touch are locked, cached, and marked dirty
/// exactly like any other page access — the buffer pool never reaches
/// into a page's bytes on its own behalf.
pub struct HeapFile {
    store: HeapFileStore,
    desc: Arc<TupleDesc>,
}

impl HeapFile {
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>) -> DbResult<Self> {
        Ok(Self {
            store: HeapFileStore::open(path)?,
            desc,
        })
    }

    pub fn table_id(&self) -> i32 {
        self.store.table_id()
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        self.store.num_pages()
    }

    pub(crate) fn load_page(&self, pid: PageId) -> DbResult<Box<dyn Page>> {
        let bytes = self.store.read_page(pid)?;
        Ok(Box::new(HeapPage::new(pid, Arc::clone(&self.desc), &bytes)?))
    }

    pub(crate) fn write_page(&self, page: &dyn Page) -> DbResult<()> {
        let bytes = page.get_page_data();
        self.store.write_page(page.get_id(), &bytes)
    }

    #[cfg(test)]
    pub fn read_page_bytes(&self, pid: PageId) -> DbResult<Vec<u8>> {
        self.store.read_page(pid)
    }

    /// Finds a page with a free slot (scanning existing pages, then
    /// allocating a new one past the current end of file), inserts `tup`,
    /// and returns the single modified page's id.
    pub fn insert_tuple(
        &self,
        tid: TxId,
        bp: &BufferPool,
        catalog: &crate::catalog::Catalog,
        tup: Tuple,
    ) -> DbResult<Vec<PageId>> {
        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.table_id(), page_no);
            let handle = bp.get_page(tid, pid, LockMode::Exclusive, catalog)?;
            let mut page = handle.lock().unwrap();
            let heap = page
                .as_any_mut()
                .downcast_mut::<HeapPage>()
                .expect("heap file pages are always HeapPage");
            if heap.num_empty_slots() > 0 {
                heap.insert(tup)?;
                drop(page);
                bp.mark_dirty(tid, pid);
                return Ok(vec![pid]);
            }
        }

        // No existing page has room. Extending the file is a structural
        // change independent of the inserting transaction — NO-STEAL only
        // governs *dirty* pages, and a freshly allocated empty page isn't
        // dirty until it's loaded through the buffer pool and written
        // into. Without growing the file up front here, `num_pages()`
        // would keep reporting the last committed length for the whole
        // lifetime of this (uncommitted) transaction, and every insert
        // past the first full page would collide on the same page number.
        let pid = PageId::new(self.table_id(), num_pages);
        self.store.write_page(pid, &vec![0u8; PAGE_SIZE])?;
        let handle = bp.get_page(tid, pid, LockMode::Exclusive, catalog)?;
        let mut page = handle.lock().unwrap();
        let heap = page
            .as_any_mut()
            .downcast_mut::<HeapPage>()
            .expect("heap file pages are always HeapPage");
        heap.insert(tup)?;
        drop(page);
        bp.mark_dirty(tid, pid);
        Ok(vec![pid])
    }

    /// Clears `tup`'s slot on the page named by its `rid`, returning that
    /// page's id. `tup` must have been read from this file (i.e. carry a
    /// `RecordId`); a tuple constructed fresh and never inserted has no
    /// location to delete.
    pub fn delete_tuple(
        &self,
        tid: TxId,
        bp: &BufferPool,
        catalog: &crate::catalog::Catalog,
        tup: &Tuple,
    ) -> DbResult<Vec<PageId>> {
        let rid = tup
            .rid
            .ok_or_else(|| DbError::IllegalArgument("tuple has no record id to delete".into()))?;

        let handle = bp.get_page(tid, rid.pid, LockMode::Exclusive, catalog)?;
        let mut page = handle.lock().unwrap();
        let heap = page
            .as_any_mut()
            .downcast_mut::<HeapPage>()
            .expect("heap file pages are always HeapPage");
        heap.delete(rid.slot)?;
        drop(page);
        bp.mark_dirty(tid, rid.pid);
        Ok(vec![rid.pid])
    }
}

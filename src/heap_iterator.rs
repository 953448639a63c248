use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;
use crate::heap_page::HeapPage;
use crate::lock_manager::LockMode;
use crate::page_id::PageId;
use crate::tuple::Tuple;
use crate::tx_id::TxId;

enum State {
    Unopened,
    /// Current page number and the tuples already read off it, not yet
    /// handed out.
    Open { page_no: usize, buffered: Vec<Tuple> },
    Closed,
}

/// Lazy, restartable, finite cursor over one table's tuples under one
/// transaction. Locks acquired while walking pages are held until the
/// transaction completes (strict 2PL) — this iterator never releases a
/// page lock itself.
///
/// Exposes an explicit cursor (`open`/`has_next`/`next`/`rewind`/`close`)
/// rather than `std::iter::Iterator`, since callers need `rewind` and the
/// open/closed states are part of the interface. `has_next()` is safe to
/// call before `open()` or after `close()` and simply answers `false`;
/// only `next()` raises `NoSuchElement` when there is nothing to return.
pub struct HeapIterator<'a> {
    tid: TxId,
    table: Arc<HeapFile>,
    bp: &'a BufferPool,
    catalog: &'a Catalog,
    state: State,
}

impl<'a> HeapIterator<'a> {
    pub fn new(tid: TxId, table: Arc<HeapFile>, bp: &'a BufferPool, catalog: &'a Catalog) -> Self {
        Self {
            tid,
            table,
            bp,
            catalog,
            state: State::Unopened,
        }
    }

    pub fn open(&mut self) -> DbResult<()> {
        self.state = State::Unopened;
        self.load_page(0)
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.open()
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    pub fn has_next(&mut self) -> DbResult<bool> {
        match &self.state {
            State::Unopened | State::Closed => Ok(false),
            State::Open { buffered, .. } if !buffered.is_empty() => Ok(true),
            State::Open { page_no, .. } => {
                let page_no = *page_no;
                self.advance_to_non_empty_page(page_no)
            }
        }
    }

    pub fn next(&mut self) -> DbResult<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement(
                "heap iterator has no next tuple".into(),
            ));
        }
        match &mut self.state {
            State::Open { buffered, .. } => Ok(buffered.remove(0)),
            _ => unreachable!("has_next would have errored first"),
        }
    }

    fn load_page(&mut self, page_no: usize) -> DbResult<()> {
        let num_pages = self.table.num_pages()?;
        if page_no >= num_pages {
            self.state = State::Open {
                page_no,
                buffered: Vec::new(),
            };
            return Ok(());
        }

        let pid = PageId::new(self.table.table_id(), page_no);
        let handle = self.bp.get_page(self.tid, pid, LockMode::Shared, self.catalog)?;
        let page = handle.lock().unwrap();
        let heap = page
            .as_any()
            .downcast_ref::<HeapPage>()
            .expect("heap file pages are always HeapPage");
        let buffered: Vec<Tuple> = heap.tuples().cloned().collect();
        drop(page);

        self.state = State::Open { page_no, buffered };
        Ok(())
    }

    /// Skips forward through empty pages until one with tuples is found
    /// or the table is exhausted.
    fn advance_to_non_empty_page(&mut self, mut page_no: usize) -> DbResult<bool> {
        let num_pages = self.table.num_pages()?;
        loop {
            page_no += 1;
            if page_no >= num_pages {
                self.state = State::Open {
                    page_no,
                    buffered: Vec::new(),
                };
                return Ok(false);
            }
            self.load_page(page_no)?;
            if let State::Open { buffered, .. } = &self.state {
                if !buffered.is_empty() {
                    return Ok(true);
                }
            }
        }
    }
}

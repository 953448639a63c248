use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::lock_manager::{LockManager, LockMode};
use crate::log_manager::LogManager;
use crate::page::Page;
use crate::page_id::PageId;
use crate::tx_id::TxId;

/// A page as held in the pool: shared so the same cached instance is
/// handed out to every caller, interior-mutable so a transaction holding
/// EXCLUSIVE can mutate it in place.
pub type PageHandle = Arc<Mutex<Box<dyn Page>>>;

/// Bounded in-memory cache of pages, keyed by `PageId`. Integrates the
/// lock manager on every access, drives NO-STEAL dirty-page policy, and
/// writes through the log on flush.
///
/// Grounded on `small-rows-rust/src/btree/buffer_pool.rs` for the overall
/// shape (lock-before-lookup, pool-wide serialization around cache
/// mutation, flush-before-write ordering), generalized from four
/// per-page-category maps to a single `PageId -> Page` map since the core
/// is polymorphic only over the `Page` trait, not over a page-kind
/// hierarchy.
pub struct BufferPool {
    capacity: usize,
    pool: Mutex<HashMap<PageId, PageHandle>>,
    /// Serializes the "miss" path (evict + I/O + insert) so two
    /// concurrent misses for the same page can't both materialize and
    /// insert it; the fast cache-hit path never takes this lock.
    miss_lock: Mutex<()>,
    lock_manager: Arc<LockManager>,
    log_manager: Arc<LogManager>,
}

impl BufferPool {
    pub fn new(capacity: usize, lock_manager: Arc<LockManager>, log_manager: Arc<LogManager>) -> Self {
        Self {
            capacity,
            pool: Mutex::new(HashMap::new()),
            miss_lock: Mutex::new(()),
            lock_manager,
            log_manager,
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Acquires the page lock in `mode`, then returns the cached page,
    /// reading it through the page store and inserting it (evicting if
    /// necessary) on a cache miss.
    pub fn get_page(
        &self,
        tid: TxId,
        pid: PageId,
        mode: LockMode,
        catalog: &Catalog,
    ) -> DbResult<PageHandle> {
        match mode {
            LockMode::Shared => self.lock_manager.acquire_shared(tid, pid)?,
            LockMode::Exclusive => self.lock_manager.acquire_exclusive(tid, pid)?,
        }

        if let Some(page) = self.pool.lock().unwrap().get(&pid) {
            return Ok(Arc::clone(page));
        }

        let _miss_guard = self.miss_lock.lock().unwrap();
        if let Some(page) = self.pool.lock().unwrap().get(&pid) {
            return Ok(Arc::clone(page));
        }

        {
            let mut pool = self.pool.lock().unwrap();
            if pool.len() >= self.capacity {
                self.evict(&mut pool)?;
            }
        }

        let table = catalog.table(pid.table_id)?;
        let loaded: PageHandle = Arc::new(Mutex::new(table.load_page(pid)?));

        let mut pool = self.pool.lock().unwrap();
        let handle = pool.entry(pid).or_insert(loaded);
        Ok(Arc::clone(handle))
    }

    /// Removes the first clean (not-dirty) page found. NO-STEAL means a
    /// dirty page is never evicted, so a pool full of dirty pages fails
    /// with `BufferFull` rather than writing one out early.
    fn evict(&self, pool: &mut HashMap<PageId, PageHandle>) -> DbResult<()> {
        let victim = pool
            .iter()
            .find(|(_, page)| page.lock().unwrap().is_dirty().is_none())
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                pool.remove(&pid);
                debug!("evicted clean page {}", pid);
                Ok(())
            }
            None => {
                warn!("buffer pool full, every cached page is dirty");
                Err(DbError::BufferFull)
            }
        }
    }

    /// Marks `pid` dirty-by `tid` and re-seats it in the pool. Used after
    /// a `DbFile` mutation so a newly allocated page not previously
    /// resident becomes cached. A page once marked dirty stays in the
    /// pool until its transaction commits or aborts.
    pub fn mark_dirty(&self, tid: TxId, pid: PageId) {
        let pool = self.pool.lock().unwrap();
        if let Some(page) = pool.get(&pid) {
            page.lock().unwrap().mark_dirty(Some(tid));
        }
    }

    pub fn insert(&self, pid: PageId, page: PageHandle) {
        self.pool.lock().unwrap().insert(pid, page);
    }

    /// Appends this page's `UPDATE` record, forces the log, then writes
    /// the page through the page store — in that order, so the
    /// write-ahead guarantee holds even if the process crashes between
    /// the force and the write.
    pub fn flush_page(&self, pid: PageId, catalog: &Catalog) -> DbResult<()> {
        let handle = match self.pool.lock().unwrap().get(&pid) {
            Some(handle) => Arc::clone(handle),
            None => return Ok(()),
        };

        // Structural lookup is done; everything past here — log force,
        // disk write — runs without holding the pool mutex.
        let tid = match handle.lock().unwrap().is_dirty() {
            Some(tid) => tid,
            None => return Ok(()),
        };

        let table = catalog.table(pid.table_id)?;
        let page = handle.lock().unwrap();
        let before = page.get_before_image();
        self.log_manager.log_update(tid, before.as_ref(), page.as_ref())?;
        self.log_manager.force()?;
        table.write_page(page.as_ref())?;
        Ok(())
    }

    /// Finishes `tid`: on commit, clears the dirty flag on every page it
    /// dirtied and refreshes their before-images (the pages themselves
    /// must already be flushed by the caller — see `Transaction::commit`,
    /// which flushes and forces before appending COMMIT and only then
    /// calls this); on abort, rolls every page it dirtied back to its
    /// before-image in place. Either way, every lock `tid` holds is
    /// released. Does not itself append COMMIT/ABORT to the log.
    pub fn transaction_complete(&self, tid: TxId, commit: bool, catalog: &Catalog) -> DbResult<()> {
        let dirty_pids: Vec<PageId> = {
            let pool = self.pool.lock().unwrap();
            pool.iter()
                .filter(|(_, page)| page.lock().unwrap().is_dirty() == Some(tid))
                .map(|(pid, _)| *pid)
                .collect()
        };

        for pid in dirty_pids {
            if commit {
                // Already written through and forced by the caller's
                // `flush_pages` before it appended COMMIT; flushing again
                // here would log a second UPDATE after the COMMIT record.
                // This loop only clears bookkeeping state.
                let pool = self.pool.lock().unwrap();
                if let Some(handle) = pool.get(&pid) {
                    let mut page = handle.lock().unwrap();
                    page.mark_dirty(None);
                    page.set_before_image();
                }
            } else {
                let pool = self.pool.lock().unwrap();
                if let Some(handle) = pool.get(&pid) {
                    let before = handle.lock().unwrap().get_before_image();
                    *handle.lock().unwrap() = before;
                }
            }
        }

        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Drops `pid` from the pool without flushing it. Used during
    /// recovery to make sure a rolled-back page is never served stale
    /// from the cache.
    pub fn discard_page(&self, pid: PageId) {
        self.pool.lock().unwrap().remove(&pid);
    }

    pub fn flush_all_pages(&self, catalog: &Catalog) -> DbResult<()> {
        let pids: Vec<PageId> = self.pool.lock().unwrap().keys().copied().collect();
        for pid in pids {
            self.flush_page(pid, catalog)?;
        }
        Ok(())
    }

    pub fn flush_pages(&self, tid: TxId, catalog: &Catalog) -> DbResult<()> {
        let pids: Vec<PageId> = {
            let pool = self.pool.lock().unwrap();
            pool.iter()
                .filter(|(_, page)| page.lock().unwrap().is_dirty() == Some(tid))
                .map(|(pid, _)| *pid)
                .collect()
        };
        for pid in pids {
            self.flush_page(pid, catalog)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pool.lock().unwrap().len()
    }
}

use crate::context::Context;
use crate::error::DbResult;
use crate::tx_id::TxId;

/// Thin façade sequencing begin -> work -> commit/abort against the
/// buffer pool and log. Tracks only whether it has already finished
/// (`started`), since nothing outside this type ever needs to query a
/// transaction's status beyond that.
pub struct Transaction<'a> {
    id: TxId,
    ctx: &'a Context,
    started: bool,
}

impl<'a> Transaction<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            id: TxId::next(),
            ctx,
            started: false,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    pub fn start(&mut self) -> DbResult<()> {
        self.ctx.log_manager.log_begin(self.id)?;
        self.started = true;
        Ok(())
    }

    /// Flushes and forces every page this transaction dirtied (with their
    /// `UPDATE` records ahead of them), appends `COMMIT`, then releases
    /// every lock the transaction holds. At-most-once: a second call on
    /// an already-finished transaction is a no-op.
    pub fn commit(&mut self) -> DbResult<()> {
        if !self.started {
            return Ok(());
        }
        self.ctx.buffer_pool.flush_pages(self.id, &self.ctx.catalog)?;
        self.ctx.log_manager.log_commit(self.id)?;
        self.ctx
            .buffer_pool
            .transaction_complete(self.id, true, &self.ctx.catalog)?;
        self.started = false;
        Ok(())
    }

    /// Appends `ABORT`, then restores every page this transaction
    /// dirtied to its before-image and releases every lock it holds.
    pub fn abort(&mut self) -> DbResult<()> {
        if !self.started {
            return Ok(());
        }
        self.ctx.log_manager.log_abort(self.id)?;
        self.ctx
            .buffer_pool
            .transaction_complete(self.id, false, &self.ctx.catalog)?;
        self.started = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::heap_file::HeapFile;
    use crate::lock_manager::LockMode;
    use crate::page_id::PageId;
    use crate::schema::int_schema;
    use crate::tuple::{Field, Tuple};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn commit_is_idempotent_after_first_call() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(&Config::default(), dir.path().join("log.bin")).unwrap();
        let desc = Arc::new(int_schema(1));
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), desc).unwrap());
        ctx.catalog.add_table(Arc::clone(&file));

        let mut tx = Transaction::new(&ctx);
        tx.start().unwrap();
        file.insert_tuple(tx.id(), &ctx.buffer_pool, &ctx.catalog, Tuple::new(vec![Field::Int(1)]))
            .unwrap();
        tx.commit().unwrap();
        tx.commit().unwrap(); // second call is a no-op, not a double release

        assert!(!ctx.lock_manager.holds_lock(tx.id(), PageId::new(file.table_id(), 0)));
    }

    #[test]
    fn abort_rolls_back_writes_before_next_reader_sees_them() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(&Config::default(), dir.path().join("log.bin")).unwrap();
        let desc = Arc::new(int_schema(1));
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), desc).unwrap());
        ctx.catalog.add_table(Arc::clone(&file));

        let mut writer = Transaction::new(&ctx);
        writer.start().unwrap();
        file.insert_tuple(
            writer.id(),
            &ctx.buffer_pool,
            &ctx.catalog,
            Tuple::new(vec![Field::Int(42)]),
        )
        .unwrap();
        writer.abort().unwrap();

        let mut reader = Transaction::new(&ctx);
        reader.start().unwrap();
        let pid = PageId::new(file.table_id(), 0);
        let handle = ctx
            .buffer_pool
            .get_page(reader.id(), pid, LockMode::Shared, &ctx.catalog)
            .unwrap();
        let page = handle.lock().unwrap();
        let heap = page
            .as_any()
            .downcast_ref::<crate::heap_page::HeapPage>()
            .unwrap();
        assert_eq!(heap.num_empty_slots(), heap.num_slots());
        drop(page);
        reader.commit().unwrap();
    }
}

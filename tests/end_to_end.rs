mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use strict2pl_core::config::Config;
use strict2pl_core::context::Context;
use strict2pl_core::error::DbError;
use strict2pl_core::heap_file::HeapFile;
use strict2pl_core::heap_iterator::HeapIterator;
use strict2pl_core::lock_manager::LockMode;
use strict2pl_core::page_id::PageId;
use strict2pl_core::schema::int_schema;
use strict2pl_core::transaction::Transaction;
use strict2pl_core::tuple::{Field, Tuple};

#[test]
fn deterministic_table_id_across_files_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let desc = Arc::new(int_schema(1));
    let a = HeapFile::open(dir.path().join("a.dat"), Arc::clone(&desc)).unwrap();
    let b = HeapFile::open(dir.path().join("b.dat"), Arc::clone(&desc)).unwrap();
    assert_ne!(a.table_id(), b.table_id());

    let a_again = HeapFile::open(dir.path().join("a.dat"), desc).unwrap();
    assert_eq!(a.table_id(), a_again.table_id());
}

#[test]
fn insert_commit_then_iterate_sees_all_tuples() {
    let (_dir, ctx, file) = common::setup_table(64, 2);

    let mut writer = Transaction::new(&ctx);
    writer.start().unwrap();
    for i in 0..2000 {
        file.insert_tuple(
            writer.id(),
            &ctx.buffer_pool,
            &ctx.catalog,
            Tuple::new(vec![Field::Int(i), Field::Int(i)]),
        )
        .unwrap();
    }
    writer.commit().unwrap();
    assert!(file.num_pages().unwrap() >= 2);

    let mut reader = Transaction::new(&ctx);
    reader.start().unwrap();
    let mut it = HeapIterator::new(reader.id(), Arc::clone(&file), &ctx.buffer_pool, &ctx.catalog);
    it.open().unwrap();

    let first = it.next().unwrap();
    assert_eq!(first.fields, vec![Field::Int(0), Field::Int(0)]);

    let mut count = 1;
    let mut last = first;
    while it.has_next().unwrap() {
        last = it.next().unwrap();
        count += 1;
    }
    assert_eq!(count, 2000);
    assert_eq!(last.fields, vec![Field::Int(1999), Field::Int(1999)]);
    reader.commit().unwrap();
}

#[test]
fn abort_restores_pre_write_content_for_the_next_transaction() {
    let (_dir, ctx, file) = common::setup_table(64, 1);

    let mut writer = Transaction::new(&ctx);
    writer.start().unwrap();
    file.insert_tuple(writer.id(), &ctx.buffer_pool, &ctx.catalog, Tuple::new(vec![Field::Int(9)]))
        .unwrap();
    writer.abort().unwrap();

    let mut reader = Transaction::new(&ctx);
    reader.start().unwrap();
    let mut it = HeapIterator::new(reader.id(), Arc::clone(&file), &ctx.buffer_pool, &ctx.catalog);
    it.open().unwrap();
    assert!(!it.has_next().unwrap());
    reader.commit().unwrap();
}

#[test]
fn two_transactions_in_a_lock_cycle_exactly_one_aborts() {
    let config = Config {
        buffer_pool_capacity: 16,
        lock_wait_timeout: Duration::from_millis(150),
    };
    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(Context::new(&config, dir.path().join("log.bin")).unwrap());

    let p1 = PageId::new(1, 0);
    let p2 = PageId::new(1, 1);

    let ctx1 = Arc::clone(&ctx);
    let t1 = thread::spawn(move || {
        let tid = strict2pl_core::tx_id::TxId::next();
        ctx1.buffer_pool
            .lock_manager()
            .acquire_shared(tid, p1)
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        let result = ctx1.buffer_pool.lock_manager().acquire_exclusive(tid, p2);
        (tid, result)
    });

    let ctx2 = Arc::clone(&ctx);
    let t2 = thread::spawn(move || {
        let tid = strict2pl_core::tx_id::TxId::next();
        ctx2.buffer_pool
            .lock_manager()
            .acquire_shared(tid, p2)
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        let result = ctx2.buffer_pool.lock_manager().acquire_exclusive(tid, p1);
        (tid, result)
    });

    let (tid1, r1) = t1.join().unwrap();
    let (tid2, r2) = t2.join().unwrap();

    let aborted = [(&tid1, &r1), (&tid2, &r2)]
        .iter()
        .filter(|(_, r)| matches!(r, Err(DbError::TransactionAborted(_))))
        .count();
    assert_eq!(aborted, 1, "exactly one side of the cycle must abort");

    // The aborter must hold nothing once it tears itself down.
    let (aborted_tid, survivor_tid) = if r1.is_err() { (tid1, tid2) } else { (tid2, tid1) };
    ctx.buffer_pool.lock_manager().release_all(aborted_tid);
    assert!(!ctx.buffer_pool.lock_manager().holds_lock(aborted_tid, p1));
    assert!(!ctx.buffer_pool.lock_manager().holds_lock(aborted_tid, p2));

    ctx.buffer_pool.lock_manager().release_all(survivor_tid);
}

#[test]
fn buffer_full_when_every_cached_page_is_dirty() {
    let (_dir, ctx, file) = common::setup_table(1, 2);

    let mut tx = Transaction::new(&ctx);
    tx.start().unwrap();
    file.insert_tuple(tx.id(), &ctx.buffer_pool, &ctx.catalog, Tuple::new(vec![Field::Int(1), Field::Int(1)]))
        .unwrap();

    // Capacity is 1 and the one resident page is now dirty (NO-STEAL), so
    // a second page can't be brought in without evicting it.
    let other_pid = PageId::new(file.table_id() + 1, 0);
    let err = ctx
        .buffer_pool
        .get_page(tx.id(), other_pid, LockMode::Shared, &ctx.catalog);
    assert!(matches!(err, Err(DbError::BufferFull)));

    tx.commit().unwrap();
}

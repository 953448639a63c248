use std::sync::Arc;

use strict2pl_core::config::Config;
use strict2pl_core::context::Context;
use strict2pl_core::heap_file::HeapFile;
use strict2pl_core::schema::{int_schema, TupleDesc};

/// Builds a fresh `Context` plus one registered table in a scratch
/// directory, shared across integration tests that need a working
/// storage/transaction stack without repeating the setup boilerplate.
pub fn setup_table(capacity: usize, n_fields: usize) -> (tempfile::TempDir, Context, Arc<HeapFile>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.buffer_pool_capacity = capacity;

    let ctx = Context::new(&config, dir.path().join("log.bin")).unwrap();
    let desc: Arc<TupleDesc> = Arc::new(int_schema(n_fields));
    let file = Arc::new(HeapFile::open(dir.path().join("table.dat"), desc).unwrap());
    ctx.catalog.add_table(Arc::clone(&file));

    (dir, ctx, file)
}

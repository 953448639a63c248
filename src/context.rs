use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::DbResult;
use crate::lock_manager::LockManager;
use crate::log_manager::LogManager;

/// Owns the process's buffer pool, lock manager, log, and catalog.
///
/// Built once at startup and passed by reference into every `Transaction`
/// and `HeapIterator` — there is no hidden global state to reset between
/// tests or database instances.
pub struct Context {
    pub buffer_pool: BufferPool,
    pub lock_manager: Arc<LockManager>,
    pub log_manager: Arc<LogManager>,
    pub catalog: Catalog,
}

impl Context {
    pub fn new(config: &Config, log_path: impl AsRef<Path>) -> DbResult<Self> {
        let lock_manager = Arc::new(LockManager::with_wait_timeout(config.lock_wait_timeout));
        let log_manager = Arc::new(LogManager::open(log_path)?);
        let buffer_pool = BufferPool::new(
            config.buffer_pool_capacity,
            Arc::clone(&lock_manager),
            Arc::clone(&log_manager),
        );
        Ok(Self {
            buffer_pool,
            lock_manager,
            log_manager,
            catalog: Catalog::new(),
        })
    }
}

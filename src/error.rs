use std::io;

/// Error kinds surfaced at the crate boundary.
///
/// `TransactionAborted` is raised synchronously out of a lock acquisition
/// when granting it would close a cycle in the waits-for graph; callers
/// must unwind to the owning `Transaction` and call `abort()`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("buffer pool is full, no clean page to evict")]
    BufferFull,

    #[error("storage I/O error: {0}")]
    StorageIo(#[from] io::Error),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),
}

pub type DbResult<T> = Result<T, DbError>;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use log::trace;

use crate::error::DbResult;
use crate::page::Page;
use crate::page_id::PageId;
use crate::tx_id::TxId;

/// One append-only record. The on-disk byte layout is not part of this
/// crate's contract; records are rendered as one newline-terminated line
/// of text plus a trailing hex blob for `Update`'s before/after images,
/// which is simple to force and to read back in tests without a custom
/// binary framing that nothing here replays for recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Begin(TxId),
    Update {
        tid: TxId,
        pid: PageId,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    Commit(TxId),
    Abort(TxId),
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl LogRecord {
    fn render(&self) -> String {
        match self {
            LogRecord::Begin(tid) => format!("BEGIN {}", tid),
            LogRecord::Update {
                tid,
                pid,
                before,
                after,
            } => format!(
                "UPDATE {} {} {} {} {}",
                tid,
                pid.table_id,
                pid.page_no,
                to_hex(before),
                to_hex(after)
            ),
            LogRecord::Commit(tid) => format!("COMMIT {}", tid),
            LogRecord::Abort(tid) => format!("ABORT {}", tid),
        }
    }
}

struct Inner {
    file: BufWriter<File>,
    records: Vec<LogRecord>,
}

/// Append-only write-ahead log. The ordering guarantee this crate relies
/// on: every `UPDATE` record for a page a committing transaction dirtied,
/// and its `COMMIT` record, are forced before the buffer pool writes that
/// page through to the page store and before `commit()` returns. There is
/// no `CHECKPOINT` record; nothing here replays the log, so there is
/// nothing to bound the replay of.
pub struct LogManager {
    inner: Mutex<Inner>,
}

impl LogManager {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                file: BufWriter::new(file),
                records: Vec::new(),
            }),
        })
    }

    pub fn log_begin(&self, tid: TxId) -> DbResult<()> {
        self.append(LogRecord::Begin(tid))
    }

    pub fn log_update(&self, tid: TxId, before: &dyn Page, after: &dyn Page) -> DbResult<()> {
        debug_assert_eq!(before.get_id(), after.get_id());
        self.append(LogRecord::Update {
            tid,
            pid: after.get_id(),
            before: before.get_page_data(),
            after: after.get_page_data(),
        })
    }

    pub fn log_commit(&self, tid: TxId) -> DbResult<()> {
        self.append(LogRecord::Commit(tid))
    }

    pub fn log_abort(&self, tid: TxId) -> DbResult<()> {
        self.append(LogRecord::Abort(tid))
    }

    fn append(&self, record: LogRecord) -> DbResult<()> {
        let mut inner = self.inner.lock().unwrap();
        trace!("log append: {:?}", record);
        let line = record.render();
        inner.records.push(record);
        writeln!(inner.file, "{}", line)?;
        Ok(())
    }

    /// Durably flushes the log. Every record appended before this call
    /// returns is guaranteed on disk once it does.
    pub fn force(&self) -> DbResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.file.flush()?;
        inner.file.get_ref().sync_all()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner.lock().unwrap().records.clone()
    }
}

use crate::page_id::PageId;
use crate::tx_id::TxId;

/// Capability set the buffer pool needs from a concrete page type.
///
/// The buffer pool is polymorphic only over this trait, never over a
/// concrete page representation, so the on-disk bit layout of any one page
/// kind stays outside the core's contract.
pub trait Page: Send {
    fn get_id(&self) -> PageId;

    /// Downcasting escape hatch so callers that know the concrete page
    /// type (the heap file, its iterator, tests) can reach type-specific
    /// methods `Page` doesn't expose, without the buffer pool or lock
    /// manager ever needing to know about them.
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Serializes the page back to exactly `PAGE_SIZE` bytes.
    fn get_page_data(&self) -> Vec<u8>;

    /// Marks the page dirty-by `tid`, or clears the dirty marker when `None`.
    ///
    /// Invariant: `mark_dirty(Some(t))` must only be called while `t` holds
    /// EXCLUSIVE on this page's id; the buffer pool upholds this, the page
    /// itself does not re-check it.
    fn mark_dirty(&mut self, tid: Option<TxId>);

    fn is_dirty(&self) -> Option<TxId>;

    /// Snapshot of the page's committed content at the moment it was first
    /// dirtied by the current transaction; used for in-memory abort
    /// rollback.
    fn get_before_image(&self) -> Box<dyn Page>;

    /// Takes the page's current content as its new before-image; called by
    /// the buffer pool right after a dirty page is flushed on commit.
    fn set_before_image(&mut self);
}

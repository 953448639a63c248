use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::page::Page;
use crate::page_id::PageId;
use crate::schema::TupleDesc;
use crate::tuple::{Field, Tuple};
use crate::PAGE_SIZE;

/// Number of tuple slots a heap page can hold under `desc`: one bitmap
/// bit per slot, so the capacity accounts for both the tuple bytes and
/// their header bit.
pub fn slot_count(desc: &TupleDesc) -> usize {
    let tuple_bits = desc.tuple_size() * 8 + 1;
    PAGE_SIZE * 8 / tuple_bits
}

fn header_size(desc: &TupleDesc) -> usize {
    (slot_count(desc) + 7) / 8
}

/// Reference `Page` implementation: a slotted page with a bitmap header
/// and fixed-width tuple slots. Its on-disk bit layout is not part of the
/// core's contract — it exists only to exercise `BufferPool`/
/// `HeapIterator` end-to-end.
pub struct HeapPage {
    id: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty_by: Option<crate::tx_id::TxId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    pub fn new(id: PageId, desc: Arc<TupleDesc>, bytes: &[u8]) -> DbResult<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DbError::IllegalArgument(format!(
                "page bytes must be {} long, got {}",
                PAGE_SIZE,
                bytes.len()
            )));
        }

        let hsize = header_size(&desc);
        let header = bytes[..hsize].to_vec();

        let n = slot_count(&desc);
        let tuple_size = desc.tuple_size();
        let mut slots = Vec::with_capacity(n);
        let mut offset = hsize;
        for slot in 0..n {
            let slice = &bytes[offset..offset + tuple_size];
            if Self::slot_used(&header, slot) {
                let mut tup = Self::decode_tuple(&desc, slice)?;
                tup.rid = Some(crate::tuple::RecordId { pid: id, slot });
                slots.push(Some(tup));
            } else {
                slots.push(None);
            }
            offset += tuple_size;
        }

        Ok(Self {
            id,
            desc,
            header,
            slots,
            dirty_by: None,
            before_image: bytes.to_vec(),
        })
    }

    pub fn empty(id: PageId, desc: Arc<TupleDesc>) -> Self {
        let n = slot_count(&desc);
        let hsize = header_size(&desc);
        Self {
            id,
            slots: vec![None; n],
            header: vec![0u8; hsize],
            dirty_by: None,
            before_image: vec![0u8; PAGE_SIZE],
            desc,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn slot_used(header: &[u8], slot: usize) -> bool {
        let byte = header[slot / 8];
        let bit = slot % 8;
        (byte & (1 << (7 - bit))) != 0
    }

    fn set_slot_used(header: &mut [u8], slot: usize, used: bool) {
        let bit = 1u8 << (7 - (slot % 8));
        if used {
            header[slot / 8] |= bit;
        } else {
            header[slot / 8] &= !bit;
        }
    }

    fn decode_tuple(desc: &TupleDesc, bytes: &[u8]) -> DbResult<Tuple> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for ty in &desc.field_types {
            let len = Field::encoded_len(*ty);
            fields.push(Field::read_from(*ty, &bytes[offset..offset + len])?);
            offset += len;
        }
        Ok(Tuple::new(fields))
    }

    /// Inserts `tup` into the first empty slot, returning the slot index.
    pub fn insert(&mut self, mut tup: Tuple) -> DbResult<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or_else(|| DbError::IllegalArgument("heap page has no empty slot".into()))?;
        Self::set_slot_used(&mut self.header, slot, true);
        tup.rid = Some(crate::tuple::RecordId { pid: self.id, slot });
        self.slots[slot] = Some(tup);
        Ok(slot)
    }

    pub fn delete(&mut self, slot: usize) -> DbResult<()> {
        if slot >= self.slots.len() || self.slots[slot].is_none() {
            return Err(DbError::IllegalArgument(format!(
                "slot {} is not a valid used slot",
                slot
            )));
        }
        Self::set_slot_used(&mut self.header, slot, false);
        self.slots[slot] = None;
        Ok(())
    }
}

impl Page for HeapPage {
    fn get_id(&self) -> PageId {
        self.id
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn get_page_data(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PAGE_SIZE];
        buf[..self.header.len()].copy_from_slice(&self.header);

        let tuple_size = self.desc.tuple_size();
        let mut offset = self.header.len();
        for slot in &self.slots {
            if let Some(tup) = slot {
                for (field, ty) in tup.fields.iter().zip(&self.desc.field_types) {
                    let len = Field::encoded_len(*ty);
                    field
                        .write_into(&mut buf[offset..offset + len])
                        .expect("field encoding width mismatch");
                    offset += len;
                }
            } else {
                offset += tuple_size;
            }
        }
        buf
    }

    fn mark_dirty(&mut self, tid: Option<crate::tx_id::TxId>) {
        self.dirty_by = tid;
    }

    fn is_dirty(&self) -> Option<crate::tx_id::TxId> {
        self.dirty_by
    }

    fn get_before_image(&self) -> Box<dyn Page> {
        let page = HeapPage::new(self.id, Arc::clone(&self.desc), &self.before_image)
            .expect("before-image must decode, it was produced by this type");
        Box::new(page)
    }

    fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::int_schema;

    #[test]
    fn two_int_fields_yield_504_slots() {
        let desc = Arc::new(int_schema(2));
        assert_eq!(slot_count(&desc), 504);
        assert_eq!(header_size(&desc), 63);
    }

    #[test]
    fn twenty_tuples_leave_484_empty_slots() {
        let desc = Arc::new(int_schema(2));
        let mut page = HeapPage::empty(PageId::new(1, 0), Arc::clone(&desc));
        for i in 0..20 {
            page.insert(Tuple::new(vec![Field::Int(i), Field::Int(i)]))
                .unwrap();
        }
        assert_eq!(page.num_empty_slots(), 484);
    }

    #[test]
    fn round_trip_through_bytes() {
        let desc = Arc::new(int_schema(2));
        let mut page = HeapPage::empty(PageId::new(1, 0), Arc::clone(&desc));
        page.insert(Tuple::new(vec![Field::Int(7), Field::Int(9)]))
            .unwrap();

        let bytes = page.get_page_data();
        let reloaded = HeapPage::new(PageId::new(1, 0), desc, &bytes).unwrap();
        let tuples: Vec<Vec<Field>> = reloaded.tuples().map(|t| t.fields.clone()).collect();
        assert_eq!(tuples, vec![vec![Field::Int(7), Field::Int(9)]]);
    }
}

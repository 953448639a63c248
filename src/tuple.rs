use crate::error::{DbError, DbResult};

/// Fixed width, in bytes, of an encoded `Field::Str` payload in the heap
/// page reference implementation. Strings shorter than this are
/// space-padded; strings longer than this are an `IllegalArgument`.
pub const STR_FIELD_LEN: usize = 32;

/// Dynamically typed field value. Two variants, each with a fixed encoded
/// size: `Int` encodes as 4 little-endian bytes, `Str` as `STR_FIELD_LEN`
/// space-padded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn encoded_len(ty: FieldType) -> usize {
        match ty {
            FieldType::Int => 4,
            FieldType::Str => STR_FIELD_LEN,
        }
    }

    pub fn write_into(&self, buf: &mut [u8]) -> DbResult<()> {
        match self {
            Field::Int(v) => {
                if buf.len() != 4 {
                    return Err(DbError::IllegalArgument(
                        "int field buffer must be 4 bytes".into(),
                    ));
                }
                buf.copy_from_slice(&v.to_le_bytes());
                Ok(())
            }
            Field::Str(s) => {
                if buf.len() != STR_FIELD_LEN {
                    return Err(DbError::IllegalArgument(format!(
                        "string field buffer must be {} bytes",
                        STR_FIELD_LEN
                    )));
                }
                let bytes = s.as_bytes();
                if bytes.len() > STR_FIELD_LEN {
                    return Err(DbError::IllegalArgument(format!(
                        "string field '{}' exceeds {} bytes",
                        s, STR_FIELD_LEN
                    )));
                }
                for b in buf.iter_mut() {
                    *b = b' ';
                }
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(())
            }
        }
    }

    pub fn read_from(ty: FieldType, buf: &[u8]) -> DbResult<Field> {
        match ty {
            FieldType::Int => {
                if buf.len() != 4 {
                    return Err(DbError::IllegalArgument(
                        "int field buffer must be 4 bytes".into(),
                    ));
                }
                let mut arr = [0u8; 4];
                arr.copy_from_slice(buf);
                Ok(Field::Int(i32::from_le_bytes(arr)))
            }
            FieldType::Str => {
                let s = String::from_utf8_lossy(buf).trim_end().to_string();
                Ok(Field::Str(s))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Str,
}

/// Identifies where a tuple physically lives once it has been read off a
/// page; `delete_tuple` needs this to find the slot to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub pid: crate::page_id::PageId,
    pub slot: usize,
}

/// One row's worth of `Field`s, opaque to the storage/transaction core.
/// `rid` is `None` for a tuple not yet placed on a page and `Some` once
/// a heap page read or insert has located it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub fields: Vec<Field>,
    pub rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, rid: None }
    }

    pub fn field(&self, i: usize) -> DbResult<&Field> {
        self.fields
            .get(i)
            .ok_or_else(|| DbError::IllegalArgument(format!("field index {} out of range", i)))
    }
}

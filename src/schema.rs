use crate::tuple::FieldType;

/// Ordered list of field types making up one table's rows. Used only by
/// the heap page/file reference implementation to compute per-page slot
/// counts and field widths; the buffer pool, lock manager, log and
/// transaction façade never look inside it.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    pub field_types: Vec<FieldType>,
}

impl TupleDesc {
    pub fn new(field_types: Vec<FieldType>) -> Self {
        Self { field_types }
    }

    /// Total encoded width, in bytes, of one tuple under this schema.
    pub fn tuple_size(&self) -> usize {
        self.field_types
            .iter()
            .map(|ty| crate::tuple::Field::encoded_len(*ty))
            .sum()
    }

    pub fn num_fields(&self) -> usize {
        self.field_types.len()
    }
}

pub fn int_schema(n: usize) -> TupleDesc {
    TupleDesc::new(vec![FieldType::Int; n])
}

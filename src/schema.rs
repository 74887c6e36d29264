//! Struct definitions: ordered fields with a fixed byte length, decoded from byte slices.

use std::{collections::HashSet, sync::Arc};

use crate::{
    compiled::{CompiledField, decode_record},
    errors::{DecodeError, SchemaError},
    field::{Field, FieldKind},
    primitive::Cursor,
    value::{Record, StructId},
};

/// A fixed-layout struct. Use [StructDef::define] to build one, then [StructDef::decode_one] or
/// [StructDef::decode_many] to read instances.
///
/// Definitions are immutable and shared through [Arc], so one definition can be nested in any
/// number of other structs and arrays.
#[derive(Debug)]
pub struct StructDef {
    id: StructId,
    byte_length: usize,
    fields: Vec<Field>,
    plan: Vec<CompiledField>,
}

impl StructDef {
    /// Builds a definition from fields in decode order. Fails if there are no fields, a value
    /// field's name is missing, empty or repeated, a skip field is named, an array holds skip or
    /// zero-width elements, or the total length overflows.
    pub fn define(fields: impl IntoIterator<Item = Field>) -> Result<Arc<Self>, SchemaError> {
        let fields: Vec<Field> = fields.into_iter().collect();
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut names = HashSet::with_capacity(fields.len());
        let mut plan = Vec::with_capacity(fields.len());
        let mut byte_length = 0usize;

        for field in &fields {
            match (&field.name, &field.kind) {
                (None, FieldKind::Skip { .. }) => {}
                (Some(name), kind)
                    if !name.is_empty() && !matches!(kind, FieldKind::Skip { .. }) =>
                {
                    if !names.insert(name.as_str()) {
                        return Err(SchemaError::DuplicateFieldName(name.clone()));
                    }
                }
                _ => return Err(SchemaError::InvalidFieldName),
            }

            let compiled = CompiledField::compile(field, byte_length)?;
            byte_length = byte_length
                .checked_add(compiled.byte_length)
                .ok_or(SchemaError::LengthOverflow)?;
            plan.push(compiled);
        }

        let id = StructId::next();
        tracing::debug!(struct_id = %id, fields = fields.len(), byte_length, "defined struct");

        Ok(Arc::new(StructDef {
            id,
            byte_length,
            fields,
            plan,
        }))
    }

    pub fn id(&self) -> StructId {
        self.id
    }

    /// Bytes occupied by one instance.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Compiled fields in declaration order, with their offsets.
    pub fn compiled(&self) -> &[CompiledField] {
        &self.plan
    }

    /// Byte offset of a named field from the start of the struct.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.plan
            .iter()
            .find(|field| field.name.as_deref() == Some(name))
            .map(|field| field.offset)
    }

    /// Decodes one instance at `offset`. Returns the record and the offset just past it.
    ///
    /// Nothing is read unless the whole instance lies inside `data`.
    pub fn decode_one(&self, data: &[u8], offset: usize) -> Result<(Record, usize), DecodeError> {
        DecodeError::check_range(offset, self.byte_length, data.len())?;

        let mut cursor = Cursor::new(data, offset)?;
        let record = self.decode_at(&mut cursor)?;
        Ok((record, cursor.offset()))
    }

    pub(crate) fn decode_at(&self, cursor: &mut Cursor<'_>) -> Result<Record, DecodeError> {
        decode_record(self.id, &self.plan, cursor)
    }

    /// Decodes `count` consecutive instances starting at `offset`.
    pub fn decode_many(
        &self,
        data: &[u8],
        offset: usize,
        count: usize,
    ) -> Result<Vec<Record>, DecodeError> {
        self.decode_many_with(data, offset, count, |_, _| {})
    }

    /// Like [StructDef::decode_many], calling `observer` with each record and its absolute offset
    /// right after it is decoded.
    ///
    /// The whole batch is bounds-checked first, so the observer never sees part of a failed batch.
    /// A non-zero `count` of a zero-width struct fails with [DecodeError::InvalidCount].
    pub fn decode_many_with<F>(
        &self,
        data: &[u8],
        offset: usize,
        count: usize,
        mut observer: F,
    ) -> Result<Vec<Record>, DecodeError>
    where
        F: FnMut(&Record, usize),
    {
        if count == 0 {
            return Ok(Vec::new());
        }

        self.check_batch(data, offset, count)?;
        tracing::trace!(struct_id = %self.id, offset, count, "decoding batch");

        let mut records = Vec::with_capacity(count);
        let mut cursor = Cursor::new(data, offset)?;
        for _ in 0..count {
            let record_offset = cursor.offset();
            let record = self.decode_at(&mut cursor)?;
            observer(&record, record_offset);
            records.push(record);
        }

        Ok(records)
    }

    /// Decodes `count` instances across the rayon thread pool.
    ///
    /// Records come back in buffer order. There is no observer since records finish out of order.
    #[cfg(feature = "rayon")]
    pub fn par_decode_many(
        &self,
        data: &[u8],
        offset: usize,
        count: usize,
    ) -> Result<Vec<Record>, DecodeError> {
        use rayon::prelude::*;

        if count == 0 {
            return Ok(Vec::new());
        }

        self.check_batch(data, offset, count)?;
        tracing::trace!(struct_id = %self.id, offset, count, "decoding batch in parallel");

        (0..count)
            .into_par_iter()
            .map(|i| {
                self.decode_one(data, offset + i * self.byte_length)
                    .map(|(record, _)| record)
            })
            .collect()
    }

    fn check_batch(&self, data: &[u8], offset: usize, count: usize) -> Result<(), DecodeError> {
        // A zero-width struct would let `count` grow without consuming any bytes.
        if self.byte_length == 0 {
            return Err(DecodeError::InvalidCount(count));
        }
        let length = count
            .checked_mul(self.byte_length)
            .ok_or(DecodeError::InvalidCount(count))?;
        DecodeError::check_range(offset, length, data.len())
    }
}

#[cfg(test)]
mod tests {
    use crate::value::Value;

    use super::*;

    fn point() -> Arc<StructDef> {
        StructDef::define([Field::int32("x"), Field::int32("y")]).unwrap()
    }

    #[test]
    fn test_define_empty() {
        assert_eq!(
            StructDef::define(Vec::new()).unwrap_err(),
            SchemaError::NoFields
        );
    }

    #[test]
    fn test_define_bad_names() {
        assert_eq!(
            StructDef::define([Field::uint8("")]).unwrap_err(),
            SchemaError::InvalidFieldName
        );
        assert_eq!(
            StructDef::define([Field::uint8("a"), Field::skip(1), Field::int8("a")]).unwrap_err(),
            SchemaError::DuplicateFieldName("a".to_string())
        );
    }

    #[test]
    fn test_define_name_must_match_kind() {
        let unnamed = Field {
            name: None,
            kind: FieldKind::Int32,
        };
        assert_eq!(
            StructDef::define([unnamed]).unwrap_err(),
            SchemaError::InvalidFieldName
        );

        let named_pad = Field {
            name: Some("pad".to_string()),
            kind: FieldKind::Skip { length: 1 },
        };
        assert_eq!(
            StructDef::define([Field::uint8("a"), named_pad]).unwrap_err(),
            SchemaError::InvalidFieldName
        );
    }

    #[test]
    fn test_define_zero_width_array_element() {
        assert_eq!(
            StructDef::define([Field::array("e", FieldKind::String { length: 0 }, usize::MAX)])
                .unwrap_err(),
            SchemaError::InvalidArrayElement("e".to_string())
        );

        let empty = StructDef::define([Field::skip(0)]).unwrap();
        assert_eq!(
            StructDef::define([Field::array("items", &empty, 3)]).unwrap_err(),
            SchemaError::InvalidArrayElement("items".to_string())
        );
    }

    #[test]
    fn test_define_overflow() {
        let fields = [
            Field::array("a", FieldKind::Uint8, usize::MAX),
            Field::uint8("b"),
        ];
        assert_eq!(
            StructDef::define(fields).unwrap_err(),
            SchemaError::LengthOverflow
        );
    }

    #[test]
    fn test_byte_length_and_offsets() {
        let def = StructDef::define([
            Field::uint8("tag"),
            Field::skip(3),
            Field::float32("value"),
            Field::string("label", 6),
        ])
        .unwrap();

        assert_eq!(def.byte_length(), 14);
        assert_eq!(def.fields().len(), 4);
        assert_eq!(def.offset_of("tag"), Some(0));
        assert_eq!(def.offset_of("value"), Some(4));
        assert_eq!(def.offset_of("label"), Some(8));
        assert_eq!(def.offset_of("missing"), None);
    }

    #[test]
    fn test_ids_are_distinct() {
        assert_ne!(point().id(), point().id());
    }

    #[test]
    fn test_decode_primitives() {
        let def = StructDef::define([
            Field::int8("a"),
            Field::uint8("b"),
            Field::int16("c"),
            Field::uint16("d"),
            Field::uint32("e"),
            Field::float64("f"),
        ])
        .unwrap();

        let mut data = vec![0x80, 0xff, 0xfe, 0xff, 0x10, 0x27, 0x78, 0x56, 0x34, 0x12];
        data.extend_from_slice(&0.5f64.to_le_bytes());

        let (record, next) = def.decode_one(&data, 0).unwrap();
        assert_eq!(next, 18);
        assert_eq!(record.struct_id(), def.id());
        assert_eq!(record.get("a"), Some(&Value::I8(-128)));
        assert_eq!(record.get("b"), Some(&Value::U8(255)));
        assert_eq!(record.get("c"), Some(&Value::I16(-2)));
        assert_eq!(record.get("d"), Some(&Value::U16(10000)));
        assert_eq!(record.get("e"), Some(&Value::U32(0x12345678)));
        assert_eq!(record.get("f"), Some(&Value::F64(0.5)));
    }

    #[test]
    fn test_skip_consumes_bytes() {
        let def = StructDef::define([Field::uint8("a"), Field::skip(2), Field::uint8("b")]).unwrap();
        let (record, next) = def.decode_one(&[1, 9, 9, 2], 0).unwrap();

        assert_eq!(next, 4);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("b"), Some(&Value::U8(2)));
    }

    #[test]
    fn test_string_truncation() {
        let def = StructDef::define([Field::string("name", 8), Field::uint8("after")]).unwrap();
        let (record, _) = def.decode_one(&[72, 73, 0, 88, 88, 88, 88, 88, 7], 0).unwrap();

        assert_eq!(record.get("name"), Some(&Value::String("HI".to_string())));
        assert_eq!(record.get("after"), Some(&Value::U8(7)));
    }

    #[test]
    fn test_nested_struct() {
        let point = point();
        let line = StructDef::define([Field::nested("a", &point), Field::nested("b", &point)]).unwrap();
        assert_eq!(point.byte_length(), 8);
        assert_eq!(line.byte_length(), 16);

        let data = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0];
        let (record, next) = line.decode_one(&data, 0).unwrap();
        assert_eq!(next, 16);

        let a = record.get("a").and_then(Value::as_record).unwrap();
        let b = record.get("b").and_then(Value::as_record).unwrap();
        assert_eq!(a.struct_id(), point.id());
        assert_eq!(a.get("x"), Some(&Value::I32(1)));
        assert_eq!(a.get("y"), Some(&Value::I32(2)));
        assert_eq!(b.get("x"), Some(&Value::I32(3)));
        assert_eq!(b.get("y"), Some(&Value::I32(4)));
    }

    #[test]
    fn test_array_of_structs() {
        let point = point();
        let polygon = StructDef::define([Field::uint8("n"), Field::array("points", &point, 2)]).unwrap();
        assert_eq!(polygon.byte_length(), 17);

        let data = [2, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0];
        let (record, _) = polygon.decode_one(&data, 0).unwrap();
        let points = record.get("points").and_then(Value::as_array).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].as_record().unwrap().get("x"), Some(&Value::I32(3)));
    }

    #[test]
    fn test_array_of_primitives() {
        let def = StructDef::define([Field::array("v", FieldKind::Uint16, 3)]).unwrap();
        let (record, _) = def.decode_one(&[1, 0, 2, 0, 3, 0], 0).unwrap();

        assert_eq!(
            record.get("v"),
            Some(&Value::Array(vec![Value::U16(1), Value::U16(2), Value::U16(3)]))
        );
    }

    #[test]
    fn test_decode_out_of_bounds() {
        let def = point();
        assert_eq!(
            def.decode_one(&[0; 4], 0).unwrap_err(),
            DecodeError::OutOfBounds {
                offset: 0,
                length: 8,
                available: 4
            }
        );
        assert!(def.decode_one(&[0; 8], 1).is_err());
        assert!(def.decode_one(&[0; 8], usize::MAX).is_err());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let def = point();
        let data = [5, 0, 0, 0, 6, 0, 0, 0];
        assert_eq!(def.decode_one(&data, 0), def.decode_one(&data, 0));
    }

    #[test]
    fn test_decode_many_with_observer() {
        let def = StructDef::define([Field::uint16("v")]).unwrap();
        let data = [0xaa, 1, 0, 2, 0, 3, 0];
        let mut seen = Vec::new();

        let records = def
            .decode_many_with(&data, 1, 3, |record, offset| {
                seen.push((offset, record.get("v").cloned()));
            })
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].get("v"), Some(&Value::U16(3)));
        assert_eq!(
            seen,
            vec![
                (1, Some(Value::U16(1))),
                (3, Some(Value::U16(2))),
                (5, Some(Value::U16(3)))
            ]
        );
    }

    #[test]
    fn test_decode_many_zero_count() {
        let def = point();
        let mut calls = 0;
        let records = def
            .decode_many_with(&[], 100, 0, |_, _| calls += 1)
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_decode_many_fails_before_observer() {
        let def = point();
        let mut calls = 0;
        let result = def.decode_many_with(&[0; 20], 0, 3, |_, _| calls += 1);

        assert_eq!(
            result.unwrap_err(),
            DecodeError::OutOfBounds {
                offset: 0,
                length: 24,
                available: 20
            }
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_decode_many_invalid_count() {
        let def = point();
        assert_eq!(
            def.decode_many(&[0; 8], 0, usize::MAX).unwrap_err(),
            DecodeError::InvalidCount(usize::MAX)
        );
    }

    #[test]
    fn test_decode_many_zero_width_struct() {
        let def = StructDef::define([Field::skip(0)]).unwrap();
        assert_eq!(def.byte_length(), 0);
        assert_eq!(def.decode_one(&[], 0).unwrap().1, 0);

        assert_eq!(
            def.decode_many(&[], 0, usize::MAX).unwrap_err(),
            DecodeError::InvalidCount(usize::MAX)
        );
        assert_eq!(def.decode_many(&[], 0, 0).unwrap(), Vec::new());
    }

    #[test]
    fn test_nan_records_compare_by_bits() {
        let def = StructDef::define([Field::float32("f")]).unwrap();
        let data = f32::NAN.to_le_bytes();
        let (a, _) = def.decode_one(&data, 0).unwrap();
        let (b, _) = def.decode_one(&data, 0).unwrap();

        assert_ne!(a, b);
        match (a.get("f"), b.get("f")) {
            (Some(Value::F32(x)), Some(Value::F32(y))) => assert_eq!(x.to_bits(), y.to_bits()),
            other => panic!("expected two f32 values, got {other:?}"),
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_decode_many_matches_sequential() {
        let def = point();
        let data: Vec<u8> = (0..=255).collect();
        let count = data.len() / def.byte_length();

        assert_eq!(
            def.par_decode_many(&data, 0, count).unwrap(),
            def.decode_many(&data, 0, count).unwrap()
        );
        assert!(def.par_decode_many(&data, 1, count).is_err());
    }
}

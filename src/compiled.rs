//! Decode plans: fields resolved once into offset-annotated decode steps.

use std::sync::Arc;

use crate::{
    errors::{DecodeError, SchemaError},
    field::{Field, FieldKind},
    primitive::{Cursor, Primitive, latin1_until_nul},
    schema::StructDef,
    value::{Record, StructId, Value},
};

type ReadFn = fn(&mut Cursor<'_>) -> Result<Value, DecodeError>;

fn read_value<T: Primitive>(cursor: &mut Cursor<'_>) -> Result<Value, DecodeError> {
    cursor.read::<T>().map(T::into_value)
}

/// A single decode step.
#[derive(Debug, Clone)]
pub enum Op {
    Primitive(ReadFn),
    String { length: usize },
    Array { element: Box<Op>, count: usize },
    Struct(Arc<StructDef>),
    Skip(usize),
}

impl Op {
    fn compile(kind: &FieldKind, name: &str) -> Result<Self, SchemaError> {
        Ok(match kind {
            FieldKind::Int8 => Op::Primitive(read_value::<i8>),
            FieldKind::Uint8 => Op::Primitive(read_value::<u8>),
            FieldKind::Int16 => Op::Primitive(read_value::<i16>),
            FieldKind::Uint16 => Op::Primitive(read_value::<u16>),
            FieldKind::Int32 => Op::Primitive(read_value::<i32>),
            FieldKind::Uint32 => Op::Primitive(read_value::<u32>),
            FieldKind::Float32 => Op::Primitive(read_value::<f32>),
            FieldKind::Float64 => Op::Primitive(read_value::<f64>),
            FieldKind::String { length } => Op::String { length: *length },
            FieldKind::Array { element: kind, count } => {
                let element = Op::compile(kind, name)?;
                // Zero-width elements would let `count` grow without consuming any bytes.
                let width = kind.checked_byte_length().ok_or(SchemaError::LengthOverflow)?;
                if matches!(element, Op::Skip(_)) || width == 0 {
                    return Err(SchemaError::InvalidArrayElement(name.to_string()));
                }

                Op::Array {
                    element: Box::new(element),
                    count: *count,
                }
            }
            FieldKind::Struct(def) => Op::Struct(Arc::clone(def)),
            FieldKind::Skip { length } => Op::Skip(*length),
        })
    }

    /// Runs this step at the cursor. Skips consume their bytes and yield `None`.
    pub fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Option<Value>, DecodeError> {
        let value = match self {
            Op::Primitive(read) => read(cursor)?,
            Op::String { length } => Value::String(latin1_until_nul(cursor.take(*length)?)),
            Op::Array { element, count } => {
                let mut values = Vec::with_capacity(*count);
                for _ in 0..*count {
                    if let Some(value) = element.decode(cursor)? {
                        values.push(value);
                    }
                }
                Value::Array(values)
            }
            Op::Struct(def) => Value::Struct(def.decode_at(cursor)?),
            Op::Skip(length) => {
                cursor.skip(*length)?;
                return Ok(None);
            }
        };

        Ok(Some(value))
    }
}

/// A field with its position inside the struct and its resolved decode step.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: Option<Arc<str>>,
    /// Byte offset from the start of the struct.
    pub offset: usize,
    pub byte_length: usize,
    pub op: Op,
}

impl CompiledField {
    pub(crate) fn compile(field: &Field, offset: usize) -> Result<Self, SchemaError> {
        let name = field.name.as_deref().unwrap_or_default();
        let byte_length = field
            .kind
            .checked_byte_length()
            .ok_or(SchemaError::LengthOverflow)?;

        Ok(CompiledField {
            name: field.name.as_deref().map(Arc::from),
            offset,
            byte_length,
            op: Op::compile(&field.kind, name)?,
        })
    }
}

/// Decodes one record by running `plan` in order from the cursor.
pub(crate) fn decode_record(
    struct_id: StructId,
    plan: &[CompiledField],
    cursor: &mut Cursor<'_>,
) -> Result<Record, DecodeError> {
    let mut record = Record::with_capacity(struct_id, plan.len());

    for field in plan {
        let value = field.op.decode(cursor)?;
        if let (Some(name), Some(value)) = (&field.name, value) {
            record.push(name, value);
        }
    }

    Ok(record)
}

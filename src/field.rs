//! Field descriptors used to build a [crate::schema::StructDef].

use std::sync::Arc;

use crate::{schema::StructDef, value::Value};

/// One element of a struct layout. Skip fields have no name and produce no output.
#[derive(Debug, Clone)]
pub struct Field {
    /// Key in the decoded record; `None` only for skip fields.
    pub name: Option<String>,
    /// How the field's bytes are interpreted.
    pub kind: FieldKind,
}

/// The decode behavior of a field, independent of its name.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Little-endian signed 16-bit integer.
    Int16,
    /// Little-endian unsigned 16-bit integer.
    Uint16,
    /// Little-endian signed 32-bit integer.
    Int32,
    /// Little-endian unsigned 32-bit integer.
    Uint32,
    /// Little-endian IEEE 754 single-precision float.
    Float32,
    /// Little-endian IEEE 754 double-precision float.
    Float64,
    /// Fixed-length string, truncated at the first zero byte on decode.
    String { length: usize },
    /// `count` contiguous elements of `element`.
    Array { element: Box<FieldKind>, count: usize },
    /// A nested struct, shared with every other use of the same definition.
    Struct(Arc<StructDef>),
    /// Padding that is consumed and discarded.
    Skip { length: usize },
}

impl FieldKind {
    /// Number of bytes this kind consumes.
    ///
    /// Arrays saturate on overflow; [StructDef::define] rejects such layouts.
    pub fn byte_length(&self) -> usize {
        match self {
            FieldKind::Int8 | FieldKind::Uint8 => 1,
            FieldKind::Int16 | FieldKind::Uint16 => 2,
            FieldKind::Int32 | FieldKind::Uint32 | FieldKind::Float32 => 4,
            FieldKind::Float64 => 8,
            FieldKind::String { length } | FieldKind::Skip { length } => *length,
            FieldKind::Array { element, count } => {
                element.byte_length().saturating_mul(*count)
            }
            FieldKind::Struct(def) => def.byte_length(),
        }
    }

    /// Like [FieldKind::byte_length], but `None` when an array length overflows.
    pub fn checked_byte_length(&self) -> Option<usize> {
        match self {
            FieldKind::Array { element, count } => element.checked_byte_length()?.checked_mul(*count),
            _ => Some(self.byte_length()),
        }
    }

    /// Value a record slot holds before decoding, if the kind has one.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            FieldKind::Int8 => Some(Value::I8(0)),
            FieldKind::Uint8 => Some(Value::U8(0)),
            FieldKind::Int16 => Some(Value::I16(0)),
            FieldKind::Uint16 => Some(Value::U16(0)),
            FieldKind::Int32 => Some(Value::I32(0)),
            FieldKind::Uint32 => Some(Value::U32(0)),
            FieldKind::Float32 => Some(Value::F32(0.0)),
            FieldKind::Float64 => Some(Value::F64(0.0)),
            FieldKind::String { .. } => Some(Value::String(String::new())),
            FieldKind::Array { .. } | FieldKind::Struct(_) | FieldKind::Skip { .. } => None,
        }
    }
}

impl From<Field> for FieldKind {
    fn from(field: Field) -> Self {
        field.kind
    }
}

impl From<Arc<StructDef>> for FieldKind {
    fn from(def: Arc<StructDef>) -> Self {
        FieldKind::Struct(def)
    }
}

impl From<&Arc<StructDef>> for FieldKind {
    fn from(def: &Arc<StructDef>) -> Self {
        FieldKind::Struct(Arc::clone(def))
    }
}

impl Field {
    fn named(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: Some(name.into()),
            kind,
        }
    }

    /// A signed 8-bit integer field.
    pub fn int8(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Int8)
    }

    /// An unsigned 8-bit integer field.
    pub fn uint8(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Uint8)
    }

    /// A signed 16-bit integer field.
    pub fn int16(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Int16)
    }

    /// An unsigned 16-bit integer field.
    pub fn uint16(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Uint16)
    }

    /// A signed 32-bit integer field.
    pub fn int32(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Int32)
    }

    /// An unsigned 32-bit integer field.
    pub fn uint32(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Uint32)
    }

    /// A 32-bit float field.
    pub fn float32(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Float32)
    }

    /// A 64-bit float field.
    pub fn float64(name: impl Into<String>) -> Self {
        Self::named(name, FieldKind::Float64)
    }

    /// A string of exactly `length` bytes.
    pub fn string(name: impl Into<String>, length: usize) -> Self {
        Self::named(name, FieldKind::String { length })
    }

    /// `count` elements of `element`, which may be a primitive kind, another field, or a struct.
    pub fn array(name: impl Into<String>, element: impl Into<FieldKind>, count: usize) -> Self {
        Self::named(
            name,
            FieldKind::Array {
                element: Box::new(element.into()),
                count,
            },
        )
    }

    /// A nested struct; `def` is shared, not copied.
    pub fn nested(name: impl Into<String>, def: &Arc<StructDef>) -> Self {
        Self::named(name, FieldKind::Struct(Arc::clone(def)))
    }

    /// `length` bytes of padding.
    pub fn skip(length: usize) -> Self {
        Field {
            name: None,
            kind: FieldKind::Skip { length },
        }
    }

    /// Number of bytes this field consumes.
    pub fn byte_length(&self) -> usize {
        self.kind.byte_length()
    }

    /// See [FieldKind::default_value].
    pub fn default_value(&self) -> Option<Value> {
        self.kind.default_value()
    }
}

//! Error types for schema definition and record decoding.

/// Errors produced while building a [crate::schema::StructDef].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A struct was defined with zero fields.
    #[error("struct definition needs at least one field")]
    NoFields,
    /// A value field has a missing or empty name, or a skip field has a name.
    #[error("value fields need a non-empty name and skip fields none")]
    InvalidFieldName,
    /// Two fields of one struct share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateFieldName(String),
    /// A length or count is negative or not an integer.
    #[error("invalid length or count for '{0}'")]
    InvalidLength(String),
    /// An array element is padding or zero bytes wide.
    #[error("array '{0}' needs elements that produce a value and consume bytes")]
    InvalidArrayElement(String),
    /// The total byte length does not fit in `usize`.
    #[error("struct byte length overflows")]
    LengthOverflow,
    /// Two structs in one schema document share a name.
    #[error("duplicate struct name '{0}'")]
    DuplicateStructName(String),
    /// A field refers to a struct name that is not defined.
    #[error("unknown struct '{0}'")]
    UnknownStruct(String),
    /// A field uses a type name that is neither a primitive nor a struct.
    #[error("unknown type '{0}'")]
    UnknownType(String),
    /// A struct contains itself, directly or through other structs.
    #[error("struct '{0}' contains itself")]
    RecursiveStruct(String),
    /// The schema document could not be parsed.
    #[error("invalid schema document: {0}")]
    Json(String),
}

/// Errors produced when decoding records from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The requested byte range runs past the end of the buffer.
    #[error("{length} bytes at offset {offset} exceed buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },
    /// The record count cannot describe a byte range, or the struct is zero bytes wide.
    #[error("record count {0} is out of range")]
    InvalidCount(usize),
    /// A NUL-terminated string has no terminator before the end of the buffer.
    #[error("unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },
}

impl DecodeError {
    /// Fails with [DecodeError::OutOfBounds] unless `offset..offset + length` lies in a buffer of `available` bytes.
    pub fn check_range(offset: usize, length: usize, available: usize) -> Result<(), Self> {
        match offset.checked_add(length) {
            Some(end) if end <= available => Ok(()),
            _ => Err(DecodeError::OutOfBounds {
                offset,
                length,
                available,
            }),
        }
    }
}

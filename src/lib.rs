//! # bytecraft
//!
//! Decoding of fixed-layout binary records described by declarative struct schemas.
//!
//! Describe a C-style struct as an ordered list of [field::Field]s (little-endian primitives,
//! fixed-length strings, fixed-length arrays, nested structs and padding), then decode one or many
//! instances from a byte slice at a given offset.
//!
//! ## Example
//!
//! ```
//! use bytecraft::field::Field;
//! use bytecraft::schema::StructDef;
//! use bytecraft::value::Value;
//!
//! let point = StructDef::define([Field::int32("x"), Field::int32("y")]).unwrap();
//! let line = StructDef::define([Field::nested("a", &point), Field::nested("b", &point)]).unwrap();
//! assert_eq!(line.byte_length(), 16);
//!
//! let data = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0];
//! let (record, next) = line.decode_one(&data, 0).unwrap();
//! assert_eq!(next, 16);
//!
//! let b = record.get("b").and_then(Value::as_record).unwrap();
//! assert_eq!(b.get("x"), Some(&Value::I32(3)));
//! ```

pub mod compiled;
pub mod errors;
pub mod field;
pub mod primitive;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;

pub use errors::{DecodeError, SchemaError};
pub use field::{Field, FieldKind};
pub use schema::StructDef;
pub use value::{Record, StructId, Value};

//! Decoded values and records.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

static NEXT_STRUCT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [crate::schema::StructDef].
///
/// Ids are handed out in definition order and are not stable across runs, so they must not be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructId(u64);

impl StructId {
    pub(crate) fn next() -> Self {
        StructId(NEXT_STRUCT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "struct_id_{}", self.0)
    }
}

/// A value decoded from one field.
///
/// Float variants compare with IEEE 754 semantics, so a `NaN` value is not equal to itself. Compare
/// `f32::to_bits` / `f64::to_bits` when bit-identical decodes must match.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    String(String),
    Array(Vec<Value>),
    Struct(Record),
}

impl Value {
    /// Widens any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::U8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Widens any numeric variant to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(record) => Some(record),
            _ => None,
        }
    }
}

/// One decoded struct instance: named values in declaration order, tagged with the id of the
/// definition that produced it.
///
/// Equality is field-wise [Value] equality, so a record holding a `NaN` float is not equal to
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    struct_id: StructId,
    fields: Vec<(Arc<str>, Value)>,
}

impl Record {
    pub(crate) fn with_capacity(struct_id: StructId, capacity: usize) -> Self {
        Record {
            struct_id,
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &Arc<str>, value: Value) {
        self.fields.push((Arc::clone(name), value));
    }

    pub fn struct_id(&self) -> StructId {
        self.struct_id
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| &**field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(values) => serializer.collect_seq(values),
            Value::Struct(record) => record.serialize(serializer),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_ids_are_unique() {
        let a = StructId::next();
        let b = StructId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_record_get_keeps_order() {
        let mut record = Record::with_capacity(StructId::next(), 2);
        record.push(&Arc::from("b"), Value::U8(2));
        record.push(&Arc::from("a"), Value::U8(1));

        assert_eq!(record.get("a"), Some(&Value::U8(1)));
        assert_eq!(record.get("missing"), None);
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(Value::I16(-3).as_i64(), Some(-3));
        assert_eq!(Value::U32(u32::MAX).as_i64(), Some(u32::MAX as i64));
        assert_eq!(Value::F32(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("x".to_string()).as_f64(), None);
    }
}

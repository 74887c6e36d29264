//! JSON-deserializable schema documents.
//!
//! A document lists named structs whose fields refer to primitives or to other structs by name.
//! [Registry::compile] resolves those references and builds every struct as a
//! [crate::schema::StructDef].
//!
//! ```json
//! {
//!   "structs": [
//!     { "name": "Point", "fields": [
//!         { "type": "int32", "name": "x" },
//!         { "type": "int32", "name": "y" } ] },
//!     { "name": "Shape", "fields": [
//!         { "type": "string", "name": "label", "length": 8 },
//!         { "type": "skip", "length": 4 },
//!         { "type": "array", "name": "points", "element": "Point", "count": 3 } ] }
//!   ]
//! }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::{
    errors::SchemaError,
    field::{Field, FieldKind},
    schema::StructDef,
};

/// Top-level document: every struct it defines.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    pub structs: Vec<StructDefDef>,
}

/// One named struct.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StructDefDef {
    pub name: String,
    /// Fields in decode order.
    pub fields: Vec<FieldDef>,
}

/// One field, tagged by `"type"`. Lengths and counts must be non-negative integers.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDef {
    Int8 { name: String },
    Uint8 { name: String },
    Int16 { name: String },
    Uint16 { name: String },
    Int32 { name: String },
    Uint32 { name: String },
    Float32 { name: String },
    Float64 { name: String },
    String { name: String, length: Number },
    Array {
        name: String,
        element: TypeRef,
        count: Number,
    },
    Struct {
        name: String,
        #[serde(rename = "struct")]
        target: String,
    },
    Skip { length: Number },
}

/// Element type of an array: a primitive or struct name, a string, or another array.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum TypeRef {
    Named(String),
    String { string: Number },
    Array { element: Box<TypeRef>, count: Number },
}

fn primitive(name: &str) -> Option<FieldKind> {
    Some(match name {
        "int8" => FieldKind::Int8,
        "uint8" => FieldKind::Uint8,
        "int16" => FieldKind::Int16,
        "uint16" => FieldKind::Uint16,
        "int32" => FieldKind::Int32,
        "uint32" => FieldKind::Uint32,
        "float32" => FieldKind::Float32,
        "float64" => FieldKind::Float64,
        _ => return None,
    })
}

fn length_of(number: &Number, context: &str) -> Result<usize, SchemaError> {
    number
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SchemaError::InvalidLength(context.to_string()))
}

/// Struct definitions built from a [SchemaDef], looked up by name.
#[derive(Debug, Default)]
pub struct Registry {
    structs: HashMap<String, Arc<StructDef>>,
    order: Vec<String>,
}

impl Registry {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let def: SchemaDef =
            serde_json::from_str(json).map_err(|e| SchemaError::Json(e.to_string()))?;
        Self::compile(&def)
    }

    /// Builds every struct in `def`, nested ones first. Fails on unknown names, cycles, and
    /// invalid lengths.
    pub fn compile(def: &SchemaDef) -> Result<Self, SchemaError> {
        let mut defs = HashMap::with_capacity(def.structs.len());
        for s in &def.structs {
            if defs.insert(s.name.as_str(), s).is_some() {
                return Err(SchemaError::DuplicateStructName(s.name.clone()));
            }
        }

        let mut builder = Builder {
            defs,
            built: HashMap::new(),
            visiting: HashSet::new(),
        };
        for s in &def.structs {
            builder.build(&s.name)?;
        }

        tracing::debug!(structs = def.structs.len(), "compiled schema registry");

        Ok(Registry {
            structs: builder.built,
            order: def.structs.iter().map(|s| s.name.clone()).collect(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<StructDef>> {
        self.structs.get(name)
    }

    /// Struct names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct Builder<'a> {
    defs: HashMap<&'a str, &'a StructDefDef>,
    built: HashMap<String, Arc<StructDef>>,
    visiting: HashSet<&'a str>,
}

impl<'a> Builder<'a> {
    fn build(&mut self, name: &'a str) -> Result<Arc<StructDef>, SchemaError> {
        if let Some(built) = self.built.get(name) {
            return Ok(Arc::clone(built));
        }

        let def = *self
            .defs
            .get(name)
            .ok_or_else(|| SchemaError::UnknownStruct(name.to_string()))?;
        if !self.visiting.insert(name) {
            return Err(SchemaError::RecursiveStruct(name.to_string()));
        }

        let fields = def
            .fields
            .iter()
            .map(|field| self.field(field))
            .collect::<Result<Vec<_>, _>>()?;
        self.visiting.remove(name);

        let built = StructDef::define(fields)?;
        self.built.insert(name.to_string(), Arc::clone(&built));
        Ok(built)
    }

    fn field(&mut self, def: &'a FieldDef) -> Result<Field, SchemaError> {
        Ok(match def {
            FieldDef::Int8 { name } => Field::int8(name),
            FieldDef::Uint8 { name } => Field::uint8(name),
            FieldDef::Int16 { name } => Field::int16(name),
            FieldDef::Uint16 { name } => Field::uint16(name),
            FieldDef::Int32 { name } => Field::int32(name),
            FieldDef::Uint32 { name } => Field::uint32(name),
            FieldDef::Float32 { name } => Field::float32(name),
            FieldDef::Float64 { name } => Field::float64(name),
            FieldDef::String { name, length } => Field::string(name, length_of(length, name)?),
            FieldDef::Array {
                name,
                element,
                count,
            } => {
                let element = self.kind(element, name)?;
                Field::array(name, element, length_of(count, name)?)
            }
            FieldDef::Struct { name, target } => Field::nested(name, &self.build(target)?),
            FieldDef::Skip { length } => Field::skip(length_of(length, "skip")?),
        })
    }

    fn kind(&mut self, ty: &'a TypeRef, context: &str) -> Result<FieldKind, SchemaError> {
        match ty {
            TypeRef::Named(name) => match primitive(name) {
                Some(kind) => Ok(kind),
                None if self.defs.contains_key(name.as_str()) => {
                    Ok(FieldKind::Struct(self.build(name)?))
                }
                None => Err(SchemaError::UnknownType(name.clone())),
            },
            TypeRef::String { string } => Ok(FieldKind::String {
                length: length_of(string, context)?,
            }),
            TypeRef::Array { element, count } => Ok(FieldKind::Array {
                element: Box::new(self.kind(element, context)?),
                count: length_of(count, context)?,
            }),
        }
    }
}

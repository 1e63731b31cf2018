//! Serde model for the CLI's type-definition files.
//!
//! A type file declares records in order; fields map a name to a type
//! expression, either the bare shorthand or `{"type": ..., "default": ...}`.
//!
//! ```json
//! {
//!   "records": {
//!     "Point": { "x": "int", "y": "int" },
//!     "Line":  { "from": "Point", "to": "Point" },
//!     "Config": {
//!       "codes": { "type": {"list": "int"}, "default": [101, 345] },
//!       "tag": {"union": ["int", "str"]}
//!     }
//!   }
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::json_bridge;
use crate::registry::Registry;

#[derive(Debug, Deserialize)]
pub struct TypeFile {
    pub records: IndexMap<String, IndexMap<String, FieldSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Plain(TypeExpr),
    Full {
        #[serde(rename = "type")]
        ty: TypeExpr,
        #[serde(default)]
        default: Option<serde_json::Value>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    /// `"int"`, `"str"`, ... or a record name.
    Name(String),
    Compound(Compound),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compound {
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Union(Vec<TypeExpr>),
    Record(String),
}

impl TypeExpr {
    pub fn to_descriptor(&self) -> TypeDescriptor {
        match self {
            TypeExpr::Name(name) => match name.as_str() {
                "int" => TypeDescriptor::int(),
                "float" => TypeDescriptor::float(),
                "str" => TypeDescriptor::str(),
                "bool" => TypeDescriptor::bool(),
                "none" => TypeDescriptor::None,
                other => TypeDescriptor::named(other),
            },
            TypeExpr::Compound(c) => match c {
                Compound::List(item) => TypeDescriptor::list(item.to_descriptor()),
                Compound::Set(item) => TypeDescriptor::set(item.to_descriptor()),
                Compound::Map(key, val) => {
                    TypeDescriptor::map(key.to_descriptor(), val.to_descriptor())
                }
                Compound::Tuple(items) => {
                    TypeDescriptor::tuple(items.iter().map(TypeExpr::to_descriptor))
                }
                Compound::Union(variants) => {
                    TypeDescriptor::union(variants.iter().map(TypeExpr::to_descriptor))
                }
                Compound::Record(name) => TypeDescriptor::named(name.as_str()),
            },
        }
    }
}

/// Register every record in file order. Field types may reference records
/// declared later (resolution is lazy), but a `default` value may only
/// reference records already declared above it.
pub fn load(reg: &mut Registry, file: &TypeFile) -> anyhow::Result<()> {
    for (name, fields) in &file.records {
        let mut descriptors = Vec::with_capacity(fields.len());
        for (field_name, spec) in fields {
            let (expr, default) = match spec {
                FieldSpec::Plain(expr) => (expr, None),
                FieldSpec::Full { ty, default } => (ty, default.as_ref()),
            };
            let ty = expr.to_descriptor();
            let mut fd = FieldDescriptor::new(field_name.clone(), ty.clone());
            if let Some(json) = default {
                let value = json_bridge::from_json(reg, &ty, json).with_context(|| {
                    format!("default for field `{field_name}` of `{name}`")
                })?;
                fd = fd.with_default(value);
            }
            descriptors.push(fd);
        }
        reg.register(name.clone(), descriptors)
            .with_context(|| format!("registering `{name}`"))?;
    }
    Ok(())
}

pub fn load_path(reg: &mut Registry, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: TypeFile = serde_json::from_str(&source)
        .with_context(|| format!("parsing {} as a type file", path.display()))?;
    load(reg, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn shorthand_and_compound_forms_parse() {
        let source = r#"{
            "records": {
                "Point": { "x": "int", "y": "int" },
                "Config": {
                    "date": "str",
                    "codes": { "type": {"list": "int"}, "default": [101, 345] },
                    "lookup": {"map": ["int", "str"]},
                    "tag": {"union": ["int", "str", "none"]},
                    "origin": {"record": "Point"}
                }
            }
        }"#;
        let file: TypeFile = serde_json::from_str(source).unwrap();
        let mut reg = Registry::new();
        load(&mut reg, &file).unwrap();

        let config = reg.descriptor("Config").unwrap();
        assert_eq!(config.fields.len(), 5);
        assert_eq!(
            config.fields[1].default,
            Some(Value::List(vec![Value::Int(101), Value::Int(345)]))
        );
        assert_eq!(
            config.fields[2].ty,
            TypeDescriptor::map(TypeDescriptor::int(), TypeDescriptor::str())
        );
        assert_eq!(config.fields[4].ty, TypeDescriptor::named("Point"));
    }

    #[test]
    fn defaults_may_use_previously_declared_records() {
        let source = r#"{
            "records": {
                "Point": { "x": "int", "y": "int" },
                "Config": {
                    "origin": { "type": "Point", "default": {"x": 0, "y": 0} }
                }
            }
        }"#;
        let file: TypeFile = serde_json::from_str(source).unwrap();
        let mut reg = Registry::new();
        load(&mut reg, &file).unwrap();
        assert!(reg.descriptor("Config").unwrap().fields[0].default.is_some());
    }

    #[test]
    fn registration_errors_surface_with_record_context() {
        let source = r#"{ "records": { "Bad": { "encode": "int" } } }"#;
        let file: TypeFile = serde_json::from_str(source).unwrap();
        let mut reg = Registry::new();
        let err = load(&mut reg, &file).unwrap_err();
        assert!(format!("{err:#}").contains("Bad"));
    }
}

//! Descriptor-directed conversion between JSON and codec values.
//!
//! The CLI speaks JSON on the value side (encode input, decode output);
//! the engine speaks `Value`. Union payloads are explicitly tagged by
//! shape name (`{"int": 5}`) and maps with non-string keys are `[key,
//! value]` pair arrays, since JSON object keys are always strings.

use std::collections::BTreeSet;

use anyhow::{bail, Context};

use crate::descriptor::{Scalar, TypeDescriptor};
use crate::registry::Registry;
use crate::value::Value;

pub fn from_json(
    reg: &Registry,
    ty: &TypeDescriptor,
    json: &serde_json::Value,
) -> anyhow::Result<Value> {
    match ty {
        TypeDescriptor::Primitive(Scalar::Int) => json
            .as_i64()
            .map(Value::Int)
            .with_context(|| format!("expected an integer, got {json}")),
        TypeDescriptor::Primitive(Scalar::Float) => json
            .as_f64()
            .map(Value::float)
            .with_context(|| format!("expected a number, got {json}")),
        TypeDescriptor::Primitive(Scalar::Str) => json
            .as_str()
            .map(Value::str)
            .with_context(|| format!("expected a string, got {json}")),
        TypeDescriptor::Primitive(Scalar::Bool) => json
            .as_bool()
            .map(Value::Bool)
            .with_context(|| format!("expected a boolean, got {json}")),
        TypeDescriptor::None => match json {
            serde_json::Value::Null => Ok(Value::None),
            other => bail!("expected null, got {other}"),
        },
        TypeDescriptor::List(item) => {
            let arr = as_array(json)?;
            arr.iter()
                .enumerate()
                .map(|(i, j)| from_json(reg, item, j).with_context(|| format!("list item {i}")))
                .collect::<anyhow::Result<Vec<_>>>()
                .map(Value::List)
        }
        TypeDescriptor::Set(item) => {
            let arr = as_array(json)?;
            let mut set = BTreeSet::new();
            for (i, j) in arr.iter().enumerate() {
                let v = from_json(reg, item, j).with_context(|| format!("set item {i}"))?;
                if !set.insert(v) {
                    bail!("duplicate set item at index {i}");
                }
            }
            Ok(Value::Set(set))
        }
        TypeDescriptor::Tuple(items) => {
            let arr = as_array(json)?;
            if arr.len() != items.len() {
                bail!("expected a {}-tuple, got {} elements", items.len(), arr.len());
            }
            items
                .iter()
                .zip(arr)
                .enumerate()
                .map(|(i, (t, j))| {
                    from_json(reg, t, j).with_context(|| format!("tuple item {i}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()
                .map(Value::Tuple)
        }
        TypeDescriptor::Map(key, val) => {
            // string-keyed maps read naturally as JSON objects
            if matches!(**key, TypeDescriptor::Primitive(Scalar::Str)) {
                if let Some(obj) = json.as_object() {
                    let mut entries = Vec::with_capacity(obj.len());
                    for (k, j) in obj {
                        let v = from_json(reg, val, j).with_context(|| format!("map key {k:?}"))?;
                        entries.push((Value::str(k.clone()), v));
                    }
                    return Ok(Value::Map(entries));
                }
            }
            let arr = as_array(json)?;
            let mut entries = Vec::with_capacity(arr.len());
            for (i, pair) in arr.iter().enumerate() {
                let pair = pair
                    .as_array()
                    .filter(|p| p.len() == 2)
                    .with_context(|| format!("map entry {i} must be a [key, value] pair"))?;
                let k = from_json(reg, key, &pair[0]).with_context(|| format!("map entry {i} key"))?;
                let v = from_json(reg, val, &pair[1]).with_context(|| format!("map entry {i} value"))?;
                entries.push((k, v));
            }
            Ok(Value::Map(entries))
        }
        TypeDescriptor::Union(variants) => {
            let obj = json
                .as_object()
                .filter(|o| o.len() == 1)
                .with_context(|| {
                    format!("union values are single-key objects like {{\"int\": 5}}, got {json}")
                })?;
            let (tag, payload) = obj.iter().next().context("union object is empty")?;
            let variant = variants
                .iter()
                .find(|v| v.shape_name() == tag)
                .with_context(|| format!("`{tag}` is not a variant of this union"))?;
            from_json(reg, variant, payload).with_context(|| format!("union variant `{tag}`"))
        }
        TypeDescriptor::Record(r) => record_from_json(reg, &r.name, json),
        TypeDescriptor::Named(name) => record_from_json(reg, name, json),
    }
}

fn record_from_json(
    reg: &Registry,
    name: &str,
    json: &serde_json::Value,
) -> anyhow::Result<Value> {
    let Some(desc) = reg.descriptor(name) else {
        if reg.contains(name) {
            bail!("`{name}` uses a manual codec; its values cannot be built from JSON");
        }
        bail!("record `{name}` is not registered");
    };
    let obj = json
        .as_object()
        .with_context(|| format!("expected an object for record `{name}`, got {json}"))?;
    let mut fields = Vec::with_capacity(desc.fields.len());
    for field in &desc.fields {
        let j = obj
            .get(&field.name)
            .with_context(|| format!("record `{name}` is missing field `{}`", field.name))?;
        let v = from_json(reg, &field.ty, j)
            .with_context(|| format!("field `{}` of `{name}`", field.name))?;
        fields.push((field.name.clone(), v));
    }
    Ok(Value::Record {
        name: name.to_string(),
        fields,
    })
}

fn as_array(json: &serde_json::Value) -> anyhow::Result<&Vec<serde_json::Value>> {
    json.as_array()
        .with_context(|| format!("expected an array, got {json}"))
}

pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(f.0)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::from(s.as_str()),
        Value::Bool(b) => serde_json::Value::from(*b),
        Value::None => serde_json::Value::Null,
        Value::List(items) | Value::Tuple(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect())
        }
        Value::Set(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => {
            let all_str_keys = entries.iter().all(|(k, _)| matches!(k, Value::Str(_)));
            if all_str_keys {
                let mut obj = serde_json::Map::new();
                for (k, v) in entries {
                    if let Value::Str(k) = k {
                        obj.insert(k.clone(), to_json(v));
                    }
                }
                serde_json::Value::Object(obj)
            } else {
                serde_json::Value::Array(
                    entries
                        .iter()
                        .map(|(k, v)| serde_json::Value::Array(vec![to_json(k), to_json(v)]))
                        .collect(),
                )
            }
        }
        Value::Record { fields, .. } => {
            let mut obj = serde_json::Map::new();
            for (n, v) in fields {
                obj.insert(n.clone(), to_json(v));
            }
            serde_json::Value::Object(obj)
        }
    }
}

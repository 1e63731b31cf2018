//! File IO for users: writing generated documents should be loud (they
//! overwrite), parsing should be one call from path to value.

use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use crate::document::{self, Element};
use crate::emit::{self, SchemaOptions};
use crate::registry::Registry;
use crate::value::Value;

pub fn write_document(path: impl AsRef<Path>, doc: &Element) -> anyhow::Result<()> {
    let path = path.as_ref();
    eprint!("{}...", format!("Overwriting {}", path.display()).red());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, doc.to_xml()).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("{}", "Complete!".green());
    Ok(())
}

pub fn write_schema(
    path: impl AsRef<Path>,
    reg: &Registry,
    root: &str,
    opts: &SchemaOptions,
) -> anyhow::Result<()> {
    let doc = emit::schema(reg, root, opts)?;
    write_document(path, &doc)
}

pub fn write_template(
    path: impl AsRef<Path>,
    reg: &Registry,
    root: &str,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let doc = emit::template(reg, root, name)?;
    write_document(path, &doc)
}

pub fn write_value(
    path: impl AsRef<Path>,
    reg: &Registry,
    root: &str,
    value: &Value,
    id: Option<&str>,
) -> anyhow::Result<()> {
    let doc = emit::encode_value(reg, root, value, id)?;
    write_document(path, &doc)
}

/// Read, parse, and decode one value document.
pub fn parse_file(path: impl AsRef<Path>, reg: &Registry, root: &str) -> anyhow::Result<Value> {
    let path = path.as_ref();
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = document::parse(&source)
        .with_context(|| format!("parsing {} as XML", path.display()))?;
    Ok(emit::decode_value(reg, root, &doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, TypeDescriptor};

    #[test]
    fn value_files_round_trip_through_disk() {
        let mut reg = Registry::new();
        reg.register(
            "Config",
            vec![
                FieldDescriptor::new("cores", TypeDescriptor::int()),
                FieldDescriptor::new("codes", TypeDescriptor::list(TypeDescriptor::int())),
            ],
        )
        .unwrap();
        let value = Value::record(
            "Config",
            [
                ("cores", Value::Int(48)),
                (
                    "codes",
                    Value::List(vec![Value::Int(101), Value::Int(345)]),
                ),
            ],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.xml");
        write_value(&path, &reg, "Config", &value, None).unwrap();
        let read_back = parse_file(&path, &reg, "Config").unwrap();
        assert_eq!(read_back, value);
    }

    #[test]
    fn schema_and_template_files_are_written() {
        let mut reg = Registry::new();
        reg.register(
            "Config",
            vec![FieldDescriptor::new("on", TypeDescriptor::bool())],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let xsd = dir.path().join("config.xsd");
        let tmpl = dir.path().join("config_template.xml");
        write_schema(&xsd, &reg, "Config", &SchemaOptions::default()).unwrap();
        write_template(&tmpl, &reg, "Config", None).unwrap();

        let xsd_text = std::fs::read_to_string(&xsd).unwrap();
        assert!(xsd_text.contains("xsd:schema"));
        let tmpl_text = std::fs::read_to_string(&tmpl).unwrap();
        assert!(tmpl_text.contains("Fill me with an xsd:boolean"));
    }
}

//! Minimal CLI: type file -> (schema | template | encode | decode)
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;

use crate::emit::SchemaOptions;
use crate::registry::Registry;
use crate::{document, emit, io, json_bridge, typefile};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// derive an XSD schema, an editable XML template, and an XML<->JSON value
/// codec from a JSON type-definition file
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit the XSD schema for a root type
    Schema(SchemaOut),
    /// emit a human-editable XML template for a root type
    Template(TemplateOut),
    /// encode a JSON value file as an XML document
    Encode(EncodeOut),
    /// decode XML value files back to JSON
    Decode(DecodeIn),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// JSON type-definition file declaring the records
    #[arg(long)]
    types: PathBuf,

    /// root record type name
    #[arg(long)]
    root: String,
}

#[derive(Args, Debug)]
struct SchemaOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// schema id and root element name (defaults to the root type name)
    #[arg(long)]
    id: Option<String>,

    /// extra namespace declarations as prefix=uri pairs
    #[arg(long = "ns", value_name = "PREFIX=URI")]
    namespaces: Vec<String>,

    /// schema imports as namespace=location pairs
    #[arg(long = "import", value_name = "NAMESPACE=LOCATION")]
    imports: Vec<String>,

    /// output .xsd file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TemplateOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// root element name (defaults to the root type name)
    #[arg(long)]
    name: Option<String>,

    /// output .xml file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EncodeOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// JSON file holding the value to encode
    #[arg(long)]
    value: PathBuf,

    /// root element name (defaults to the root type name)
    #[arg(long)]
    id: Option<String>,

    /// output .xml file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeIn {
    #[command(flatten)]
    type_settings: TypeSettings,

    /// one or more XML value files; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSettings {
    fn load(&self) -> anyhow::Result<Registry> {
        let mut reg = Registry::new();
        typefile::load_path(&mut reg, &self.types)?;
        if !reg.contains(&self.root) {
            anyhow::bail!(
                "root type `{}` is not declared in {}",
                self.root,
                self.types.display()
            );
        }
        Ok(reg)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let reg = target.type_settings.load()?;
                let opts = SchemaOptions {
                    id: target.id.clone(),
                    namespaces: parse_pairs(&target.namespaces, "--ns")?,
                    imports: parse_pairs(&target.imports, "--import")?,
                };
                let doc = emit::schema(&reg, &target.type_settings.root, &opts)?;
                write_or_print(target.out.as_deref(), &doc)
            }
            Command::Template(target) => {
                let reg = target.type_settings.load()?;
                let doc = emit::template(
                    &reg,
                    &target.type_settings.root,
                    target.name.as_deref(),
                )?;
                write_or_print(target.out.as_deref(), &doc)
            }
            Command::Encode(target) => {
                let reg = target.type_settings.load()?;
                let source = std::fs::read_to_string(&target.value)
                    .with_context(|| format!("reading {}", target.value.display()))?;
                let json: serde_json::Value = serde_json::from_str(&source)
                    .with_context(|| format!("parsing {}", target.value.display()))?;
                let ty =
                    crate::descriptor::TypeDescriptor::named(target.type_settings.root.as_str());
                let value = json_bridge::from_json(&reg, &ty, &json)?;
                let doc = emit::encode_value(
                    &reg,
                    &target.type_settings.root,
                    &value,
                    target.id.as_deref(),
                )?;
                write_or_print(target.out.as_deref(), &doc)
            }
            Command::Decode(target) => {
                let reg = target.type_settings.load()?;
                let paths = resolve_file_path_patterns(&target.input)?;
                for path in paths {
                    let value = io::parse_file(&path, &reg, &target.type_settings.root)?;
                    let json = json_bridge::to_json(&value);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_or_print(out: Option<&std::path::Path>, doc: &document::Element) -> anyhow::Result<()> {
    match out {
        Some(path) => io::write_document(path, doc),
        None => {
            println!("{}", doc.to_xml());
            Ok(())
        }
    }
}

fn parse_pairs(raw: &[String], flag: &str) -> anyhow::Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    for entry in raw {
        let (k, v) = entry
            .split_once('=')
            .with_context(|| format!("{flag} expects KEY=VALUE, got `{entry}`"))?;
        out.insert(k.to_string(), v.to_string());
    }
    Ok(out)
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

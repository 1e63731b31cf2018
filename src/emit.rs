//! Document-level orchestration: whole schema documents, templates, and
//! root value encode/decode, combining the resolver's declaration order
//! with the root type's codec.

use indexmap::IndexMap;

use crate::document::Element;
use crate::errors::{Error, Trace};
use crate::registry::Registry;
use crate::resolve;
use crate::value::Value;

pub const XSD_URL: &str = "http://www.w3.org/2001/XMLSchema";
const XSD_PREFIX: &str = "xsd";

#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// `id` attribute and root element name; defaults to the root type name.
    pub id: Option<String>,
    /// Extra `xmlns:prefix="uri"` declarations on the schema root.
    pub namespaces: IndexMap<String, String>,
    /// `namespace -> schemaLocation` import pairs.
    pub imports: IndexMap<String, String>,
}

/// Prefix for the XML Schema namespace. If the caller already declared it
/// under some prefix, reuse theirs; if they claimed `xsd` for a different
/// namespace, suffix deterministically until unused.
pub fn schema_prefix(namespaces: &IndexMap<String, String>) -> String {
    if let Some((prefix, _)) = namespaces.iter().find(|(_, uri)| uri.as_str() == XSD_URL) {
        return prefix.clone();
    }
    let mut prefix = XSD_PREFIX.to_string();
    let mut n = 0usize;
    while namespaces.contains_key(&prefix) {
        prefix = format!("{XSD_PREFIX}{n}");
        n += 1;
    }
    prefix
}

/// One schema document: forward declarations in dependency order, then the
/// root element referencing the root type.
pub fn schema(reg: &Registry, root: &str, opts: &SchemaOptions) -> Result<Element, Error> {
    let id = opts.id.as_deref().unwrap_or(root);
    let prefix = schema_prefix(&opts.namespaces);
    let declaration_order = resolve::order(root, reg)?;

    let mut el = Element::new(format!("{prefix}:schema"))
        .with_attr("id", id)
        .with_attr("elementFormDefault", "qualified")
        .with_attr(format!("xmlns:{prefix}"), XSD_URL);
    for (p, uri) in &opts.namespaces {
        if *p != prefix {
            el.set_attr(format!("xmlns:{p}"), uri.as_str());
        }
    }
    for (ns, location) in &opts.imports {
        el.push(
            Element::new(format!("{prefix}:import"))
                .with_attr("namespace", ns.as_str())
                .with_attr("schemaLocation", location.as_str()),
        );
    }

    let ctx = Trace::root(id);
    for name in &declaration_order {
        el.push(reg.delegate(name, &ctx)?.forward_decl(&prefix, reg));
    }
    el.push(reg.delegate(root, &ctx)?.element_use(id, &[], &prefix));
    Ok(el)
}

/// One template document with placeholder content. Not expected to
/// validate against the schema: it may carry comments where the schema
/// requires elements.
pub fn template(reg: &Registry, root: &str, name: Option<&str>) -> Result<Element, Error> {
    let name = name.unwrap_or(root);
    reg.delegate(root, &Trace::root(name))?.template(name, reg)
}

/// Encode one root value; the result validates against the schema emitted
/// for the same root type.
pub fn encode_value(
    reg: &Registry,
    root: &str,
    value: &Value,
    id: Option<&str>,
) -> Result<Element, Error> {
    let id = id.unwrap_or(root);
    let ctx = Trace::root(id);
    reg.delegate(root, &ctx)?.encode(id, value, reg, &ctx)
}

/// Decode one parsed document as a value of the root type.
pub fn decode_value(reg: &Registry, root: &str, el: &Element) -> Result<Value, Error> {
    let ctx = Trace::root(&el.tag);
    reg.delegate(root, &ctx)?.decode(el, reg, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, TypeDescriptor};

    fn point_line_registry() -> Registry {
        let mut reg = Registry::new();
        reg.register(
            "Point",
            vec![
                FieldDescriptor::new("x", TypeDescriptor::int()),
                FieldDescriptor::new("y", TypeDescriptor::int()),
            ],
        )
        .unwrap();
        reg.register(
            "Line",
            vec![
                FieldDescriptor::new("from", TypeDescriptor::named("Point")),
                FieldDescriptor::new("to", TypeDescriptor::named("Point")),
            ],
        )
        .unwrap();
        reg
    }

    #[test]
    fn prefix_picks_an_unused_suffix_deterministically() {
        let mut namespaces = IndexMap::new();
        assert_eq!(schema_prefix(&namespaces), "xsd");

        namespaces.insert("xsd".to_string(), "http://example.com/other".to_string());
        assert_eq!(schema_prefix(&namespaces), "xsd0");

        namespaces.insert("xsd0".to_string(), "http://example.com/more".to_string());
        assert_eq!(schema_prefix(&namespaces), "xsd1");
    }

    #[test]
    fn prefix_reuses_a_caller_declared_schema_namespace() {
        let mut namespaces = IndexMap::new();
        namespaces.insert("xmlSchema".to_string(), XSD_URL.to_string());
        assert_eq!(schema_prefix(&namespaces), "xmlSchema");
    }

    #[test]
    fn schema_declares_point_before_line() {
        let reg = point_line_registry();
        let doc = schema(&reg, "Line", &SchemaOptions::default()).unwrap();
        assert_eq!(doc.tag, "xsd:schema");

        let decls: Vec<&str> = doc
            .elements()
            .filter(|e| e.tag == "xsd:complexType")
            .filter_map(|e| e.attrs.iter().find(|(k, _)| k == "name"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(decls, ["Point", "Line"]);

        // the root element references the root type by name
        let root = doc
            .elements()
            .find(|e| e.tag == "xsd:element")
            .expect("root element declaration");
        assert!(root.attrs.contains(&("name".to_string(), "Line".to_string())));
        assert!(root.attrs.contains(&("type".to_string(), "Line".to_string())));
    }

    #[test]
    fn schema_carries_caller_namespaces_and_imports() {
        let reg = point_line_registry();
        let mut opts = SchemaOptions::default();
        opts.namespaces
            .insert("cfg".to_string(), "http://example.com/cfg".to_string());
        opts.imports.insert(
            "http://example.com/cfg".to_string(),
            "cfg.xsd".to_string(),
        );
        let doc = schema(&reg, "Line", &opts).unwrap();
        assert!(doc.attrs.contains(&(
            "xmlns:cfg".to_string(),
            "http://example.com/cfg".to_string()
        )));
        let import = doc
            .elements()
            .find(|e| e.tag == "xsd:import")
            .expect("import element");
        assert!(import
            .attrs
            .contains(&("schemaLocation".to_string(), "cfg.xsd".to_string())));
    }

    #[test]
    fn schema_for_unregistered_root_fails() {
        let reg = Registry::new();
        assert!(matches!(
            schema(&reg, "Nope", &SchemaOptions::default()).unwrap_err(),
            Error::UnknownType { .. }
        ));
    }

    #[test]
    fn template_expands_nested_records() {
        let reg = point_line_registry();
        let doc = template(&reg, "Line", None).unwrap();
        assert_eq!(doc.tag, "Line");
        let from = doc.child("from").expect("from field");
        assert!(from.child("x").unwrap().text_content().contains("xsd:integer"));
    }
}

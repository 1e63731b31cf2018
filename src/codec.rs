//! The type-directed codec engine.
//!
//! One codec arm per descriptor shape, each implementing the four
//! operations: XSD fragment, template fragment, value encode, value decode.
//! All four are pure: they either return a tree fragment/value or fail
//! with a diagnosed, path-qualified error. `Named` arms delegate to the
//! registry at call time rather than inlining the target codec, so
//! mutually referential records build without recursion.

use std::collections::BTreeSet;

use crate::descriptor::Scalar;
use crate::document::{Element, XmlNode};
use crate::errors::{Error, Trace};
use crate::registry::Registry;
use crate::value::Value;

// ------------------------------ Wire tags --------------------------------- //

pub const LIST_ITEM: &str = "listitem";
pub const SET_ITEM: &str = "setitem";
pub const DICT_ITEM: &str = "dictitem";
pub const DICT_KEY: &str = "key";
pub const DICT_VAL: &str = "val";

pub fn tuple_item(index: usize) -> String {
    format!("tupleitem{index}")
}

pub fn variant_tag(shape: &str) -> String {
    format!("variant{shape}")
}

/// XSD occurrence attributes attached to a use site (`minOccurs` etc).
pub type Mods<'a> = &'a [(&'a str, &'a str)];

// ------------------------------- Codec tree ------------------------------- //

#[derive(Debug, Clone)]
pub enum Codec {
    Scalar(Scalar),
    None,
    List(SeqItems),
    Set(SeqItems),
    Tuple(Vec<Codec>),
    Map { key: Box<Codec>, val: Box<Codec> },
    /// `(discriminant tag, codec)` pairs; uniqueness is checked at
    /// registration, so decode-time matching is unambiguous.
    Union(Vec<(String, Codec)>),
    Named(String),
}

#[derive(Debug, Clone)]
pub struct SeqItems {
    pub item: Box<Codec>,
    pub item_tag: &'static str,
    pub label: &'static str,
}

/// Escape hatch: a caller-implemented codec for one named type.
///
/// This is where domain validation of scalar content lives; the engine
/// itself never checks more than type and structure. Registered instances
/// participate in forward declaration and `Named` delegation exactly like
/// records.
pub trait ManualCodec: Send + Sync {
    fn type_name(&self) -> &str;

    /// The standalone schema definition emitted before first use.
    fn forward_decl(&self, prefix: &str) -> Element;

    /// The use-site element declaration; the default references the
    /// forward-declared type by name.
    fn element_use(&self, name: &str, mods: Mods, prefix: &str) -> Element {
        apply_mods(
            Element::new(format!("{prefix}:element"))
                .with_attr("name", name)
                .with_attr("type", self.type_name()),
            mods,
        )
    }

    fn template(&self, name: &str) -> Element;

    fn encode(&self, name: &str, value: &Value, ctx: &Trace) -> Result<Element, Error>;

    fn decode(&self, element: &Element, ctx: &Trace) -> Result<Value, Error>;

    /// Named types this codec's declaration depends on.
    fn dependencies(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

// ------------------------------ XSD fragments ----------------------------- //

fn apply_mods(mut el: Element, mods: Mods) -> Element {
    for (k, v) in mods {
        el.set_attr(*k, *v);
    }
    el
}

fn schema_el(prefix: &str, local: &str) -> Element {
    Element::new(format!("{prefix}:{local}"))
}

/// `<element name=..><complexType><sequence> children </sequence>..</element>`
fn wrap_complex(
    prefix: &str,
    name: &str,
    mods: Mods,
    note: &str,
    children: Vec<XmlNode>,
) -> Element {
    let sequence = schema_el(prefix, "sequence").with_children(children);
    let mut complex = schema_el(prefix, "complexType");
    if !note.is_empty() {
        complex.push(XmlNode::Comment(note.to_string()));
    }
    apply_mods(
        schema_el(prefix, "element").with_attr("name", name),
        mods,
    )
    .with_child(complex.with_child(sequence))
}

impl Codec {
    /// Schema fragment for an element of this shape named `name`.
    pub fn xsd(&self, name: &str, mods: Mods, prefix: &str, reg: &Registry) -> Element {
        match self {
            Codec::Scalar(s) => apply_mods(
                schema_el(prefix, "element")
                    .with_attr("name", name)
                    .with_attr("type", s.xsd_type(prefix)),
                mods,
            ),
            Codec::None => apply_mods(
                schema_el(prefix, "element").with_attr("name", name),
                mods,
            ),
            Codec::List(seq) | Codec::Set(seq) => {
                let item = seq.item.xsd(
                    seq.item_tag,
                    &[("minOccurs", "0"), ("maxOccurs", "unbounded")],
                    prefix,
                    reg,
                );
                wrap_complex(
                    prefix,
                    name,
                    mods,
                    &format!("this is a {}!", seq.label),
                    vec![item.into()],
                )
            }
            Codec::Tuple(items) => {
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, c)| c.xsd(&tuple_item(i), &[], prefix, reg).into())
                    .collect();
                wrap_complex(prefix, name, mods, "this is a tuple!", children)
            }
            Codec::Map { key, val } => {
                let entry_body = schema_el(prefix, "complexType").with_child(
                    schema_el(prefix, "sequence")
                        .with_child(key.xsd(DICT_KEY, &[], prefix, reg))
                        .with_child(val.xsd(DICT_VAL, &[], prefix, reg)),
                );
                let entry = schema_el(prefix, "element")
                    .with_attr("name", DICT_ITEM)
                    .with_attr("minOccurs", "0")
                    .with_attr("maxOccurs", "unbounded")
                    .with_child(entry_body);
                wrap_complex(prefix, name, mods, "this is a dictionary!", vec![entry.into()])
            }
            Codec::Union(variants) => {
                let children = variants
                    .iter()
                    .map(|(tag, c)| c.xsd(tag, &[("minOccurs", "0")], prefix, reg).into())
                    .collect();
                wrap_complex(prefix, name, mods, "this is a union!", children)
            }
            Codec::Named(target) => match reg.delegate(target, &Trace::root(name)) {
                Ok(d) => d.element_use(name, mods, prefix),
                // Unreachable through schema emission (the resolver checks
                // completeness first); still emit the reference shape.
                Err(_) => apply_mods(
                    schema_el(prefix, "element")
                        .with_attr("name", name)
                        .with_attr("type", target.as_str()),
                    mods,
                ),
            },
        }
    }

    // ------------------------------ Templates ----------------------------- //

    /// Placeholder fragment: descriptive text for scalars, one example item
    /// for collections, every variant as a commented alternative for unions.
    pub fn template(&self, name: &str, reg: &Registry) -> Result<Element, Error> {
        match self {
            Codec::Scalar(s) => Ok(Element::new(name)
                .with_text(format!(" Fill me with an {} ", s.xsd_type("xsd")))),
            Codec::None => Ok(Element::new(name).with_comment("This is None")),
            Codec::List(seq) | Codec::Set(seq) => Ok(Element::new(name)
                .with_comment(format!("This is a {}", seq.label))
                .with_child(seq.item.template(seq.item_tag, reg)?)),
            Codec::Tuple(items) => {
                let mut el = Element::new(name).with_comment("This is a tuple");
                for (i, item) in items.iter().enumerate() {
                    el.push(item.template(&tuple_item(i), reg)?);
                }
                Ok(el)
            }
            Codec::Map { key, val } => Ok(Element::new(name).with_child(
                Element::new(DICT_ITEM)
                    .with_comment("This is a dictionary")
                    .with_child(key.template(DICT_KEY, reg)?)
                    .with_child(val.template(DICT_VAL, reg)?),
            )),
            Codec::Union(variants) => {
                let mut el = Element::new(name)
                    .with_comment("This is a union, the following variants are possible");
                for (tag, codec) in variants {
                    let fragment = codec.template(tag, reg)?;
                    el.push(XmlNode::Comment(fragment.to_fragment()));
                }
                Ok(el)
            }
            Codec::Named(target) => reg
                .delegate(target, &Trace::root(name))?
                .template(name, reg),
        }
    }

    // ------------------------------- Encode ------------------------------- //

    pub fn encode(
        &self,
        name: &str,
        value: &Value,
        reg: &Registry,
        ctx: &Trace,
    ) -> Result<Element, Error> {
        match self {
            Codec::Scalar(s) => Ok(Element::new(name).with_text(scalar_text(*s, value, ctx)?)),
            Codec::None => match value {
                Value::None => Ok(Element::new(name)),
                other => Err(Error::InvalidValue {
                    expected: "NoneType".into(),
                    got: other.shape_name().to_string(),
                    trace: ctx.clone(),
                }),
            },
            Codec::List(seq) => match value {
                Value::List(items) => encode_items(seq, items.iter(), name, reg, ctx),
                other => Err(shape_mismatch("list", other, ctx)),
            },
            Codec::Set(seq) => match value {
                Value::Set(items) => encode_items(seq, items.iter(), name, reg, ctx),
                other => Err(shape_mismatch("set", other, ctx)),
            },
            Codec::Tuple(items) => match value {
                Value::Tuple(vals) => {
                    if vals.len() != items.len() {
                        return Err(Error::WrongArity {
                            structure: "tuple",
                            expected: items.len(),
                            got: vals.len(),
                            trace: ctx.clone(),
                        });
                    }
                    let mut el = Element::new(name);
                    for (i, (codec, v)) in items.iter().zip(vals).enumerate() {
                        let tag = tuple_item(i);
                        el.push(codec.encode(&tag, v, reg, &ctx.next(&tag))?);
                    }
                    Ok(el)
                }
                other => Err(shape_mismatch("tuple", other, ctx)),
            },
            Codec::Map { key, val } => match value {
                Value::Map(entries) => {
                    let mut seen = BTreeSet::new();
                    let mut el = Element::new(name);
                    for (i, (k, v)) in entries.iter().enumerate() {
                        if !seen.insert(k) {
                            return Err(Error::DuplicateMapKey {
                                key: format!("{k:?}"),
                                trace: ctx.clone(),
                            });
                        }
                        let entry_ctx = ctx.next(format!("{DICT_ITEM}[{i}]"));
                        el.push(
                            Element::new(DICT_ITEM)
                                .with_child(key.encode(DICT_KEY, k, reg, &entry_ctx.next(DICT_KEY))?)
                                .with_child(val.encode(DICT_VAL, v, reg, &entry_ctx.next(DICT_VAL))?),
                        );
                    }
                    Ok(el)
                }
                other => Err(shape_mismatch("dict", other, ctx)),
            },
            Codec::Union(variants) => {
                let tag = variant_tag(value.shape_name());
                match variants.iter().find(|(t, _)| *t == tag) {
                    Some((t, codec)) => Ok(Element::new(name)
                        .with_child(codec.encode(t, value, reg, &ctx.next(t))?)),
                    Option::None => Err(Error::NotAVariant {
                        shape: value.shape_name().to_string(),
                        known: variants.iter().map(|(t, _)| t.clone()).collect(),
                        trace: ctx.clone(),
                    }),
                }
            }
            Codec::Named(target) => reg.delegate(target, ctx)?.encode(name, value, reg, ctx),
        }
    }

    // ------------------------------- Decode ------------------------------- //

    pub fn decode(&self, el: &Element, reg: &Registry, ctx: &Trace) -> Result<Value, Error> {
        match self {
            Codec::Scalar(s) => scalar_parse(*s, el.text_content(), ctx),
            Codec::None => Ok(Value::None),
            Codec::List(seq) => {
                let mut items = Vec::new();
                for (i, child) in el.elements().enumerate() {
                    items.push(decode_item(seq, child, i, reg, ctx)?);
                }
                Ok(Value::List(items))
            }
            Codec::Set(seq) => {
                let mut items = BTreeSet::new();
                for (i, child) in el.elements().enumerate() {
                    let item = decode_item(seq, child, i, reg, ctx)?;
                    if !items.insert(item.clone()) {
                        return Err(Error::DuplicateItem {
                            structure: seq.label,
                            tag: el.tag.clone(),
                            item: format!("{item:?}"),
                            trace: ctx.clone(),
                        });
                    }
                }
                Ok(Value::Set(items))
            }
            Codec::Tuple(items) => {
                let children: Vec<&Element> = el.elements().collect();
                if children.len() != items.len() {
                    return Err(Error::WrongChildCount {
                        structure: "tuple",
                        expected: items.len(),
                        got: children.len(),
                        trace: ctx.clone(),
                    });
                }
                let mut vals = Vec::with_capacity(items.len());
                for (i, (codec, child)) in items.iter().zip(&children).enumerate() {
                    let expected = tuple_item(i);
                    if child.tag != expected {
                        return Err(Error::UnexpectedTag {
                            structure: "tuple",
                            expected,
                            found: child.tag.clone(),
                            trace: ctx.clone(),
                        });
                    }
                    vals.push(codec.decode(child, reg, &ctx.next(&expected))?);
                }
                Ok(Value::Tuple(vals))
            }
            Codec::Map { key, val } => {
                let mut seen = BTreeSet::new();
                let mut entries = Vec::new();
                for (i, child) in el.elements().enumerate() {
                    if child.tag != DICT_ITEM {
                        return Err(Error::UnexpectedTag {
                            structure: "dict",
                            expected: DICT_ITEM.to_string(),
                            found: child.tag.clone(),
                            trace: ctx.clone(),
                        });
                    }
                    let entry_ctx = ctx.next(format!("{DICT_ITEM}[{i}]"));
                    let k_el = child.child(DICT_KEY).ok_or_else(|| Error::MissingChild {
                        parent: child.tag.clone(),
                        expected: DICT_KEY.to_string(),
                        trace: entry_ctx.clone(),
                    })?;
                    let v_el = child.child(DICT_VAL).ok_or_else(|| Error::MissingChild {
                        parent: child.tag.clone(),
                        expected: DICT_VAL.to_string(),
                        trace: entry_ctx.clone(),
                    })?;
                    let k = key.decode(k_el, reg, &entry_ctx.next(DICT_KEY))?;
                    let v = val.decode(v_el, reg, &entry_ctx.next(DICT_VAL))?;
                    if !seen.insert(k.clone()) {
                        return Err(Error::DuplicateKey {
                            tag: el.tag.clone(),
                            key: format!("{k:?}"),
                            trace: ctx.clone(),
                        });
                    }
                    entries.push((k, v));
                }
                Ok(Value::Map(entries))
            }
            Codec::Union(variants) => {
                let present: Vec<&Element> = el.elements().collect();
                if present.len() != 1 {
                    return Err(Error::VariantCount {
                        tag: el.tag.clone(),
                        got: present.len(),
                        trace: ctx.clone(),
                    });
                }
                let child = present[0];
                match variants.iter().find(|(t, _)| *t == child.tag) {
                    Some((tag, codec)) => codec.decode(child, reg, &ctx.next(tag)),
                    Option::None => Err(Error::UnknownVariant {
                        tag: el.tag.clone(),
                        found: child.tag.clone(),
                        known: variants.iter().map(|(t, _)| t.clone()).collect(),
                        trace: ctx.clone(),
                    }),
                }
            }
            Codec::Named(target) => reg.delegate(target, ctx)?.decode(el, reg, ctx),
        }
    }
}

fn encode_items<'a>(
    seq: &SeqItems,
    items: impl Iterator<Item = &'a Value>,
    name: &str,
    reg: &Registry,
    ctx: &Trace,
) -> Result<Element, Error> {
    let mut el = Element::new(name);
    let mut count = 0usize;
    for (i, item) in items.enumerate() {
        let item_ctx = ctx.next(format!("{}[{i}]", seq.item_tag));
        el.push(seq.item.encode(seq.item_tag, item, reg, &item_ctx)?);
        count += 1;
    }
    if count == 0 {
        el.push(XmlNode::Comment(format!("Empty {}!", seq.label)));
    }
    Ok(el)
}

fn decode_item(
    seq: &SeqItems,
    child: &Element,
    index: usize,
    reg: &Registry,
    ctx: &Trace,
) -> Result<Value, Error> {
    if child.tag != seq.item_tag {
        return Err(Error::UnexpectedTag {
            structure: seq.label,
            expected: seq.item_tag.to_string(),
            found: child.tag.clone(),
            trace: ctx.clone(),
        });
    }
    seq.item
        .decode(child, reg, &ctx.next(format!("{}[{index}]", seq.item_tag)))
}

fn shape_mismatch(expected: &str, got: &Value, ctx: &Trace) -> Error {
    Error::InvalidValue {
        expected: expected.to_string(),
        got: got.shape_name().to_string(),
        trace: ctx.clone(),
    }
}

// ---------------------------- Scalar text codec --------------------------- //

fn scalar_text(kind: Scalar, value: &Value, ctx: &Trace) -> Result<String, Error> {
    match (kind, value) {
        (Scalar::Int, Value::Int(i)) => Ok(i.to_string()),
        (Scalar::Float, Value::Float(f)) => Ok(f.0.to_string()),
        (Scalar::Str, Value::Str(s)) => Ok(s.clone()),
        (Scalar::Bool, Value::Bool(b)) => Ok(if *b { "true" } else { "false" }.to_string()),
        (kind, other) => Err(Error::InvalidValue {
            expected: kind.shape_name().to_string(),
            got: other.shape_name().to_string(),
            trace: ctx.clone(),
        }),
    }
}

fn scalar_parse(kind: Scalar, text: &str, ctx: &Trace) -> Result<Value, Error> {
    match kind {
        Scalar::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|e| {
            leaf_error(text, "int", ctx, e)
        }),
        Scalar::Float => text.trim().parse::<f64>().map(Value::float).map_err(|e| {
            leaf_error(text, "float", ctx, e)
        }),
        Scalar::Str => Ok(Value::Str(text.to_string())),
        Scalar::Bool => match text.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(leaf_error(
                text,
                "bool",
                ctx,
                format!("`{other}` is not an xsd:boolean literal"),
            )),
        },
    }
}

fn leaf_error(
    text: &str,
    target: &'static str,
    ctx: &Trace,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::LeafParse {
        text: text.to_string(),
        target,
        trace: ctx.clone(),
        source: source.into(),
    }
}

// ------------------------------ Record codec ------------------------------ //

/// The body codec of one registered record: field-by-field, declared order
/// on encode, by-name lookup on decode.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    pub name: String,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: String,
    pub codec: Codec,
    pub default: Option<Value>,
}

impl RecordCodec {
    /// Use-site declaration: references the forward-declared type by name.
    pub fn element_use(&self, name: &str, mods: Mods, prefix: &str) -> Element {
        apply_mods(
            Element::new(format!("{prefix}:element"))
                .with_attr("name", name)
                .with_attr("type", self.name.as_str()),
            mods,
        )
    }

    /// The forward declaration other elements reference by type name.
    pub fn forward_decl(&self, prefix: &str, reg: &Registry) -> Element {
        let mut sequence = schema_el(prefix, "sequence");
        for field in &self.fields {
            sequence.push(field.codec.xsd(&field.name, &[], prefix, reg));
        }
        schema_el(prefix, "complexType")
            .with_attr("name", self.name.as_str())
            .with_child(sequence)
    }

    pub fn template(&self, name: &str, reg: &Registry) -> Result<Element, Error> {
        let mut el = Element::new(name);
        for field in &self.fields {
            match &field.default {
                Some(default) => {
                    // Show the declared default instead of a placeholder.
                    let ctx = Trace::root(name).next(&field.name);
                    el.push(field.codec.encode(&field.name, default, reg, &ctx)?);
                }
                Option::None => el.push(field.codec.template(&field.name, reg)?),
            }
        }
        Ok(el)
    }

    pub fn encode(
        &self,
        name: &str,
        value: &Value,
        reg: &Registry,
        ctx: &Trace,
    ) -> Result<Element, Error> {
        let fields = match value {
            Value::Record { name: rec, fields } if *rec == self.name => fields,
            other => {
                return Err(Error::InvalidValue {
                    expected: format!("record `{}`", self.name),
                    got: other.shape_name().to_string(),
                    trace: ctx.clone(),
                });
            }
        };
        let mut el = Element::new(name);
        for field in &self.fields {
            let val = fields
                .iter()
                .find(|(n, _)| *n == field.name)
                .map(|(_, v)| v)
                .ok_or_else(|| Error::MissingField {
                    record: self.name.clone(),
                    field: field.name.clone(),
                    trace: ctx.clone(),
                })?;
            el.push(field.codec.encode(&field.name, val, reg, &ctx.next(&field.name))?);
        }
        Ok(el)
    }

    pub fn decode(&self, el: &Element, reg: &Registry, ctx: &Trace) -> Result<Value, Error> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let child = el.child(&field.name).ok_or_else(|| Error::MissingChild {
                parent: el.tag.clone(),
                expected: field.name.clone(),
                trace: ctx.clone(),
            })?;
            let val = field.codec.decode(child, reg, &ctx.next(&field.name))?;
            fields.push((field.name.clone(), val));
        }
        Ok(Value::Record {
            name: self.name.clone(),
            fields,
        })
    }
}

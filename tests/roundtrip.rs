//! End-to-end round trips through the full pipeline: registry -> encode ->
//! serialized XML -> parse -> decode, plus whole-schema scenarios.

use std::collections::BTreeSet;
use std::sync::Arc;

use typedxml::codec::ManualCodec;
use typedxml::document::{self, Element};
use typedxml::emit::{self, SchemaOptions};
use typedxml::errors::{Error, ErrorKind, Trace};
use typedxml::{FieldDescriptor, Registry, TypeDescriptor, Value};

fn round_trip(reg: &Registry, root: &str, value: &Value) -> Value {
    let doc = emit::encode_value(reg, root, value, None).expect("encode");
    let text = doc.to_xml();
    let parsed = document::parse(&text).expect("parse");
    emit::decode_value(reg, root, &parsed).expect("decode")
}

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

fn point(x: i64, y: i64) -> Value {
    Value::record("Point", [("x", Value::Int(x)), ("y", Value::Int(y))])
}

#[test]
fn nested_records_round_trip_and_declare_in_order() {
    let reg = point_line_registry();
    let line = Value::record("Line", [("from", point(1, 2)), ("to", point(3, 4))]);
    assert_eq!(round_trip(&reg, "Line", &line), line);

    let schema = emit::schema(&reg, "Line", &SchemaOptions::default()).unwrap();
    let text = schema.to_xml();
    let point_decl = text.find("name=\"Point\"").expect("Point declared");
    let line_decl = text.find("name=\"Line\"").expect("Line declared");
    assert!(point_decl < line_decl, "Point must be declared before Line");
}

#[test]
fn every_shape_round_trips_including_empty_collections() {
    let mut reg = Registry::new();
    reg.register(
        "Everything",
        vec![
            FieldDescriptor::new("i", TypeDescriptor::int()),
            FieldDescriptor::new("f", TypeDescriptor::float()),
            FieldDescriptor::new("s", TypeDescriptor::str()),
            FieldDescriptor::new("b", TypeDescriptor::bool()),
            FieldDescriptor::new("n", TypeDescriptor::None),
            FieldDescriptor::new("xs", TypeDescriptor::list(TypeDescriptor::int())),
            FieldDescriptor::new("empty_xs", TypeDescriptor::list(TypeDescriptor::None)),
            FieldDescriptor::new("flags", TypeDescriptor::set(TypeDescriptor::bool())),
            FieldDescriptor::new("empty_flags", TypeDescriptor::set(TypeDescriptor::int())),
            FieldDescriptor::new(
                "pair",
                TypeDescriptor::tuple([TypeDescriptor::int(), TypeDescriptor::str()]),
            ),
            FieldDescriptor::new(
                "lookup",
                TypeDescriptor::map(TypeDescriptor::int(), TypeDescriptor::str()),
            ),
            FieldDescriptor::new(
                "empty_lookup",
                TypeDescriptor::map(TypeDescriptor::str(), TypeDescriptor::float()),
            ),
        ],
    )
    .unwrap();

    let value = Value::record(
        "Everything",
        [
            ("i", Value::Int(-42)),
            ("f", Value::float(0.5)),
            ("s", Value::str("hello & <world>")),
            ("b", Value::Bool(false)),
            ("n", Value::None),
            ("xs", Value::List(vec![Value::Int(1), Value::Int(2)])),
            ("empty_xs", Value::List(vec![])),
            ("flags", Value::set([Value::Bool(true), Value::Bool(false)])),
            ("empty_flags", Value::Set(BTreeSet::new())),
            (
                "pair",
                Value::Tuple(vec![Value::Int(7), Value::str("seven")]),
            ),
            (
                "lookup",
                Value::Map(vec![
                    (Value::Int(1), Value::str("a")),
                    (Value::Int(2), Value::str("b")),
                ]),
            ),
            ("empty_lookup", Value::Map(vec![])),
        ],
    );
    assert_eq!(round_trip(&reg, "Everything", &value), value);
}

#[test]
fn union_round_trips_every_variant() {
    let mut reg = Registry::new();
    reg.register(
        "Holder",
        vec![FieldDescriptor::new(
            "a",
            TypeDescriptor::union([
                TypeDescriptor::int(),
                TypeDescriptor::float(),
                TypeDescriptor::str(),
                TypeDescriptor::bool(),
                TypeDescriptor::None,
            ]),
        )],
    )
    .unwrap();

    for v in [
        Value::Int(9),
        Value::float(0.33),
        Value::str("hello"),
        Value::Bool(true),
        Value::None,
    ] {
        let value = Value::record("Holder", [("a", v)]);
        assert_eq!(round_trip(&reg, "Holder", &value), value);
    }
}

#[test]
fn union_wire_format_and_undeclared_variant_rejection() {
    // Tag = int | str
    let mut reg = Registry::new();
    reg.register(
        "Tag",
        vec![FieldDescriptor::new(
            "value",
            TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::str()]),
        )],
    )
    .unwrap();

    let doc = emit::encode_value(
        &reg,
        "Tag",
        &Value::record("Tag", [("value", Value::Int(5))]),
        None,
    )
    .unwrap();
    let field = doc.child("value").unwrap();
    let children: Vec<&Element> = field.elements().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag, "variantint");
    assert_eq!(children[0].text_content(), "5");

    // a float variant wrapper is not declared on this union
    let bad = "<?xml version='1.0' encoding='UTF-8'?>\n\
               <Tag><value><variantfloat>5.0</variantfloat></value></Tag>";
    let parsed = document::parse(bad).unwrap();
    let err = emit::decode_value(&reg, "Tag", &parsed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeStructural);

    // two variants present at once
    let both = "<?xml version='1.0' encoding='UTF-8'?>\n\
                <Tag><value><variantint>1</variantint><variantstr>x</variantstr></value></Tag>";
    let parsed = document::parse(both).unwrap();
    let err = emit::decode_value(&reg, "Tag", &parsed).unwrap_err();
    assert!(matches!(err, Error::VariantCount { got: 2, .. }));
}

#[test]
fn duplicate_map_keys_and_set_items_fail_decode() {
    let mut reg = Registry::new();
    reg.register(
        "Data",
        vec![
            FieldDescriptor::new(
                "m",
                TypeDescriptor::map(TypeDescriptor::int(), TypeDescriptor::str()),
            ),
            FieldDescriptor::new("s", TypeDescriptor::set(TypeDescriptor::int())),
        ],
    )
    .unwrap();

    // key 3 twice with different values
    let dup_key = "<?xml version='1.0' encoding='UTF-8'?>\n<Data>\
        <m>\
          <dictitem><key>3</key><val>a</val></dictitem>\
          <dictitem><key>3</key><val>b</val></dictitem>\
        </m>\
        <s/>\
      </Data>";
    let parsed = document::parse(dup_key).unwrap();
    let err = emit::decode_value(&reg, "Data", &parsed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeSemantic);

    let dup_item = "<?xml version='1.0' encoding='UTF-8'?>\n<Data>\
        <m/>\
        <s><setitem>3</setitem><setitem>3</setitem></s>\
      </Data>";
    let parsed = document::parse(dup_item).unwrap();
    let err = emit::decode_value(&reg, "Data", &parsed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeSemantic);
}

#[test]
fn dependency_cycles_are_fatal_for_schema_emission() {
    let mut reg = Registry::new();
    reg.register(
        "A",
        vec![FieldDescriptor::new("b", TypeDescriptor::named("B"))],
    )
    .unwrap();
    reg.register(
        "B",
        vec![FieldDescriptor::new("c", TypeDescriptor::named("C"))],
    )
    .unwrap();
    reg.register(
        "C",
        vec![FieldDescriptor::new("a", TypeDescriptor::named("A"))],
    )
    .unwrap();

    for root in ["A", "B", "C"] {
        match emit::schema(&reg, root, &SchemaOptions::default()).unwrap_err() {
            Error::DependencyCycle { cycle } => {
                assert_eq!(cycle.len(), 4);
                assert_eq!(cycle.first(), cycle.last());
                for name in ["A", "B", "C"] {
                    assert!(cycle.iter().any(|n| n == name), "{name} missing from cycle");
                }
            }
            other => panic!("expected cycle for root {root}, got {other}"),
        }
    }
}

#[test]
fn deeply_nested_composite_round_trips() {
    // dict[tuple[int, str], list[tuple[dict[int, float | str], set[bool]]]]
    let mut reg = Registry::new();
    reg.register(
        "Complex",
        vec![FieldDescriptor::new(
            "a",
            TypeDescriptor::map(
                TypeDescriptor::tuple([TypeDescriptor::int(), TypeDescriptor::str()]),
                TypeDescriptor::list(TypeDescriptor::tuple([
                    TypeDescriptor::map(
                        TypeDescriptor::int(),
                        TypeDescriptor::union([TypeDescriptor::float(), TypeDescriptor::str()]),
                    ),
                    TypeDescriptor::set(TypeDescriptor::bool()),
                ])),
            ),
        )],
    )
    .unwrap();

    let value = Value::record(
        "Complex",
        [(
            "a",
            Value::Map(vec![(
                Value::Tuple(vec![Value::Int(3), Value::str("hello")]),
                Value::List(vec![
                    Value::Tuple(vec![
                        Value::Map(vec![(Value::Int(3), Value::float(0.4))]),
                        Value::set([Value::Bool(true), Value::Bool(false)]),
                    ]),
                    Value::Tuple(vec![
                        Value::Map(vec![(Value::Int(2), Value::str("str"))]),
                        Value::set([Value::Bool(false)]),
                    ]),
                ]),
            )]),
        )],
    );
    assert_eq!(round_trip(&reg, "Complex", &value), value);
}

#[test]
fn decode_errors_carry_the_full_path() {
    let reg = point_line_registry();
    let bad = "<?xml version='1.0' encoding='UTF-8'?>\n\
               <Line><from><x>1</x><y>oops</y></from><to><x>3</x><y>4</y></to></Line>";
    let parsed = document::parse(bad).unwrap();
    let err = emit::decode_value(&reg, "Line", &parsed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeParse);
    assert_eq!(err.trace().unwrap().to_string(), "Line > from > y");
}

#[test]
fn templates_show_placeholders_defaults_and_commented_variants() {
    let mut reg = Registry::new();
    reg.register(
        "Config",
        vec![
            FieldDescriptor::new("date", TypeDescriptor::str()),
            FieldDescriptor::new("cores", TypeDescriptor::int())
                .with_default(Value::Int(48)),
            FieldDescriptor::new(
                "tag",
                TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::str()]),
            ),
        ],
    )
    .unwrap();

    let doc = emit::template(&reg, "Config", None).unwrap();
    let text = doc.to_xml();
    assert!(text.contains("Fill me with an xsd:string"));
    // the defaulted field shows its default instead of a placeholder
    assert!(text.contains("<cores>48</cores>"));
    // both union variants appear, commented
    assert!(text.contains("variantint"));
    assert!(text.contains("variantstr"));
    let tag = doc.child("tag").unwrap();
    assert_eq!(tag.elements().count(), 0, "variants must be comments");
}

// ---- manual codec escape hatch ---- //

/// `host:port` rendered as restricted string content; the engine only sees
/// a named type.
struct EndpointCodec;

impl ManualCodec for EndpointCodec {
    fn type_name(&self) -> &str {
        "Endpoint"
    }

    fn forward_decl(&self, prefix: &str) -> Element {
        Element::new(format!("{prefix}:simpleType"))
            .with_attr("name", "Endpoint")
            .with_child(
                Element::new(format!("{prefix}:restriction"))
                    .with_attr("base", format!("{prefix}:string"))
                    .with_child(
                        Element::new(format!("{prefix}:pattern"))
                            .with_attr("value", r"[^:]+:\d+"),
                    ),
            )
    }

    fn template(&self, name: &str) -> Element {
        Element::new(name).with_text(" host:port ")
    }

    fn encode(&self, name: &str, value: &Value, ctx: &Trace) -> Result<Element, Error> {
        let (host, port) = match (value.field("host"), value.field("port")) {
            (Some(Value::Str(h)), Some(Value::Int(p))) => (h, p),
            _ => {
                return Err(Error::InvalidValue {
                    expected: "record `Endpoint`".into(),
                    got: value.shape_name().to_string(),
                    trace: ctx.clone(),
                });
            }
        };
        Ok(Element::new(name).with_text(format!("{host}:{port}")))
    }

    fn decode(&self, el: &Element, ctx: &Trace) -> Result<Value, Error> {
        let text = el.text_content();
        let (host, port) = text.split_once(':').ok_or_else(|| Error::LeafParse {
            text: text.to_string(),
            target: "Endpoint",
            trace: ctx.clone(),
            source: "endpoint text must be host:port".into(),
        })?;
        let port: i64 = port.trim().parse().map_err(|e| Error::LeafParse {
            text: text.to_string(),
            target: "Endpoint",
            trace: ctx.clone(),
            source: Box::new(e),
        })?;
        Ok(Value::record(
            "Endpoint",
            [
                ("host", Value::str(host)),
                ("port", Value::Int(port)),
            ],
        ))
    }
}

#[test]
fn manual_codecs_round_trip_and_forward_declare() {
    let mut reg = Registry::new();
    reg.register_manual(Arc::new(EndpointCodec)).unwrap();
    reg.register(
        "Service",
        vec![
            FieldDescriptor::new("name", TypeDescriptor::str()),
            FieldDescriptor::new("endpoint", TypeDescriptor::named("Endpoint")),
        ],
    )
    .unwrap();

    let value = Value::record(
        "Service",
        [
            ("name", Value::str("db")),
            (
                "endpoint",
                Value::record(
                    "Endpoint",
                    [("host", Value::str("localhost")), ("port", Value::Int(5432))],
                ),
            ),
        ],
    );
    assert_eq!(round_trip(&reg, "Service", &value), value);

    // the wire format is the codec's own, not a record expansion
    let doc = emit::encode_value(&reg, "Service", &value, None).unwrap();
    assert_eq!(
        doc.child("endpoint").unwrap().text_content(),
        "localhost:5432"
    );

    let schema = emit::schema(&reg, "Service", &SchemaOptions::default()).unwrap();
    let text = schema.to_xml();
    assert!(text.contains("xsd:simpleType"));
    let endpoint_decl = text.find("name=\"Endpoint\"").unwrap();
    let service_decl = text.find("name=\"Service\"").unwrap();
    assert!(endpoint_decl < service_decl);
}

#[test]
fn registration_conflicts_between_records_and_manual_codecs() {
    let mut reg = Registry::new();
    reg.register_manual(Arc::new(EndpointCodec)).unwrap();
    let err = reg
        .register(
            "Endpoint",
            vec![FieldDescriptor::new("x", TypeDescriptor::int())],
        )
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingRegistration { .. }));
}

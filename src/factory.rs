//! Lowering from descriptors to codecs.
//!
//! Two passes over a descriptor tree:
//! - `check` runs at registration: validates the shape rules that must hold
//!   before anything is stored and collects the referenced type names the
//!   dependency resolver consumes later.
//! - `build` runs lazily at first use: lowers the tree to a `Codec`.
//!   `Named` stays symbolic, so unregistered references surface as
//!   diagnosed errors at operation time, not here.

use std::collections::BTreeSet;

use crate::codec::{Codec, RecordCodec, RecordField, SeqItems, variant_tag, LIST_ITEM, SET_ITEM};
use crate::descriptor::{RecordDescriptor, TypeDescriptor};
use crate::errors::Error;

pub fn check(
    ty: &TypeDescriptor,
    record: &str,
    deps: &mut BTreeSet<String>,
) -> Result<(), Error> {
    match ty {
        TypeDescriptor::Primitive(_) | TypeDescriptor::None => Ok(()),
        TypeDescriptor::List(item) | TypeDescriptor::Set(item) => check(item, record, deps),
        TypeDescriptor::Tuple(items) => {
            for item in items {
                check(item, record, deps)?;
            }
            Ok(())
        }
        TypeDescriptor::Map(key, val) => {
            check(key, record, deps)?;
            check(val, record, deps)
        }
        TypeDescriptor::Union(variants) => {
            let mut tags = BTreeSet::new();
            for variant in variants {
                if matches!(variant, TypeDescriptor::Union(_)) {
                    return Err(Error::NestedUnion {
                        record: record.to_string(),
                    });
                }
                let tag = variant_tag(variant.shape_name());
                if !tags.insert(tag.clone()) {
                    return Err(Error::DuplicateDiscriminant {
                        record: record.to_string(),
                        discriminant: tag,
                    });
                }
                check(variant, record, deps)?;
            }
            Ok(())
        }
        TypeDescriptor::Record(inner) => Err(Error::InlineRecord {
            record: record.to_string(),
            inner: inner.name.clone(),
        }),
        TypeDescriptor::Named(name) => {
            deps.insert(name.clone());
            Ok(())
        }
    }
}

pub fn build(ty: &TypeDescriptor) -> Codec {
    match ty {
        TypeDescriptor::Primitive(s) => Codec::Scalar(*s),
        TypeDescriptor::None => Codec::None,
        TypeDescriptor::List(item) => Codec::List(SeqItems {
            item: Box::new(build(item)),
            item_tag: LIST_ITEM,
            label: "list",
        }),
        TypeDescriptor::Set(item) => Codec::Set(SeqItems {
            item: Box::new(build(item)),
            item_tag: SET_ITEM,
            label: "set",
        }),
        TypeDescriptor::Tuple(items) => Codec::Tuple(items.iter().map(build).collect()),
        TypeDescriptor::Map(key, val) => Codec::Map {
            key: Box::new(build(key)),
            val: Box::new(build(val)),
        },
        TypeDescriptor::Union(variants) => Codec::Union(
            variants
                .iter()
                .map(|v| (variant_tag(v.shape_name()), build(v)))
                .collect(),
        ),
        // `check` rejects inline records at registration; anything that
        // slips through behaves as a reference.
        TypeDescriptor::Record(r) => Codec::Named(r.name.clone()),
        TypeDescriptor::Named(name) => Codec::Named(name.clone()),
    }
}

pub fn build_record(desc: &RecordDescriptor) -> RecordCodec {
    RecordCodec {
        name: desc.name.clone(),
        fields: desc
            .fields
            .iter()
            .map(|f| RecordField {
                name: f.name.clone(),
                codec: build(&f.ty),
                default: f.default.clone(),
            })
            .collect(),
    }
}

//! Append-only mapping from type name to shape and codec.
//!
//! A registry is caller-owned: registration takes `&mut self`, every lookup
//! takes `&self`. That split is the "concurrent readers, serialized
//! writers" discipline. Register everything up front, then share the
//! registry freely across encode/decode/schema calls.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::codec::{ManualCodec, RecordCodec};
use crate::descriptor::{FieldDescriptor, RecordDescriptor};
use crate::document::Element;
use crate::errors::{Error, Trace};
use crate::factory;
use crate::value::Value;

/// Field names the engine claims for itself: the four codec operations
/// (user-visible accessors could be generated with these names) and the
/// tag the document model reserves for comment nodes.
pub const RESERVED_FIELDS: [&str; 5] = ["schema", "template", "encode", "decode", "comment"];

enum Entry {
    Record(RecordEntry),
    Manual(Arc<dyn ManualCodec>),
}

struct RecordEntry {
    descriptor: RecordDescriptor,
    deps: BTreeSet<String>,
    codec: OnceCell<RecordCodec>,
}

#[derive(Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record shape. Idempotent for an identical shape;
    /// re-registration with a different shape is an error. Referenced
    /// `Named` types need not exist yet; emission checks completeness.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<(), Error> {
        let name = name.into();

        let mut seen = BTreeSet::new();
        for field in &fields {
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(Error::ReservedField {
                    record: name,
                    field: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::DuplicateField {
                    record: name,
                    field: field.name.clone(),
                });
            }
        }

        let mut deps = BTreeSet::new();
        for field in &fields {
            factory::check(&field.ty, &name, &mut deps)?;
        }

        let descriptor = RecordDescriptor {
            name: name.clone(),
            fields,
        };
        match self.entries.get(&name) {
            Some(Entry::Record(existing)) if existing.descriptor == descriptor => Ok(()),
            Some(_) => Err(Error::ConflictingRegistration { name }),
            None => {
                self.entries.insert(
                    name,
                    Entry::Record(RecordEntry {
                        descriptor,
                        deps,
                        codec: OnceCell::new(),
                    }),
                );
                Ok(())
            }
        }
    }

    /// Install an escape-hatch codec under its own type name.
    pub fn register_manual(&mut self, codec: Arc<dyn ManualCodec>) -> Result<(), Error> {
        let name = codec.type_name().to_string();
        match self.entries.get(&name) {
            Some(Entry::Manual(existing)) if Arc::ptr_eq(existing, &codec) => Ok(()),
            Some(_) => Err(Error::ConflictingRegistration { name }),
            None => {
                self.entries.insert(name, Entry::Manual(codec));
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&RecordDescriptor> {
        match self.entries.get(name) {
            Some(Entry::Record(e)) => Some(&e.descriptor),
            _ => None,
        }
    }

    /// Names this entry's declaration depends on, if the entry exists.
    pub fn dependencies(&self, name: &str) -> Option<BTreeSet<String>> {
        match self.entries.get(name)? {
            Entry::Record(e) => Some(e.deps.clone()),
            Entry::Manual(m) => Some(m.dependencies()),
        }
    }

    /// Resolve a name to its codec, building a record's body on first use.
    pub fn delegate(&self, name: &str, ctx: &Trace) -> Result<Delegate<'_>, Error> {
        match self.entries.get(name) {
            Some(Entry::Record(e)) => {
                let codec = e.codec.get_or_init(|| factory::build_record(&e.descriptor));
                Ok(Delegate::Record(codec))
            }
            Some(Entry::Manual(m)) => Ok(Delegate::Manual(m.as_ref())),
            None => Err(Error::UnknownType {
                name: name.to_string(),
                trace: ctx.clone(),
            }),
        }
    }
}

/// A resolved registry entry: either a record body or a manual codec.
/// Dispatch is uniform so `Named` delegation never cares which it hit.
pub enum Delegate<'a> {
    Record(&'a RecordCodec),
    Manual(&'a dyn ManualCodec),
}

impl std::fmt::Debug for Delegate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delegate::Record(_) => f.write_str("Delegate::Record"),
            Delegate::Manual(_) => f.write_str("Delegate::Manual"),
        }
    }
}

impl Delegate<'_> {
    pub fn element_use(&self, name: &str, mods: crate::codec::Mods, prefix: &str) -> Element {
        match self {
            Delegate::Record(rc) => rc.element_use(name, mods, prefix),
            Delegate::Manual(m) => m.element_use(name, mods, prefix),
        }
    }

    pub fn forward_decl(&self, prefix: &str, reg: &Registry) -> Element {
        match self {
            Delegate::Record(rc) => rc.forward_decl(prefix, reg),
            Delegate::Manual(m) => m.forward_decl(prefix),
        }
    }

    pub fn template(&self, name: &str, reg: &Registry) -> Result<Element, Error> {
        match self {
            Delegate::Record(rc) => rc.template(name, reg),
            Delegate::Manual(m) => Ok(m.template(name)),
        }
    }

    pub fn encode(
        &self,
        name: &str,
        value: &Value,
        reg: &Registry,
        ctx: &Trace,
    ) -> Result<Element, Error> {
        match self {
            Delegate::Record(rc) => rc.encode(name, value, reg, ctx),
            Delegate::Manual(m) => m.encode(name, value, ctx),
        }
    }

    pub fn decode(&self, el: &Element, reg: &Registry, ctx: &Trace) -> Result<Value, Error> {
        match self {
            Delegate::Record(rc) => rc.decode(el, reg, ctx),
            Delegate::Manual(m) => m.decode(el, ctx),
        }
    }
}

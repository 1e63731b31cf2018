//! typedxml: derive an XSD schema, an editable XML template, and a
//! bidirectional value codec from a structural description of a type.
//!
//! Register record shapes in a [`Registry`], then ask [`emit`] for schema,
//! template, or value documents, or decode documents back into values.
//! Every failure is path-qualified so the offending node can be located
//! without re-walking the document.

pub mod cli;
pub mod codec;
pub mod descriptor;
pub mod document;
pub mod emit;
pub mod errors;
pub mod factory;
pub mod io;
pub mod json_bridge;
pub mod registry;
pub mod resolve;
pub mod typefile;
pub mod value;

pub use descriptor::{FieldDescriptor, RecordDescriptor, Scalar, TypeDescriptor};
pub use errors::{Error, ErrorKind, Trace};
pub use registry::Registry;
pub use value::Value;

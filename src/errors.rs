//! Path-aware diagnostics.
//!
//! Every traversal-time failure carries the `Trace` accumulated from the
//! document root, so callers can locate the offending node without
//! re-walking anything. Errors are terminal: nothing here is retried or
//! recovered internally.

use std::fmt;

use colored::Colorize;
use thiserror::Error;

/// The path from the root to the current traversal point. Extension
/// allocates a new trace; an existing trace is never mutated, so contexts
/// can be shared freely across concurrent traversals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    path: Vec<String>,
}

impl Trace {
    pub fn root(segment: impl AsRef<str>) -> Self {
        Self {
            path: vec![segment.as_ref().to_string()],
        }
    }

    pub fn from_segments(path: Vec<String>) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn next(&self, segment: impl AsRef<str>) -> Self {
        let mut path = self.path.clone();
        path.push(segment.as_ref().to_string());
        Self { path }
    }

    pub fn segments(&self) -> &[String] {
        &self.path
    }

    fn render_colored(&self) -> String {
        self.path
            .iter()
            .map(|s| s.cyan().to_string())
            .collect::<Vec<_>>()
            .join(&" > ".magenta().to_string())
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join(" > "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Registration,
    DependencyCycle,
    EncodeValidation,
    DecodeStructural,
    DecodeSemantic,
    DecodeParse,
}

impl ErrorKind {
    fn title(&self) -> &'static str {
        match self {
            Self::Registration => "Registration Error",
            Self::DependencyCycle => "Dependency Cycle",
            Self::EncodeValidation => "Invalid Value",
            Self::DecodeStructural => "Unexpected Document Shape",
            Self::DecodeSemantic => "Invalid Document Content",
            Self::DecodeParse => "Parse Failure",
        }
    }

    fn why(&self) -> &'static str {
        match self {
            Self::Registration => "registered types must have unique, well-formed shapes",
            Self::DependencyCycle => {
                "schema forward declarations are written in dependency order, which a cycle makes impossible"
            }
            Self::EncodeValidation => "produced documents must validate against the schema",
            Self::DecodeStructural => "the document does not match the shape the schema requires",
            Self::DecodeSemantic => "the document is well-shaped but breaks a content rule",
            Self::DecodeParse => {
                "a leaf value could not be converted; the document likely does not validate against the schema"
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    // ---- registration ---- //
    #[error("`{name}` is already registered with a different shape")]
    ConflictingRegistration { name: String },
    #[error("field `{field}` of `{record}` is a reserved name")]
    ReservedField { record: String, field: String },
    #[error("field `{field}` of `{record}` is declared more than once")]
    DuplicateField { record: String, field: String },
    #[error("union variant `{discriminant}` appears more than once in `{record}`")]
    DuplicateDiscriminant { record: String, discriminant: String },
    #[error("`{record}` nests a union directly inside a union")]
    NestedUnion { record: String },
    #[error("`{record}` embeds record `{inner}` by value; register `{inner}` and reference it by name")]
    InlineRecord { record: String, inner: String },
    #[error("type `{name}` is not registered (at {trace})")]
    UnknownType { name: String, trace: Trace },

    // ---- dependency ordering ---- //
    #[error("dependency cycle: {}", cycle.join(" <- "))]
    DependencyCycle { cycle: Vec<String> },

    // ---- encode validation ---- //
    #[error("expected {expected}, got {got} (at {trace})")]
    InvalidValue {
        expected: String,
        got: String,
        trace: Trace,
    },
    #[error("{structure} takes {expected} values but {got} were provided (at {trace})")]
    WrongArity {
        structure: &'static str,
        expected: usize,
        got: usize,
        trace: Trace,
    },
    #[error("value of shape `{shape}` is not a variant of this union; expected one of: {} (at {trace})", known.join(", "))]
    NotAVariant {
        shape: String,
        known: Vec<String>,
        trace: Trace,
    },
    #[error("duplicate key {key} in map value (at {trace})")]
    DuplicateMapKey { key: String, trace: Trace },
    #[error("record value `{record}` is missing field `{field}` (at {trace})")]
    MissingField {
        record: String,
        field: String,
        trace: Trace,
    },

    // ---- decode, structural ---- //
    #[error("expected tag `{expected}` but found `{found}` in {structure} (at {trace})")]
    UnexpectedTag {
        structure: &'static str,
        expected: String,
        found: String,
        trace: Trace,
    },
    #[error("missing child `{expected}` in `{parent}` (at {trace})")]
    MissingChild {
        parent: String,
        expected: String,
        trace: Trace,
    },
    #[error("{structure} expects {expected} children but the document has {got} (at {trace})")]
    WrongChildCount {
        structure: &'static str,
        expected: usize,
        got: usize,
        trace: Trace,
    },
    #[error("union `{tag}` must contain exactly one variant, found {got} (at {trace})")]
    VariantCount { tag: String, got: usize, trace: Trace },
    #[error("`{found}` is not a variant of union `{tag}`; expected one of: {} (at {trace})", known.join(", "))]
    UnknownVariant {
        tag: String,
        found: String,
        known: Vec<String>,
        trace: Trace,
    },

    // ---- decode, semantic ---- //
    #[error("duplicate item {item} in {structure} `{tag}` (at {trace})")]
    DuplicateItem {
        structure: &'static str,
        tag: String,
        item: String,
        trace: Trace,
    },
    #[error("duplicate key {key} in map `{tag}` (at {trace})")]
    DuplicateKey {
        tag: String,
        key: String,
        trace: Trace,
    },

    // ---- decode, leaf conversion ---- //
    #[error("cannot parse {text:?} as {target} (at {trace})")]
    LeafParse {
        text: String,
        target: &'static str,
        trace: Trace,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConflictingRegistration { .. }
            | Self::ReservedField { .. }
            | Self::DuplicateField { .. }
            | Self::DuplicateDiscriminant { .. }
            | Self::NestedUnion { .. }
            | Self::InlineRecord { .. }
            | Self::UnknownType { .. } => ErrorKind::Registration,
            Self::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            Self::InvalidValue { .. }
            | Self::WrongArity { .. }
            | Self::NotAVariant { .. }
            | Self::DuplicateMapKey { .. }
            | Self::MissingField { .. } => ErrorKind::EncodeValidation,
            Self::UnexpectedTag { .. }
            | Self::MissingChild { .. }
            | Self::WrongChildCount { .. }
            | Self::VariantCount { .. }
            | Self::UnknownVariant { .. } => ErrorKind::DecodeStructural,
            Self::DuplicateItem { .. } | Self::DuplicateKey { .. } => ErrorKind::DecodeSemantic,
            Self::LeafParse { .. } => ErrorKind::DecodeParse,
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Self::UnknownType { trace, .. }
            | Self::InvalidValue { trace, .. }
            | Self::WrongArity { trace, .. }
            | Self::NotAVariant { trace, .. }
            | Self::DuplicateMapKey { trace, .. }
            | Self::MissingField { trace, .. }
            | Self::UnexpectedTag { trace, .. }
            | Self::MissingChild { trace, .. }
            | Self::WrongChildCount { trace, .. }
            | Self::VariantCount { trace, .. }
            | Self::UnknownVariant { trace, .. }
            | Self::DuplicateItem { trace, .. }
            | Self::DuplicateKey { trace, .. }
            | Self::LeafParse { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// Multi-line colored report in the What/Why/Where shape the CLI prints.
    pub fn render(&self) -> String {
        let kind = self.kind();
        let mut out = format!("{}\n", kind.title().red().bold());
        out.push_str(&format!("{}  {self}\n", "What:".blue()));
        out.push_str(&format!("{}   {}\n", "Why:".yellow(), kind.why()));
        if let Some(trace) = self.trace() {
            out.push_str(&format!("{} {}\n", "Where:".magenta(), trace.render_colored()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_extension_leaves_parent_untouched() {
        let root = Trace::root("config");
        let child = root.next("codes").next("listitem[1]");
        assert_eq!(root.segments(), ["config"]);
        assert_eq!(child.to_string(), "config > codes > listitem[1]");
    }

    #[test]
    fn kinds_partition_the_taxonomy() {
        let e = Error::DuplicateKey {
            tag: "m".into(),
            key: "3".into(),
            trace: Trace::root("m"),
        };
        assert_eq!(e.kind(), ErrorKind::DecodeSemantic);
        assert!(e.trace().is_some());

        let e = Error::DependencyCycle {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(e.kind(), ErrorKind::DependencyCycle);
        assert!(e.to_string().contains("A <- B <- A"));
    }

    #[test]
    fn render_names_the_failure_site() {
        let e = Error::MissingChild {
            parent: "Line".into(),
            expected: "to".into(),
            trace: Trace::root("line").next("to"),
        };
        let report = e.render();
        assert!(report.contains("to"));
        assert!(report.contains("What:"));
    }
}

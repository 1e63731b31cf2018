//! Forward-declaration ordering.
//!
//! Schema documents must declare every referenced type before its first
//! use, so emission walks the dependency graph depth-first and appends a
//! name only after everything it depends on. A node seen again while still
//! on the visiting stack is a cycle, which is fatal: no total order exists.

use std::collections::BTreeMap;

use crate::errors::{Error, Trace};
use crate::registry::Registry;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Visited,
}

/// Topologically order `root` and everything it transitively references.
/// Deterministic: dependency sets are sorted, so equal inputs give equal
/// orders. State is local to one call.
pub fn order(root: &str, reg: &Registry) -> Result<Vec<String>, Error> {
    let mut marks: BTreeMap<String, Mark> = BTreeMap::new();
    let mut path: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    visit(root, reg, &mut marks, &mut path, &mut out)?;
    Ok(out)
}

fn visit(
    name: &str,
    reg: &Registry,
    marks: &mut BTreeMap<String, Mark>,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), Error> {
    match marks.get(name) {
        Some(Mark::Visited) => return Ok(()),
        Some(Mark::Visiting) => {
            // reconstruct the cycle from the visiting stack
            let start = path.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(Error::DependencyCycle { cycle });
        }
        None => {}
    }

    let deps = reg
        .dependencies(name)
        .ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
            trace: Trace::from_segments(path.clone()),
        })?;

    marks.insert(name.to_string(), Mark::Visiting);
    path.push(name.to_string());
    for dep in &deps {
        visit(dep, reg, marks, path, out)?;
    }
    path.pop();
    marks.insert(name.to_string(), Mark::Visited);
    out.push(name.to_string());
    Ok(())
}

//! DOT encoding of type graphs.
//!
//! Output follows the layout gonum's DOT marshaller produces, so graphs
//! render the same with Graphviz:
//!
//! ```text
//! digraph goviz {
//! 	// Node definitions.
//! 	0 [label="example.com/people.Person"];
//! 	1 [label="string"];
//!
//! 	// Edge definitions.
//! 	0 -> 1;
//! }
//! ```

use std::fmt::Write as _;
use std::io;

use crate::error::Result;
use crate::graph::{EdgeKind, TypeGraph};

/// Encode `graph` as a DOT digraph called `name`.
///
/// Labels are written verbatim; the builder stores them already quoted.
pub fn marshal(graph: &TypeGraph, name: &str) -> Result<Vec<u8>> {
    let mut out = String::with_capacity(64 + graph.node_count() * 48);

    writeln!(out, "digraph {} {{", graph_id(name))?;

    out.push_str("\t// Node definitions.\n");
    for node in graph.nodes() {
        writeln!(out, "\t{} [label={}];", node.id, node.label)?;
    }

    if graph.edge_count() > 0 {
        out.push_str("\n\t// Edge definitions.\n");
        for (from, to, kind) in graph.edges() {
            match kind {
                EdgeKind::Contains => writeln!(out, "\t{from} -> {to};")?,
                EdgeKind::Cycle => writeln!(out, "\t{from} -> {to} [style=dashed];")?,
            }
        }
    }

    out.push_str("}\n");
    Ok(out.into_bytes())
}

/// Encode `graph` and write it to `writer`
pub fn write_dot<W: io::Write>(writer: &mut W, graph: &TypeGraph, name: &str) -> Result<()> {
    let bytes = marshal(graph, name)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Graph names that aren't plain DOT identifiers get quoted
fn graph_id(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

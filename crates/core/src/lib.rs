//! gograph Core Library
//!
//! Resolves a Go struct type by reference (`<package-path>.<TypeName>`),
//! unrolls its fields recursively into a containment graph, and encodes
//! the graph as DOT for Graphviz.
//!
//! ```no_run
//! use gograph_core::{config::Config, provider::GoSourceProvider};
//!
//! let provider = GoSourceProvider::new(&Config::from_env());
//! let graph = gograph_core::type_graph(
//!     &provider,
//!     "github.com/tbpg/gograph.node",
//!     Default::default(),
//!     &mut std::io::sink(),
//! )
//! .unwrap();
//! let dot = gograph_core::dot::marshal(&graph, "goviz").unwrap();
//! println!("{}", String::from_utf8_lossy(&dot));
//! ```

pub mod builder;
pub mod config;
pub mod constraint;
pub mod discovery;
pub mod dot;
pub mod error;
pub mod graph;
pub mod import;
pub mod parser;
pub mod provider;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use builder::{CyclePolicy, GraphBuilder};
pub use error::{Error, ErrorKind, Result};
pub use graph::{Edge, EdgeKind, Node, TypeGraph};
pub use provider::{GoSourceProvider, MemoryProvider, TypeProvider};
pub use resolver::Resolver;
pub use types::{CompositeType, FieldDescriptor, Package, TypeRef};

use std::io::Write;

/// Resolve `reference` and build its type graph
///
/// `trace` receives the indented field trace; pass `std::io::sink()` to
/// drop it. With [`CyclePolicy::Unroll`] this does not return for a type
/// that contains itself by value.
pub fn type_graph<P: TypeProvider>(
    provider: P,
    reference: &str,
    policy: CyclePolicy,
    trace: &mut dyn Write,
) -> Result<TypeGraph> {
    let resolver = Resolver::new(provider);
    let root = resolver.resolve(reference)?;
    let graph = GraphBuilder::new(&resolver, trace)
        .cycle_policy(policy)
        .build(&root);
    Ok(graph)
}

/// Resolve `reference` and return its graph as DOT bytes
pub fn type_graph_dot<P: TypeProvider>(
    provider: P,
    reference: &str,
    policy: CyclePolicy,
    graph_name: &str,
    trace: &mut dyn Write,
) -> Result<Vec<u8>> {
    let graph = type_graph(provider, reference, policy, trace)?;
    dot::marshal(&graph, graph_name)
}

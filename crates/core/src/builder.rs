//! Depth-first unrolling of a struct into a type graph
//!
//! Every field occurrence becomes a fresh node, even when the same type
//! shows up again elsewhere: the result is a tree with one node per field,
//! not a minimal DAG with one node per type. Node ids and edge order follow
//! a strict pre-order walk, so identical inputs serialize identically.
//!
//! Under the default [`CyclePolicy::Unroll`] a type that contains itself
//! by value (directly or through other structs) is expanded without bound
//! and the walk only ends when the stack does. Legal Go cannot declare such
//! a type, but a hand-built or malformed package can.
//! [`CyclePolicy::BackEdge`] cuts those cycles instead.

use std::io::Write;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, TypeGraph};
use crate::provider::TypeProvider;
use crate::resolver::Resolver;
use crate::types::{CompositeType, FieldDescriptor, TypeRef};

/// What to do when a struct field leads back to a struct being expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePolicy {
    /// Keep expanding; never terminates on a cyclic type
    #[default]
    Unroll,
    /// Stop, and point a dashed back-edge at the ancestor node instead
    BackEdge,
}

/// Builds a [`TypeGraph`] from a resolved root struct
pub struct GraphBuilder<'a, P> {
    resolver: &'a Resolver<P>,
    policy: CyclePolicy,
    trace: &'a mut dyn Write,
}

impl<'a, P: TypeProvider> GraphBuilder<'a, P> {
    /// `trace` receives one indented line per visited field; pass
    /// `std::io::sink()` to discard it.
    pub fn new(resolver: &'a Resolver<P>, trace: &'a mut dyn Write) -> Self {
        Self {
            resolver,
            policy: CyclePolicy::default(),
            trace,
        }
    }

    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(&mut self, root: &CompositeType) -> TypeGraph {
        let mut graph = TypeGraph::new();

        self.trace_line(0, &root.name);
        let root_node = graph.add_node(root.name.quoted());

        let mut path = vec![(root.name.clone(), root_node)];
        self.expand(&mut graph, root_node, &root.fields, 1, &mut path);

        tracing::debug!(
            "built graph for {}: {} nodes, {} edges",
            root.name,
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// `path` holds the struct types being expanded from the root down to
    /// `parent`, with their nodes. It is only consulted under
    /// [`CyclePolicy::BackEdge`].
    fn expand(
        &mut self,
        graph: &mut TypeGraph,
        parent: NodeIndex,
        fields: &[FieldDescriptor],
        depth: usize,
        path: &mut Vec<(TypeRef, NodeIndex)>,
    ) {
        for field in fields {
            let ty = &field.ty;
            let nested = self.resolver.struct_fields(ty);

            if self.policy == CyclePolicy::BackEdge && nested.is_some() {
                if let Some(&(_, ancestor)) = path.iter().find(|(seen, _)| seen == ty) {
                    self.trace_line(depth, &format!("{ty} (cycle)"));
                    graph.add_edge(parent, ancestor, EdgeKind::Cycle);
                    continue;
                }
            }

            self.trace_line(depth, ty);
            let node = graph.add_node(ty.quoted());
            graph.add_edge(parent, node, EdgeKind::Contains);

            if let Some(nested) = nested {
                path.push((ty.clone(), node));
                self.expand(graph, node, &nested, depth + 1, path);
                path.pop();
            }
        }
    }

    fn trace_line(&mut self, depth: usize, ty: &dyn std::fmt::Display) {
        // Tracing is best-effort and never affects the graph
        let _ = writeln!(self.trace, "{}{}", "  ".repeat(depth), ty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use crate::types::Package;

    const PKG: &str = "example.com/people";

    fn named(name: &str) -> TypeRef {
        TypeRef::named(PKG, name)
    }

    fn field(name: &str, ty: TypeRef) -> FieldDescriptor {
        FieldDescriptor::new(name, ty)
    }

    fn resolver() -> Resolver<MemoryProvider> {
        let people = Package::new(PKG, "people")
            .with_struct("Empty", vec![])
            .with_struct("Address", vec![field("City", TypeRef::basic("string"))])
            .with_struct(
                "Person",
                vec![
                    field("Name", TypeRef::basic("string")),
                    field("Home", named("Address")),
                ],
            )
            .with_struct(
                "Flat",
                vec![
                    field("A", TypeRef::basic("int")),
                    field("B", TypeRef::basic("string")),
                    field("C", TypeRef::slice(named("Person"))),
                ],
            )
            .with_struct("Pair", vec![field("A", named("Person")), field("B", named("Address"))])
            .with_struct("Twice", vec![field("X", named("Address")), field("Y", named("Address"))])
            .with_struct("Ouroboros", vec![field("Tail", named("Ouroboros"))])
            .with_struct("Yin", vec![field("Id", TypeRef::basic("int")), field("Other", named("Yang"))])
            .with_struct("Yang", vec![field("Other", named("Yin"))]);
        Resolver::new(MemoryProvider::new().with_package(people))
    }

    fn build(resolver: &Resolver<MemoryProvider>, name: &str, policy: CyclePolicy) -> TypeGraph {
        let root = resolver.resolve(&format!("{PKG}.{name}")).unwrap();
        let mut sink = std::io::sink();
        GraphBuilder::new(resolver, &mut sink).cycle_policy(policy).build(&root)
    }

    fn labels(graph: &TypeGraph) -> Vec<String> {
        graph.nodes().map(|n| n.label.clone()).collect()
    }

    #[test]
    fn test_empty_struct_is_single_node() {
        let graph = build(&resolver(), "Empty", CyclePolicy::Unroll);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_flat_struct_is_a_star() {
        let graph = build(&resolver(), "Flat", CyclePolicy::Unroll);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.edges().all(|(from, _, _)| from == 0));
    }

    #[test]
    fn test_person_example() {
        let graph = build(&resolver(), "Person", CyclePolicy::Unroll);

        assert_eq!(
            labels(&graph),
            vec![
                "\"example.com/people.Person\"",
                "\"string\"",
                "\"example.com/people.Address\"",
                "\"string\"",
            ]
        );
        let edges: Vec<_> = graph.edges().map(|(f, t, _)| (f, t)).collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (2, 3)]);
    }

    #[test]
    fn test_depth_first_ids() {
        let graph = build(&resolver(), "Pair", CyclePolicy::Unroll);

        // A: Person{Name, Home: Address{City}} takes ids 1..=4, B: Address{City} 5..=6
        assert_eq!(graph.node_count(), 7);
        let label_of = |id: usize| labels(&graph)[id].clone();
        assert_eq!(label_of(1), "\"example.com/people.Person\"");
        assert_eq!(label_of(4), "\"string\"");
        assert_eq!(label_of(5), "\"example.com/people.Address\"");
        assert!(graph.edges().any(|e| e == (0, 5, EdgeKind::Contains)));
    }

    #[test]
    fn test_repeated_types_are_not_merged() {
        let graph = build(&resolver(), "Twice", CyclePolicy::Unroll);

        assert_eq!(graph.node_count(), 5);
        let addresses = labels(&graph)
            .iter()
            .filter(|l| l.as_str() == "\"example.com/people.Address\"")
            .count();
        assert_eq!(addresses, 2);
    }

    #[test]
    fn test_tree_invariants() {
        let graph = build(&resolver(), "Pair", CyclePolicy::Unroll);

        let roots = graph.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].index(), 0);
        for node in graph.nodes().skip(1) {
            assert_eq!(graph.in_degree(NodeIndex::new(node.id), EdgeKind::Contains), 1);
        }
    }

    #[test]
    fn test_back_edge_on_self_reference() {
        let graph = build(&resolver(), "Ouroboros", CyclePolicy::BackEdge);

        assert_eq!(graph.node_count(), 1);
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![(0, 0, EdgeKind::Cycle)]);
    }

    #[test]
    fn test_back_edge_on_mutual_recursion() {
        let graph = build(&resolver(), "Yin", CyclePolicy::BackEdge);

        // Yin(0) -> int(1), Yin -> Yang(2), Yang -> back to Yin
        assert_eq!(graph.node_count(), 3);
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(
            edges,
            vec![
                (0, 1, EdgeKind::Contains),
                (0, 2, EdgeKind::Contains),
                (2, 0, EdgeKind::Cycle),
            ]
        );
    }

    #[test]
    fn test_back_edge_policy_leaves_acyclic_graphs_alone() {
        let r = resolver();
        let unrolled = build(&r, "Twice", CyclePolicy::Unroll);
        let cut = build(&r, "Twice", CyclePolicy::BackEdge);

        assert_eq!(labels(&unrolled), labels(&cut));
        assert_eq!(unrolled.edges().collect::<Vec<_>>(), cut.edges().collect::<Vec<_>>());
    }

    #[test]
    fn test_trace_output() {
        let r = resolver();
        let root = r.resolve("example.com/people.Person").unwrap();
        let mut trace = Vec::new();
        let graph = GraphBuilder::new(&r, &mut trace).build(&root);

        assert_eq!(
            String::from_utf8(trace).unwrap(),
            "example.com/people.Person\n  string\n  example.com/people.Address\n    string\n"
        );

        let mut sink = std::io::sink();
        let silent = GraphBuilder::new(&r, &mut sink).build(&root);
        assert_eq!(labels(&graph), labels(&silent));
    }
}

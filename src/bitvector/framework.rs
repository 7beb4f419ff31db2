//! Packaging bitvector dataflow problems over arbitrary fact types.
//!
//! Dataflow facts (definitions, live variables, available expressions and
//! the like) are mapped to bit positions through an [`OrdinalMapping`] and
//! the problem is solved over plain bitvectors.
//! After solving, the mapping translates the bits of a solution back into
//! the facts they stand for.

use std::hash::Hash;

use fnv::FnvHashMap;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{BitVector, BitVectorExtended, BitVectorVariable};
use crate::dataflow::{
    DataflowProblem, DataflowSolver, SolverConfig, TransferFunctionProvider, VariableFactory,
};
use crate::prelude::*;

/// A bijective mapping between dataflow facts and the bit positions
/// representing them.
///
/// Facts keep the bit they were first added under for the lifetime of the
/// mapping.
#[derive(Clone, Debug, Default)]
pub struct OrdinalMapping<T: Clone + Eq + Hash> {
    /// The facts in insertion order. The position of a fact is its bit.
    objects: Vec<T>,
    /// Maps each fact back to its bit.
    indices: FnvHashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> OrdinalMapping<T> {
    /// Create an empty mapping.
    pub fn new() -> Self {
        OrdinalMapping {
            objects: Vec::new(),
            indices: FnvHashMap::default(),
        }
    }

    /// Add a fact to the mapping and return its bit.
    ///
    /// If the fact was added before, the existing bit is returned.
    pub fn add(&mut self, object: T) -> usize {
        if let Some(index) = self.indices.get(&object) {
            return *index;
        }
        let index = self.objects.len();
        self.indices.insert(object.clone(), index);
        self.objects.push(object);
        index
    }

    /// Get the bit representing a fact, if the fact is part of the mapping.
    pub fn get_mapped_index(&self, object: &T) -> Option<usize> {
        self.indices.get(object).copied()
    }

    /// Get the fact represented by a bit, if the bit is mapped.
    pub fn get_mapped_object(&self, index: usize) -> Option<&T> {
        self.objects.get(index)
    }

    /// The number of mapped facts.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the mapping contains no facts.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over the facts in bit order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.objects.iter()
    }

    /// Encode a set of facts into a bitvector.
    ///
    /// Panics if one of the facts is not part of the mapping.
    pub fn encode<'a>(&self, objects: impl IntoIterator<Item = &'a T>) -> BitVector
    where
        T: 'a,
    {
        let mut bitvector = BitVector::with_capacity(self.len());
        for object in objects {
            let index = *self
                .indices
                .get(object)
                .expect("fact without a mapped bit");
            bitvector.insert_grow(index);
        }
        bitvector
    }

    /// Decode a bitvector into the facts represented by its set bits.
    ///
    /// Panics if one of the set bits is not mapped.
    pub fn decode<'a>(&'a self, bitvector: &'a BitVector) -> impl Iterator<Item = &'a T> {
        bitvector
            .ones()
            .map(|bit| self.objects.get(bit).expect("bit without a mapped fact"))
    }
}

/// A dataflow problem over bitvector values, bundled with the mapping
/// between bits and the dataflow facts they stand for.
///
/// The node and edge label types of the flow graph are free, since the
/// solver only inspects the graph structure.
pub struct BitVectorFramework<N, E, T, P>
where
    T: Clone + Eq + Hash,
    P: TransferFunctionProvider<Variable = BitVectorVariable>,
{
    /// The flow graph of the problem.
    graph: DiGraph<N, E>,
    /// The transfer functions and the meet operator of the problem.
    provider: P,
    /// The mapping between dataflow facts and bits.
    mapping: OrdinalMapping<T>,
}

impl<N, E, T, P> BitVectorFramework<N, E, T, P>
where
    T: Clone + Eq + Hash,
    P: TransferFunctionProvider<Variable = BitVectorVariable>,
{
    /// Bundle a flow graph, a transfer function provider and a fact mapping
    /// into a solvable problem.
    pub fn new(graph: DiGraph<N, E>, provider: P, mapping: OrdinalMapping<T>) -> Self {
        BitVectorFramework {
            graph,
            provider,
            mapping,
        }
    }

    /// Get the mapping between dataflow facts and bits.
    pub fn get_mapping(&self) -> &OrdinalMapping<T> {
        &self.mapping
    }
}

impl<N, E, T, P> DataflowProblem for BitVectorFramework<N, E, T, P>
where
    T: Clone + Eq + Hash,
    P: TransferFunctionProvider<Variable = BitVectorVariable>,
{
    type NodeLabel = N;
    type EdgeLabel = E;
    type Provider = P;

    fn get_flow_graph(&self) -> &DiGraph<N, E> {
        &self.graph
    }

    fn get_transfer_function_provider(&self) -> &P {
        &self.provider
    }
}

/// A variable factory creating empty-initialized bitvector variables.
///
/// Every variable starts at the bottom value of the powerset lattice, the
/// empty set rather than the unset state, so aliasing any two variables
/// while building the equation system cannot lose information.
/// Problems that seed boundary values (e.g. the parameters reaching a
/// function entry) should inject them through a transfer function like
/// [`BitVectorOr`](super::operators::BitVectorOr) instead of through the
/// factory.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitVectorFactory;

impl VariableFactory for BitVectorFactory {
    type Variable = BitVectorVariable;

    fn make_node_variable(&self, _node: NodeIndex, _is_in: bool) -> BitVectorVariable {
        BitVector::with_capacity(0).into()
    }

    fn make_edge_variable(&self, _src: NodeIndex, _dst: NodeIndex) -> BitVectorVariable {
        BitVector::with_capacity(0).into()
    }
}

/// Build a solver for a bitvector dataflow problem with empty-initialized
/// variables.
///
/// Returns an error if the flow graph of the problem contains parallel
/// edges.
pub fn create_bitvector_solver<N, E, T, P>(
    framework: BitVectorFramework<N, E, T, P>,
    config: SolverConfig,
) -> Result<DataflowSolver<BitVectorFramework<N, E, T, P>>, Error>
where
    T: Clone + Eq + Hash,
    P: TransferFunctionProvider<Variable = BitVectorVariable>,
{
    DataflowSolver::new(framework, &BitVectorFactory, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvector::operators::{BitVectorKillGen, BitVectorUnion};
    use std::collections::BTreeSet;

    /// Reaching definitions: each node kills and gens definition facts,
    /// the meet over branch joins is the union.
    struct ReachingDefinitions {
        kill_gen: FnvHashMap<NodeIndex, BitVectorKillGen>,
    }

    impl TransferFunctionProvider for ReachingDefinitions {
        type Variable = BitVectorVariable;
        type Transfer = BitVectorKillGen;
        type Meet = BitVectorUnion;

        fn has_node_transfer_functions(&self) -> bool {
            true
        }

        fn has_edge_transfer_functions(&self) -> bool {
            false
        }

        fn get_node_transfer_function(&self, node: NodeIndex) -> BitVectorKillGen {
            self.kill_gen[&node].clone()
        }

        fn get_edge_transfer_function(&self, _src: NodeIndex, _dst: NodeIndex) -> BitVectorKillGen {
            panic!("the problem has no edge transfer functions")
        }

        fn get_meet_operator(&self) -> BitVectorUnion {
            BitVectorUnion
        }
    }

    /// Definitions reaching the merge point of the diamond
    /// `entry -> {left, right} -> merge`:
    /// `x = 1` at the entry is killed on the left path and survives the
    /// right one.
    fn diamond_framework() -> BitVectorFramework<&'static str, (), &'static str, ReachingDefinitions>
    {
        let mut mapping = OrdinalMapping::new();
        let def_x1 = mapping.add("x = 1");
        let def_x2 = mapping.add("x = 2");
        let def_y3 = mapping.add("y = 3");
        let mut graph = DiGraph::new();
        let entry = graph.add_node("entry");
        let left = graph.add_node("left");
        let right = graph.add_node("right");
        let merge = graph.add_node("merge");
        graph.add_edge(entry, left, ());
        graph.add_edge(entry, right, ());
        graph.add_edge(left, merge, ());
        graph.add_edge(right, merge, ());
        let bits = |values: &[usize]| {
            let mut bitvector = BitVector::with_capacity(3);
            for &value in values {
                bitvector.insert_grow(value);
            }
            bitvector
        };
        let mut kill_gen = FnvHashMap::default();
        kill_gen.insert(entry, BitVectorKillGen::new(bits(&[def_x2]), bits(&[def_x1])));
        kill_gen.insert(left, BitVectorKillGen::new(bits(&[def_x1]), bits(&[def_x2])));
        kill_gen.insert(right, BitVectorKillGen::new(bits(&[]), bits(&[def_y3])));
        kill_gen.insert(merge, BitVectorKillGen::new(bits(&[]), bits(&[])));
        BitVectorFramework::new(graph, ReachingDefinitions { kill_gen }, mapping)
    }

    fn facts<'a>(
        mapping: &'a OrdinalMapping<&'static str>,
        value: &'a BitVectorVariable,
    ) -> BTreeSet<&'static str> {
        mapping
            .decode(value.get_value().unwrap())
            .copied()
            .collect()
    }

    #[test]
    fn mapping_assigns_stable_bits() {
        let mut mapping = OrdinalMapping::new();
        assert_eq!(mapping.add("a"), 0);
        assert_eq!(mapping.add("b"), 1);
        assert_eq!(mapping.add("a"), 0);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get_mapped_index(&"b"), Some(1));
        assert_eq!(mapping.get_mapped_object(1), Some(&"b"));
        assert_eq!(mapping.get_mapped_index(&"c"), None);
        assert_eq!(mapping.iter().copied().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn encode_and_decode_are_inverse() {
        let mut mapping = OrdinalMapping::new();
        mapping.add("a");
        mapping.add("b");
        mapping.add("c");
        let encoded = mapping.encode(["a", "c"].iter());
        assert_eq!(
            mapping.decode(&encoded).copied().collect::<Vec<_>>(),
            ["a", "c"]
        );
    }

    #[test]
    fn reaching_definitions_on_a_diamond() {
        let mut solver =
            create_bitvector_solver(diamond_framework(), SolverConfig::default()).unwrap();
        solver.solve();
        assert!(solver.has_stabilized());

        let graph = solver.get_problem().get_flow_graph();
        let names: FnvHashMap<&str, NodeIndex> = graph
            .node_indices()
            .map(|node| (graph[node], node))
            .collect();
        let mapping = solver.get_problem().get_mapping();

        let out_left = facts(mapping, solver.get_out(names["left"]).unwrap());
        assert_eq!(out_left, BTreeSet::from(["x = 2"]));
        let out_right = facts(mapping, solver.get_out(names["right"]).unwrap());
        assert_eq!(out_right, BTreeSet::from(["x = 1", "y = 3"]));
        // Both branch outputs reach the merge point.
        let in_merge = facts(mapping, solver.get_in(names["merge"]).unwrap());
        assert_eq!(in_merge, BTreeSet::from(["x = 1", "x = 2", "y = 3"]));
        let out_merge = facts(mapping, solver.get_out(names["merge"]).unwrap());
        assert_eq!(out_merge, in_merge);
    }

    #[test]
    fn factory_variables_start_empty() {
        let variable = BitVectorFactory.make_node_variable(NodeIndex::new(0), true);
        assert!(!variable.is_unset());
        assert_eq!(variable, BitVectorVariable::mock(&[]));
    }
}

//! Microbenchmarks for equation building and fixed-point solving.
//!
//! The benchmarks run on synthetic flow graphs:
//!
//! - a chain of kill/gen nodes, the best case for variable aliasing since
//!   every meet has a single predecessor,
//! - a ladder of branch-and-join diamonds, which keeps all of its join
//!   meets.
//!
//! Each shape is built and solved once with short-circuiting enabled and
//! once with it disabled, so the reports show the impact of the aliasing
//! pass on both phases.
//!
//! # Running the Benchmarks
//!
//! ```sh
//! cargo bench --bench "benchmarks"
//! ```
//!
//! To compare a change against the current master, save a baseline first:
//!
//! ```sh
//! git checkout master
//! cargo bench --bench "benchmarks" -- --save-baseline master
//! git checkout my_feature_branch
//! cargo bench --bench "benchmarks" -- --baseline master
//! ```

use std::time;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use petgraph::graph::{DiGraph, NodeIndex};

use kildall::bitvector::operators::{BitVectorKillGen, BitVectorUnion};
use kildall::bitvector::{
    create_bitvector_solver, BitVector, BitVectorExtended, BitVectorFramework, BitVectorVariable,
    OrdinalMapping,
};
use kildall::dataflow::{SolverConfig, TransferFunctionProvider};

/// A reaching-definitions style provider: every node generates its own
/// definition and kills nothing.
struct GenOwnBit {
    facts: usize,
}

impl TransferFunctionProvider for GenOwnBit {
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
        let mut gen = BitVector::with_capacity(self.facts);
        gen.insert_grow(node.index());
        BitVectorKillGen::new(BitVector::with_capacity(self.facts), gen)
    }

    fn get_edge_transfer_function(&self, _src: NodeIndex, _dst: NodeIndex) -> BitVectorKillGen {
        unreachable!("the benchmark problems have no edge transfer functions")
    }

    fn get_meet_operator(&self) -> BitVectorUnion {
        BitVectorUnion
    }
}

fn framework_over(graph: DiGraph<(), ()>) -> BitVectorFramework<(), (), usize, GenOwnBit> {
    let facts = graph.node_count();
    let mut mapping = OrdinalMapping::new();
    for fact in 0..facts {
        mapping.add(fact);
    }
    BitVectorFramework::new(graph, GenOwnBit { facts }, mapping)
}

/// A chain of `length` nodes.
fn chain_framework(length: usize) -> BitVectorFramework<(), (), usize, GenOwnBit> {
    let mut graph = DiGraph::new();
    let mut previous = graph.add_node(());
    for _ in 1..length {
        let next = graph.add_node(());
        graph.add_edge(previous, next, ());
        previous = next;
    }
    framework_over(graph)
}

/// A ladder of `levels` branch-and-join diamonds.
fn ladder_framework(levels: usize) -> BitVectorFramework<(), (), usize, GenOwnBit> {
    let mut graph = DiGraph::new();
    let mut join = graph.add_node(());
    for _ in 0..levels {
        let left = graph.add_node(());
        let right = graph.add_node(());
        let next_join = graph.add_node(());
        graph.add_edge(join, left, ());
        graph.add_edge(join, right, ());
        graph.add_edge(left, next_join, ());
        graph.add_edge(right, next_join, ());
        join = next_join;
    }
    framework_over(graph)
}

fn configurations() -> [(&'static str, SolverConfig); 2] {
    [
        ("short_circuited", SolverConfig::default()),
        (
            "full",
            SolverConfig {
                short_circuit: false,
                ..Default::default()
            },
        ),
    ]
}

fn bench_equation_building(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("equation_building");
    for (name, config) in configurations() {
        group.bench_function(BenchmarkId::new("chain", name), |bencher| {
            bencher.iter_batched(
                || chain_framework(1000),
                |framework| create_bitvector_solver(framework, config).unwrap(),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(BenchmarkId::new("ladder", name), |bencher| {
            bencher.iter_batched(
                || ladder_framework(300),
                |framework| create_bitvector_solver(framework, config).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_solving(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("solving");
    for (name, config) in configurations() {
        group.bench_function(BenchmarkId::new("chain", name), |bencher| {
            bencher.iter_batched(
                || create_bitvector_solver(chain_framework(1000), config).unwrap(),
                |mut solver| {
                    solver.solve();
                    solver
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(BenchmarkId::new("ladder", name), |bencher| {
            bencher.iter_batched(
                || create_bitvector_solver(ladder_framework(300), config).unwrap(),
                |mut solver| {
                    solver.solve();
                    solver
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .warm_up_time(time::Duration::new(2, 0))
        .measurement_time(time::Duration::new(5, 0));
    targets = bench_equation_building, bench_solving
);
criterion_main!(benches);

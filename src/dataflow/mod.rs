//! Solving dataflow problems over flow graphs.
//!
//! A dataflow problem couples a flow graph with a provider of per-node and
//! per-edge transfer functions and a meet operator.
//! The [`DataflowSolver`] translates the problem into an equation system over
//! IN, OUT and edge variables, applies algebraic short-circuit reductions,
//! solves the system to a fixed point with the engine from the
//! [`fixpoint`](crate::fixpoint) module and answers queries for the final
//! IN/OUT/edge values.
//!
//! # How to solve a dataflow problem
//!
//! Implement [`TransferFunctionProvider`] for the transfer functions of the
//! analysis and [`DataflowProblem`] for the bundle of flow graph and
//! provider, then construct a [`DataflowSolver`] with a [`VariableFactory`]
//! that creates the initial value of each variable.
//! For bit-vector analyses, ready-made pieces for all three contracts live in
//! the [`bitvector`](crate::bitvector) module.
//!
//! ```ignore
//! let mut solver = DataflowSolver::new(problem, &factory, SolverConfig::default())?;
//! solver.solve();
//!
//! if let Some(value) = solver.get_in(node) {
//!     // ...
//! }
//! ```

use petgraph::graph::{DiGraph, NodeIndex};

use crate::fixpoint::{MeetOperator, UnaryOperator, Variable};
use crate::prelude::*;

pub mod solver;

pub use solver::DataflowSolver;

/// The transfer functions of a dataflow problem.
///
/// A provider may declare node-transfer functions, edge-transfer functions,
/// both, or neither.
/// Without node-transfer functions no OUT variables are created;
/// without edge-transfer functions no edge variables are created;
/// with neither, the solver only propagates IN variables through meet
/// equations (pure reachability-style problems).
///
/// The `get_*_transfer_function` methods are only called for the function
/// kinds the provider declares through the `has_*` methods.
pub trait TransferFunctionProvider {
    /// The lattice value type of the analysis.
    type Variable: Variable;
    /// The node- and edge-transfer function type.
    type Transfer: UnaryOperator<Self::Variable>;
    /// The meet operator type.
    type Meet: MeetOperator<Self::Variable>;

    /// Returns whether the problem has node-transfer functions,
    /// i.e. whether OUT variables exist.
    fn has_node_transfer_functions(&self) -> bool;

    /// Returns whether the problem has edge-transfer functions,
    /// i.e. whether edge variables exist.
    fn has_edge_transfer_functions(&self) -> bool;

    /// The transfer function mapping `IN(node)` to `OUT(node)`.
    fn get_node_transfer_function(&self, node: NodeIndex) -> Self::Transfer;

    /// The transfer function attached to the edge from `src` to `dst`.
    fn get_edge_transfer_function(&self, src: NodeIndex, dst: NodeIndex) -> Self::Transfer;

    /// The operator combining the values flowing into a node from its
    /// predecessors.
    fn get_meet_operator(&self) -> Self::Meet;
}

/// A dataflow problem: a flow graph bundled with its transfer functions.
pub trait DataflowProblem {
    /// The node label type of the flow graph. Never inspected by the solver.
    type NodeLabel;
    /// The edge label type of the flow graph. Never inspected by the solver.
    type EdgeLabel;
    /// The transfer-function provider of the problem.
    type Provider: TransferFunctionProvider;

    /// Get the flow graph of the problem.
    ///
    /// The graph must not contain parallel edges;
    /// [`DataflowSolver::new`] rejects graphs that do.
    fn get_flow_graph(&self) -> &DiGraph<Self::NodeLabel, Self::EdgeLabel>;

    /// Get the transfer-function provider of the problem.
    fn get_transfer_function_provider(&self) -> &Self::Provider;
}

/// The lattice value type of a dataflow problem.
pub type VariableOf<P> =
    <<P as DataflowProblem>::Provider as TransferFunctionProvider>::Variable;
/// The transfer function type of a dataflow problem.
pub type TransferOf<P> =
    <<P as DataflowProblem>::Provider as TransferFunctionProvider>::Transfer;
/// The meet operator type of a dataflow problem.
pub type MeetOf<P> = <<P as DataflowProblem>::Provider as TransferFunctionProvider>::Meet;

/// Creates the initial value for each variable of a solve.
///
/// The initial value is the boundary value of the analysis:
/// it is what a slot holds if no statement ever writes it,
/// which is the case for the IN variables of nodes without predecessors.
///
/// When short-circuiting is enabled, aliased slots keep only the variable of
/// their union-find representative, so the factory must assign one uniform
/// bottom value to every slot.
/// Boundary facts for individual nodes then belong into the transfer
/// functions (e.g. an or-with-constant on the entry node);
/// alternatively, short-circuiting can be disabled in the
/// [`SolverConfig`].
pub trait VariableFactory {
    /// The lattice value type created by this factory.
    type Variable: Variable;

    /// Create the variable holding `IN(node)` (for `is_in == true`) or
    /// `OUT(node)` (for `is_in == false`).
    fn make_node_variable(&self, node: NodeIndex, is_in: bool) -> Self::Variable;

    /// Create the variable attached to the edge from `src` to `dst`.
    fn make_edge_variable(&self, src: NodeIndex, dst: NodeIndex) -> Self::Variable;
}

/// Configuration of a [`DataflowSolver`].
///
/// Both flags trade work for bookkeeping without affecting the solution:
/// the final fixed point is the same for every combination.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// If set, every statement is evaluated once at creation time during the
    /// build, with changes propagating to the already-created statements.
    /// If unset, statements are bulk-queued after the build and first
    /// evaluated by [`DataflowSolver::solve`].
    pub eager_evaluation: bool,
    /// If set, variables connected by identity transfer functions or
    /// single-predecessor no-op meets are aliased instead of being connected
    /// through copy statements.
    pub short_circuit: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            eager_evaluation: false,
            short_circuit: true,
        }
    }
}

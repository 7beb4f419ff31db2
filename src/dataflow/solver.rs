//! Translating a dataflow problem into an equation system and solving it.

use fnv::FnvHashMap;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::{
    DataflowProblem, MeetOf, SolverConfig, TransferFunctionProvider, TransferOf, VariableFactory,
    VariableOf,
};
use crate::fixpoint::{FixedPointSystem, MeetOperator, Statement, UnaryOperator, VariableIndex};
use crate::prelude::*;
use crate::utils::log::LogMessage;


/// One IN/OUT/edge variable slot of the problem being built.
///
/// The slot list built during variable creation maps each slot to a dense
/// index (its position in the list, which by construction equals the index
/// of the variable created for it).
/// The union-find recording the short-circuit reductions runs over those
/// dense indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum VariableSlot {
    /// The IN variable of a node.
    In(NodeIndex),
    /// The OUT variable of a node.
    Out(NodeIndex),
    /// The variable of the edge between two nodes.
    Edge(NodeIndex, NodeIndex),
}

/// A solver for a dataflow problem.
///
/// Constructing the solver builds the full equation system:
/// it creates the IN/OUT/edge variables through the given factory, aliases
/// variables connected by identity transfer functions or single-predecessor
/// no-op meets (unless short-circuiting is disabled) and emits the reduced
/// equation set.
/// [`solve`](Self::solve) then iterates the system to its fixed point, after
/// which the final values can be queried per node and edge.
pub struct DataflowSolver<P: DataflowProblem> {
    /// The problem being solved.
    problem: P,
    /// The equation system built from the problem.
    system: FixedPointSystem<VariableOf<P>, TransferOf<P>, MeetOf<P>>,
    /// Maps each node to its IN variable.
    node_in: FnvHashMap<NodeIndex, VariableIndex>,
    /// Maps each node to its OUT variable.
    /// Empty if the problem has no node-transfer functions.
    node_out: FnvHashMap<NodeIndex, VariableIndex>,
    /// Maps each edge to its variable.
    /// Empty if the problem has no edge-transfer functions.
    edge_vars: FnvHashMap<(NodeIndex, NodeIndex), VariableIndex>,
    /// The configuration the solver was built with.
    config: SolverConfig,
    /// Messages generated while building and solving the system.
    logs: Vec<LogMessage>,
}

impl<P: DataflowProblem> DataflowSolver<P> {
    /// Build the equation system for a dataflow problem.
    ///
    /// Returns an error if the flow graph contains parallel edges, since
    /// edge variables and meet operands are keyed by their `(src, dst)`
    /// node pair.
    pub fn new(
        problem: P,
        factory: &impl VariableFactory<Variable = VariableOf<P>>,
        config: SolverConfig,
    ) -> Result<Self, Error> {
        let graph = problem.get_flow_graph();
        if let Some((src, dst)) = graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target()))
            .duplicates()
            .next()
        {
            return Err(anyhow!(
                "flow graph contains parallel edges from node {} to node {}",
                src.index(),
                dst.index()
            ));
        }
        let mut solver = DataflowSolver {
            problem,
            system: FixedPointSystem::new(),
            node_in: FnvHashMap::default(),
            node_out: FnvHashMap::default(),
            edge_vars: FnvHashMap::default(),
            config,
            logs: Vec::new(),
        };
        let slots = solver.create_variables(factory);
        debug_assert_eq!(slots.len(), solver.system.variable_count());
        if config.short_circuit {
            solver.short_circuit_variables(&slots);
        }
        solver.emit_statements();
        if !config.eager_evaluation {
            solver.system.enqueue_all();
        }
        solver.logs.push(
            LogMessage::new_debug(format!(
                "created {} variables and {} statements for {} nodes",
                solver.system.variable_count(),
                solver.system.statement_count(),
                solver.problem.get_flow_graph().node_count()
            ))
            .source("equation builder"),
        );
        Ok(solver)
    }

    /// Run the worklist algorithm until the fixed point is reached.
    pub fn solve(&mut self) {
        self.system.solve();
        self.logs.push(
            LogMessage::new_info(format!(
                "fixed point reached after {} statement evaluations",
                self.system.evaluations()
            ))
            .source("solver"),
        );
    }

    /// Run the worklist algorithm for at most `max_evaluations` statement
    /// evaluations, leaving any remaining work queued.
    ///
    /// The budget is only checked between statement evaluations.
    pub fn solve_with_max_evaluations(&mut self, max_evaluations: u64) {
        self.system.solve_with_max_evaluations(max_evaluations);
        if !self.system.has_stabilized() {
            self.logs.push(
                LogMessage::new_info(format!(
                    "evaluation budget exhausted after {} statement evaluations",
                    self.system.evaluations()
                ))
                .source("solver"),
            );
        }
    }

    /// Returns `true` if the variable assignment is a fixed point of the
    /// equation system.
    pub fn has_stabilized(&self) -> bool {
        self.system.has_stabilized()
    }

    /// Get the IN value of a node, or `None` if the node has no IN variable
    /// (i.e. it is not part of the flow graph the system was built from).
    pub fn get_in(&self, node: NodeIndex) -> Option<&VariableOf<P>> {
        self.node_in
            .get(&node)
            .map(|index| self.system.variable(*index))
    }

    /// Get the OUT value of a node, or `None` if the node has no OUT
    /// variable (unknown node, or a problem without node-transfer
    /// functions).
    pub fn get_out(&self, node: NodeIndex) -> Option<&VariableOf<P>> {
        self.node_out
            .get(&node)
            .map(|index| self.system.variable(*index))
    }

    /// Get the value of the edge from `src` to `dst`, or `None` if the edge
    /// has no variable (unknown edge, or a problem without edge-transfer
    /// functions).
    pub fn get_edge(&self, src: NodeIndex, dst: NodeIndex) -> Option<&VariableOf<P>> {
        self.get_edge_by_key((src, dst))
    }

    /// Get the value of an edge by its `(src, dst)` key.
    pub fn get_edge_by_key(&self, key: (NodeIndex, NodeIndex)) -> Option<&VariableOf<P>> {
        self.edge_vars
            .get(&key)
            .map(|index| self.system.variable(*index))
    }

    /// Get the problem this solver was built for.
    pub fn get_problem(&self) -> &P {
        &self.problem
    }

    /// Get the underlying equation system.
    pub fn get_system(&self) -> &FixedPointSystem<VariableOf<P>, TransferOf<P>, MeetOf<P>> {
        &self.system
    }

    /// The total number of statement evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.system.evaluations()
    }

    /// The messages generated while building and solving the system.
    pub fn logs(&self) -> &[LogMessage] {
        &self.logs
    }

    /// Create the IN/OUT/edge variables of the problem and return the slot
    /// list mapping dense indices to slots.
    ///
    /// Slot `i` of the returned list corresponds to variable index `i`.
    fn create_variables(
        &mut self,
        factory: &impl VariableFactory<Variable = VariableOf<P>>,
    ) -> Vec<VariableSlot> {
        let graph = self.problem.get_flow_graph();
        let functions = self.problem.get_transfer_function_provider();
        let mut slots = Vec::new();
        for node in graph.node_indices() {
            let in_variable = self
                .system
                .add_variable(factory.make_node_variable(node, true));
            self.node_in.insert(node, in_variable);
            slots.push(VariableSlot::In(node));
            if functions.has_node_transfer_functions() {
                let out_variable = self
                    .system
                    .add_variable(factory.make_node_variable(node, false));
                self.node_out.insert(node, out_variable);
                slots.push(VariableSlot::Out(node));
            }
            if functions.has_edge_transfer_functions() {
                for successor in graph.neighbors_directed(node, Direction::Outgoing) {
                    let edge_variable = self
                        .system
                        .add_variable(factory.make_edge_variable(node, successor));
                    self.edge_vars.insert((node, successor), edge_variable);
                    slots.push(VariableSlot::Edge(node, successor));
                }
            }
        }
        slots
    }

    /// Record the short-circuit reductions in a union-find over the slot
    /// list and redirect the variable tables to the representatives.
    fn short_circuit_variables(&mut self, slots: &[VariableSlot]) {
        let slot_index: FnvHashMap<VariableSlot, usize> = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (*slot, index))
            .collect();
        let mut union_find: UnionFind<usize> = UnionFind::new(slots.len());
        let mut did_something = false;
        if self
            .problem
            .get_transfer_function_provider()
            .get_meet_operator()
            .is_unary_no_op()
        {
            did_something |= self.short_circuit_unary_meets(&slot_index, &mut union_find);
        }
        did_something |= self.short_circuit_identities(&slot_index, &mut union_find);
        if did_something {
            self.redirect_to_representatives(slots, union_find);
        }
    }

    /// Alias `IN(node)` with the incoming flow variable for every node with
    /// exactly one predecessor.
    fn short_circuit_unary_meets(
        &self,
        slot_index: &FnvHashMap<VariableSlot, usize>,
        union_find: &mut UnionFind<usize>,
    ) -> bool {
        let graph = self.problem.get_flow_graph();
        let mut did_something = false;
        for node in graph.node_indices() {
            let mut predecessors = graph.neighbors_directed(node, Direction::Incoming);
            if let (Some(predecessor), None) = (predecessors.next(), predecessors.next()) {
                did_something |= union_find.union(
                    slot_index[&VariableSlot::In(node)],
                    slot_index[&self.flow_source_slot(predecessor, node)],
                );
            }
        }
        did_something
    }

    /// Alias the left- and right-hand variables of every identity transfer
    /// function.
    fn short_circuit_identities(
        &self,
        slot_index: &FnvHashMap<VariableSlot, usize>,
        union_find: &mut UnionFind<usize>,
    ) -> bool {
        let graph = self.problem.get_flow_graph();
        let functions = self.problem.get_transfer_function_provider();
        let mut did_something = false;
        if functions.has_node_transfer_functions() {
            for node in graph.node_indices() {
                if functions.get_node_transfer_function(node).is_identity() {
                    did_something |= union_find.union(
                        slot_index[&VariableSlot::In(node)],
                        slot_index[&VariableSlot::Out(node)],
                    );
                }
            }
        }
        if functions.has_edge_transfer_functions() {
            for edge in graph.edge_references() {
                let (src, dst) = (edge.source(), edge.target());
                if functions.get_edge_transfer_function(src, dst).is_identity() {
                    let source_slot = if functions.has_node_transfer_functions() {
                        VariableSlot::Out(src)
                    } else {
                        VariableSlot::In(src)
                    };
                    did_something |= union_find.union(
                        slot_index[&VariableSlot::Edge(src, dst)],
                        slot_index[&source_slot],
                    );
                }
            }
        }
        did_something
    }

    /// Redirect every variable table entry to the variable of its union-find
    /// representative.
    ///
    /// The labeling maps each slot directly to its final representative, so
    /// no table entry can end up pointing at another non-representative slot
    /// and running the redirection again would change nothing.
    fn redirect_to_representatives(
        &mut self,
        slots: &[VariableSlot],
        union_find: UnionFind<usize>,
    ) {
        let representatives = union_find.into_labeling();
        let mut aliased = 0_u64;
        for (index, slot) in slots.iter().enumerate() {
            let representative = VariableIndex(representatives[index]);
            if representatives[index] != index {
                aliased += 1;
            }
            match *slot {
                VariableSlot::In(node) => {
                    self.node_in.insert(node, representative);
                }
                VariableSlot::Out(node) => {
                    self.node_out.insert(node, representative);
                }
                VariableSlot::Edge(src, dst) => {
                    self.edge_vars.insert((src, dst), representative);
                }
            }
        }
        self.logs.push(
            LogMessage::new_debug(format!("short-circuiting aliased {aliased} variable slots"))
                .source("equation builder"),
        );
    }

    /// The slot a predecessor contributes to the meet at `node`:
    /// the connecting edge variable if edge-transfer functions exist,
    /// else the predecessor's OUT variable if node-transfer functions exist,
    /// else the predecessor's IN variable.
    fn flow_source_slot(&self, predecessor: NodeIndex, node: NodeIndex) -> VariableSlot {
        let functions = self.problem.get_transfer_function_provider();
        if functions.has_edge_transfer_functions() {
            VariableSlot::Edge(predecessor, node)
        } else if functions.has_node_transfer_functions() {
            VariableSlot::Out(predecessor)
        } else {
            VariableSlot::In(predecessor)
        }
    }

    /// The table entry for a slot, resolved through any short-circuit
    /// redirection.
    fn variable_of(&self, slot: VariableSlot) -> VariableIndex {
        match slot {
            VariableSlot::In(node) => self.node_in[&node],
            VariableSlot::Out(node) => self.node_out[&node],
            VariableSlot::Edge(src, dst) => self.edge_vars[&(src, dst)],
        }
    }

    /// Emit the reduced equation set into the fixed-point system.
    ///
    /// Nodes reach the meet threshold with two predecessors if
    /// single-predecessor meets were elided, with one otherwise.
    /// Identity transfer functions never produce statements: their
    /// variables were either aliased by the short-circuit pass or, with
    /// short-circuiting disabled, their statements are emitted like any
    /// other transfer function.
    fn emit_statements(&mut self) {
        // With eager evaluation every statement gets its initial visit right
        // when it is emitted, so later statements already see the values
        // produced by earlier ones.
        let eager = self.config.eager_evaluation;
        let functions = self.problem.get_transfer_function_provider();
        let meet_elision =
            self.config.short_circuit && functions.get_meet_operator().is_unary_no_op();
        let meet_threshold = if meet_elision { 2 } else { 1 };
        let identity_elision = self.config.short_circuit;
        let graph = self.problem.get_flow_graph();
        for node in graph.node_indices() {
            let predecessor_count = graph.neighbors_directed(node, Direction::Incoming).count();
            if predecessor_count >= meet_threshold {
                let rhs: Vec<VariableIndex> = graph
                    .neighbors_directed(node, Direction::Incoming)
                    .map(|predecessor| self.variable_of(self.flow_source_slot(predecessor, node)))
                    .collect();
                let statement = self.system.add_statement(Statement::Meet {
                    operator: functions.get_meet_operator(),
                    lhs: self.node_in[&node],
                    rhs,
                });
                if eager {
                    self.system.evaluate_statement(statement);
                }
            }
        }
        if functions.has_node_transfer_functions() {
            for node in graph.node_indices() {
                let transfer = functions.get_node_transfer_function(node);
                if !(identity_elision && transfer.is_identity()) {
                    let statement = self.system.add_statement(Statement::Unary {
                        operator: transfer,
                        lhs: self.node_out[&node],
                        rhs: self.node_in[&node],
                    });
                    if eager {
                        self.system.evaluate_statement(statement);
                    }
                }
            }
        }
        if functions.has_edge_transfer_functions() {
            for edge in graph.edge_references() {
                let (src, dst) = (edge.source(), edge.target());
                let transfer = functions.get_edge_transfer_function(src, dst);
                if !(identity_elision && transfer.is_identity()) {
                    let rhs = if functions.has_node_transfer_functions() {
                        self.node_out[&src]
                    } else {
                        self.node_in[&src]
                    };
                    let statement = self.system.add_statement(Statement::Unary {
                        operator: transfer,
                        lhs: self.edge_vars[&(src, dst)],
                        rhs,
                    });
                    if eager {
                        self.system.evaluate_statement(statement);
                    }
                }
            }
        }
    }
}

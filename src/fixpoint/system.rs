//! The equation system owning all variables and statements of one solve,
//! together with the worklist algorithm driving it to a fixed point.

use std::collections::BTreeSet;

use super::statement::Statement;
use super::{Evaluation, MeetOperator, StatementIndex, UnaryOperator, Variable, VariableIndex};

/// An equation system over lattice variables plus the state of its worklist
/// iteration.
///
/// The system owns all variables and statements for the lifetime of one
/// solve.
/// A statement is in one of three states: never scheduled, queued in the
/// worklist, or evaluated and currently not queued.
/// Evaluating a statement whose verdict is [`Evaluation::Changed`] re-queues
/// every statement reading the mutated variable.
/// Once the worklist runs empty, re-evaluating any statement would report
/// [`Evaluation::NotChanged`], i.e. the variable assignment is a fixed point.
///
/// # Usage
///
/// ```ignore
/// let mut system = FixedPointSystem::new();
/// let input = system.add_variable(initial_value);
/// let output = system.add_variable(initial_value);
/// system.add_statement(Statement::Unary { operator, lhs: output, rhs: input });
///
/// system.enqueue_all();
/// system.solve();
///
/// let solution = system.variable(output);
/// ```
pub struct FixedPointSystem<V, U, M> {
    /// The variable arena. Aliased table slots share one entry.
    variables: Vec<V>,
    /// The statement arena.
    statements: Vec<Statement<U, M>>,
    /// For each variable, the statements whose right-hand side reads it.
    uses: Vec<Vec<StatementIndex>>,
    /// Indices of the statements queued for (re-)evaluation.
    worklist: BTreeSet<StatementIndex>,
    /// Number of statement evaluations performed so far.
    evaluations: u64,
}

impl<V, U, M> FixedPointSystem<V, U, M>
where
    V: Variable,
    U: UnaryOperator<V>,
    M: MeetOperator<V>,
{
    /// Create an empty equation system.
    pub fn new() -> Self {
        FixedPointSystem {
            variables: Vec::new(),
            statements: Vec::new(),
            uses: Vec::new(),
            worklist: BTreeSet::new(),
            evaluations: 0,
        }
    }

    /// Add a variable holding the given initial value and return its index.
    pub fn add_variable(&mut self, value: V) -> VariableIndex {
        let index = VariableIndex(self.variables.len());
        self.variables.push(value);
        self.uses.push(Vec::new());
        index
    }

    /// Get the current value of a variable.
    pub fn variable(&self, index: VariableIndex) -> &V {
        &self.variables[index.0]
    }

    /// Add a statement to the system and return its index.
    ///
    /// The statement starts out unscheduled; use [`enqueue`](Self::enqueue),
    /// [`enqueue_all`](Self::enqueue_all) or
    /// [`evaluate_statement`](Self::evaluate_statement) to give it its
    /// initial visit.
    ///
    /// Panics if the statement reads or writes a variable that was never
    /// created or if a meet statement has no operands.
    pub fn add_statement(&mut self, statement: Statement<U, M>) -> StatementIndex {
        if let Statement::Meet { rhs, .. } = &statement {
            assert!(!rhs.is_empty(), "meet statement without operands");
        }
        assert!(
            statement.lhs().0 < self.variables.len(),
            "statement writes a variable that was never created"
        );
        let index = StatementIndex(self.statements.len());
        for input in statement.rhs() {
            assert!(
                input.0 < self.variables.len(),
                "statement reads a variable that was never created"
            );
            let users = &mut self.uses[input.0];
            if !users.contains(&index) {
                users.push(index);
            }
        }
        self.statements.push(statement);
        index
    }

    /// Get a statement by its index.
    pub fn statement(&self, index: StatementIndex) -> &Statement<U, M> {
        &self.statements[index.0]
    }

    /// Queue a statement for evaluation if it is not already queued.
    pub fn enqueue(&mut self, statement: StatementIndex) {
        assert!(statement.0 < self.statements.len(), "unknown statement");
        self.worklist.insert(statement);
    }

    /// Queue every statement of the system for evaluation.
    pub fn enqueue_all(&mut self) {
        for index in 0..self.statements.len() {
            self.worklist.insert(StatementIndex(index));
        }
    }

    /// Evaluate a single statement right now, without going through the
    /// worklist.
    ///
    /// If the left-hand variable changes, all statements reading it are
    /// queued for (re-)evaluation.
    pub fn evaluate_statement(&mut self, index: StatementIndex) -> Evaluation {
        let statement = &self.statements[index.0];
        let written = statement.lhs();
        // The left-hand value is recomputed into a local clone first,
        // so that statements whose left-hand variable also occurs on their
        // right-hand side read a consistent value.
        let verdict = match statement {
            Statement::Unary { operator, lhs, rhs } => {
                let mut new_value = self.variables[lhs.0].clone();
                let verdict = operator.evaluate(&mut new_value, &self.variables[rhs.0]);
                if verdict.is_changed() {
                    self.variables[lhs.0] = new_value;
                }
                verdict
            }
            Statement::Meet { operator, lhs, rhs } => {
                let mut new_value = self.variables[lhs.0].clone();
                let operands: Vec<&V> = rhs.iter().map(|input| &self.variables[input.0]).collect();
                let verdict = operator.evaluate(&mut new_value, &operands);
                if verdict.is_changed() {
                    self.variables[lhs.0] = new_value;
                }
                verdict
            }
        };
        self.evaluations += 1;
        if verdict.is_changed() {
            for user in &self.uses[written.0] {
                self.worklist.insert(*user);
            }
        }
        verdict
    }

    /// Run the worklist algorithm until the fixed point is reached.
    ///
    /// If some operator is not monotone or some lattice has infinite height,
    /// this function will not terminate.
    pub fn solve(&mut self) {
        while let Some(next) = self.worklist.pop_first() {
            self.evaluate_statement(next);
        }
    }

    /// Run the worklist algorithm for at most `max_evaluations` statement
    /// evaluations.
    ///
    /// The budget is only checked between evaluations, so a statement is
    /// never left half-evaluated.
    /// Unprocessed statements stay queued; call [`solve`](Self::solve) to
    /// finish the computation or [`has_stabilized`](Self::has_stabilized) to
    /// check whether the budget sufficed.
    pub fn solve_with_max_evaluations(&mut self, max_evaluations: u64) {
        let mut evaluations_left = max_evaluations;
        while evaluations_left > 0 {
            match self.worklist.pop_first() {
                Some(next) => {
                    self.evaluate_statement(next);
                    evaluations_left -= 1;
                }
                None => return,
            }
        }
    }

    /// Returns `true` if the worklist is empty, i.e. the current variable
    /// assignment is a fixed point of the system.
    pub fn has_stabilized(&self) -> bool {
        self.worklist.is_empty()
    }

    /// The number of variables in the system, aliased slots counted once per
    /// created variable.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// The number of statements in the system.
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// The total number of statement evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }
}

impl<V, U, M> Default for FixedPointSystem<V, U, M>
where
    V: Variable,
    U: UnaryOperator<V>,
    M: MeetOperator<V>,
{
    fn default() -> Self {
        Self::new()
    }
}

//! The equation representation used by the fixed-point engine.

use super::VariableIndex;

/// A single dataflow equation `lhs = operator(rhs..)`.
///
/// Statements do not hold their variables directly;
/// they refer into the variable arena of the owning
/// [`FixedPointSystem`](super::FixedPointSystem) by index.
/// The same variable index may appear on both sides of a statement
/// (for example after short-circuiting has aliased slots on a self-loop);
/// the evaluation protocol of the system handles this case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement<U, M> {
    /// An equation `lhs = operator(rhs)` with a unary transfer function.
    Unary {
        /// The transfer function.
        operator: U,
        /// The variable written by this equation.
        lhs: VariableIndex,
        /// The single input variable.
        rhs: VariableIndex,
    },
    /// An equation `lhs = meet(rhs..)` combining several input variables.
    Meet {
        /// The meet operator.
        operator: M,
        /// The variable written by this equation.
        lhs: VariableIndex,
        /// The input variables, ordered as the flow graph orders the
        /// corresponding predecessors.
        rhs: Vec<VariableIndex>,
    },
}

impl<U, M> Statement<U, M> {
    /// The variable written by this statement.
    pub fn lhs(&self) -> VariableIndex {
        match self {
            Statement::Unary { lhs, .. } => *lhs,
            Statement::Meet { lhs, .. } => *lhs,
        }
    }

    /// The variables read by this statement.
    pub fn rhs(&self) -> &[VariableIndex] {
        match self {
            Statement::Unary { rhs, .. } => std::slice::from_ref(rhs),
            Statement::Meet { rhs, .. } => rhs,
        }
    }
}

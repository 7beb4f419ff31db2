//! Operator contracts for the statements of an equation system.

use super::{Evaluation, Variable};

/// A transfer function with a single right-hand input.
///
/// Implementations must be pure apart from mutating `lhs`:
/// the recomputed left-hand value may only depend on the current `lhs`
/// and `rhs` values and on data bound at operator construction time.
pub trait UnaryOperator<V: Variable> {
    /// Recompute `lhs` from `rhs`, mutate `lhs` only if the result differs
    /// from its current value and report whether a mutation happened.
    fn evaluate(&self, lhs: &mut V, rhs: &V) -> Evaluation;

    /// Returns whether this operator is the identity function.
    ///
    /// The equation builder aliases the left- and right-hand variables of
    /// identity transfer functions instead of emitting a copy statement,
    /// so `evaluate` is never called for them during a normal solve.
    fn is_identity(&self) -> bool {
        false
    }
}

/// An operator combining the values flowing in from all predecessors of a
/// node.
pub trait MeetOperator<V: Variable> {
    /// Recompute `lhs` as the meet over `operands`, mutate `lhs` only if the
    /// result differs from its current value and report whether a mutation
    /// happened.
    ///
    /// `operands` is never empty: nodes without predecessors do not get meet
    /// statements.
    fn evaluate(&self, lhs: &mut V, operands: &[&V]) -> Evaluation;

    /// Returns whether the meet of a single operand equals that operand
    /// exactly.
    ///
    /// If true, the equation builder aliases the IN variable of
    /// single-predecessor nodes with the incoming flow variable instead of
    /// emitting a one-operand meet statement.
    fn is_unary_no_op(&self) -> bool {
        false
    }
}

//! The generic fixed-point engine: lattice variables, operators, equations
//! and the worklist algorithm that drives them to a fixed point.
//!
//! For general information on dataflow analysis using fixpoint algorithms see
//! [Wikipedia](https://en.wikipedia.org/wiki/Data-flow_analysis).
//!
//! # General implementation notes
//!
//! An equation system consists of lattice-valued variables and statements of
//! the form `lhs = operator(rhs_1, .., rhs_n)`.
//! Evaluating a statement recomputes its left-hand variable from its
//! right-hand variables and reports whether the left-hand value changed.
//! The worklist algorithm repeatedly evaluates statements whose inputs
//! changed until no evaluation reports a change anymore.
//! Since all operators are monotone and the lattices have finite height,
//! this process terminates in the fixed point of the system.
//!
//! Variables and statements are owned by a [`FixedPointSystem`] and referred
//! to through dense indices.
//! Two table slots produced by the same flow-graph position may share one
//! variable index; this is how the equation builder in the
//! [`dataflow`](crate::dataflow) module expresses that short-circuiting has
//! aliased the slots.

use crate::prelude::*;

pub mod operator;
pub mod statement;
pub mod system;

pub use operator::{MeetOperator, UnaryOperator};
pub use statement::Statement;
pub use system::FixedPointSystem;

/// A mutable lattice value.
///
/// The partial order itself is never queried by the engine;
/// it only compares values for equality and copies them.
/// Implementors must ensure that all operators applied to their variables are
/// monotone, otherwise the worklist algorithm may not terminate.
pub trait Variable: Eq + Clone {
    /// Returns whether `self` and `other` hold the same lattice value.
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    /// Overwrite the value of `self` with the value of `other`.
    fn copy_state(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

/// The verdict of a statement evaluation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// The left-hand variable was mutated.
    Changed,
    /// The left-hand variable already held the recomputed value.
    NotChanged,
}

impl Evaluation {
    /// Returns whether the evaluation mutated the left-hand variable.
    pub fn is_changed(self) -> bool {
        matches!(self, Evaluation::Changed)
    }
}

/// The index of a variable inside its owning [`FixedPointSystem`].
///
/// Indices are dense and assigned in creation order.
/// Aliased table slots share one index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableIndex(pub(crate) usize);

impl VariableIndex {
    /// Return the dense index as a `usize`.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The index of a statement inside its owning [`FixedPointSystem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementIndex(pub(crate) usize);

impl StatementIndex {
    /// Return the dense index as a `usize`.
    pub fn index(self) -> usize {
        self.0
    }
}

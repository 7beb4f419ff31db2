//! Bitvector lattice values for dataflow analysis.
//!
//! A [`BitVectorVariable`] holds a finite set of dataflow facts encoded as
//! bit positions.
//! The accompanying [`operators`] module provides the common transfer
//! functions and meet operators over such sets, and the [`framework`] module
//! connects the pieces to a [`DataflowSolver`](crate::dataflow::DataflowSolver),
//! including the mapping between bit positions and the facts they encode.

use std::fmt;

use itertools::Itertools;

use crate::fixpoint::Variable;

pub mod framework;
pub mod operators;

pub use framework::{create_bitvector_solver, BitVectorFactory, BitVectorFramework, OrdinalMapping};

/// A fixed-size set of bits.
pub type BitVector = fixedbitset::FixedBitSet;

/// Extension methods for [`BitVector`].
pub trait BitVectorExtended {
    /// Set a bit, growing the bitvector first if the bit is out of range.
    fn insert_grow(&mut self, bit: usize);
}

impl BitVectorExtended for BitVector {
    fn insert_grow(&mut self, bit: usize) {
        if bit >= self.len() {
            self.grow(bit + 1);
        }
        self.insert(bit);
    }
}

/// The value of a bitvector dataflow variable.
///
/// The value is either a set of bits or unset, where unset marks a variable
/// the solver has not reached yet.
/// An unset value is different from an empty set of bits.
///
/// Two values are equal if they contain the same bits.
/// The internal capacities of the bitvectors do not matter for equality,
/// since growing a bitvector only appends zero bits.
#[derive(Clone, Debug, Default)]
pub struct BitVectorVariable {
    value: Option<BitVector>,
}

impl BitVectorVariable {
    /// Create an unset variable value.
    pub fn new() -> Self {
        BitVectorVariable { value: None }
    }

    /// Get the contained bitvector, or `None` if the value is unset.
    pub fn get_value(&self) -> Option<&BitVector> {
        self.value.as_ref()
    }

    /// Replace the contained bitvector.
    pub fn set_value(&mut self, value: BitVector) {
        self.value = Some(value);
    }

    /// Returns `true` if the value is unset.
    pub fn is_unset(&self) -> bool {
        self.value.is_none()
    }
}

impl From<BitVector> for BitVectorVariable {
    fn from(value: BitVector) -> Self {
        BitVectorVariable { value: Some(value) }
    }
}

#[cfg(test)]
impl BitVectorVariable {
    /// Build a value containing the given bits. Shorthand for tests.
    pub fn mock(bits: &[usize]) -> Self {
        let mut bitvector = BitVector::with_capacity(8);
        for &bit in bits {
            bitvector.insert_grow(bit);
        }
        bitvector.into()
    }
}

impl PartialEq for BitVectorVariable {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Some(lhs), Some(rhs)) => lhs.ones().eq(rhs.ones()),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for BitVectorVariable {}

impl Variable for BitVectorVariable {}

impl fmt::Display for BitVectorVariable {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            Some(value) => write!(formatter, "{{{}}}", value.ones().format(", ")),
            None => write!(formatter, "unset"),
        }
    }
}

//! Transfer functions and meet operators over bitvector values.
//!
//! All operators compute their result into a fresh bitvector and only write
//! it back if it differs from the old left-hand value, so they behave
//! correctly even when the left-hand variable is aliased with one of the
//! inputs.
//! Equality checks are by contained bits; differing bitvector capacities do
//! not cause spurious [`Evaluation::Changed`] verdicts.

use std::hash::{Hash, Hasher};

use super::{BitVector, BitVectorVariable};
use crate::fixpoint::{Evaluation, MeetOperator, UnaryOperator, Variable};

/// The identity transfer function, i.e. `lhs = rhs`.
///
/// Identity statements are normally removed from the equation system before
/// solving by aliasing their two variables.
/// If an identity statement is evaluated anyway, its left-hand variable must
/// have been initialized, since an unset left-hand value indicates that the
/// variable was never connected to the rest of the system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitVectorIdentity;

impl UnaryOperator<BitVectorVariable> for BitVectorIdentity {
    fn evaluate(&self, lhs: &mut BitVectorVariable, rhs: &BitVectorVariable) -> Evaluation {
        assert!(
            !lhs.is_unset(),
            "identity transfer function reached a variable that was never initialized"
        );
        if rhs.is_unset() || lhs.same_value(rhs) {
            Evaluation::NotChanged
        } else {
            lhs.copy_state(rhs);
            Evaluation::Changed
        }
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Or a constant bitvector and the right-hand value into the left-hand
/// value, i.e. `lhs = lhs ∪ rhs ∪ constant`.
///
/// Including the old left-hand value makes the operator safe for seeding:
/// a statement `x = x ∪ constant` over an aliased variable `x` converges
/// with the constant contained in the result.
#[derive(Clone, Debug)]
pub struct BitVectorOr {
    constant: BitVector,
}

impl BitVectorOr {
    /// Create the operator `lhs = lhs ∪ rhs ∪ constant`.
    pub fn new(constant: BitVector) -> Self {
        BitVectorOr { constant }
    }
}

impl UnaryOperator<BitVectorVariable> for BitVectorOr {
    fn evaluate(&self, lhs: &mut BitVectorVariable, rhs: &BitVectorVariable) -> Evaluation {
        let mut result = match lhs.get_value() {
            Some(value) => value.clone(),
            None => BitVector::with_capacity(self.constant.len()),
        };
        if let Some(value) = rhs.get_value() {
            result.union_with(value);
        }
        result.union_with(&self.constant);
        let result = BitVectorVariable::from(result);
        if *lhs == result {
            Evaluation::NotChanged
        } else {
            *lhs = result;
            Evaluation::Changed
        }
    }
}

impl Hash for BitVectorOr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bit in self.constant.ones() {
            bit.hash(state);
        }
    }
}

impl PartialEq for BitVectorOr {
    fn eq(&self, other: &Self) -> bool {
        self.constant.ones().eq(other.constant.ones())
    }
}

impl Eq for BitVectorOr {}

/// A kill/gen transfer function, i.e. `lhs = (rhs ∖ kill) ∪ gen`.
///
/// The result is fully determined by the right-hand value, as usual for the
/// node transfer functions of kill/gen problems like reaching definitions
/// or live variables.
/// An unset right-hand value is treated as the empty set.
#[derive(Clone, Debug)]
pub struct BitVectorKillGen {
    kill: BitVector,
    gen: BitVector,
}

impl BitVectorKillGen {
    /// Create the operator `lhs = (rhs ∖ kill) ∪ gen`.
    pub fn new(kill: BitVector, gen: BitVector) -> Self {
        BitVectorKillGen { kill, gen }
    }
}

impl UnaryOperator<BitVectorVariable> for BitVectorKillGen {
    fn evaluate(&self, lhs: &mut BitVectorVariable, rhs: &BitVectorVariable) -> Evaluation {
        let mut result = match rhs.get_value() {
            Some(value) => value.clone(),
            None => BitVector::with_capacity(self.gen.len()),
        };
        result.difference_with(&self.kill);
        result.union_with(&self.gen);
        let result = BitVectorVariable::from(result);
        if *lhs == result {
            Evaluation::NotChanged
        } else {
            *lhs = result;
            Evaluation::Changed
        }
    }
}

impl Hash for BitVectorKillGen {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bit in self.kill.ones() {
            bit.hash(state);
        }
        for bit in self.gen.ones() {
            bit.hash(state);
        }
    }
}

impl PartialEq for BitVectorKillGen {
    fn eq(&self, other: &Self) -> bool {
        self.kill.ones().eq(other.kill.ones()) && self.gen.ones().eq(other.gen.ones())
    }
}

impl Eq for BitVectorKillGen {}

/// The union meet operator, i.e. `lhs = lhs ∪ operand₁ ∪ .. ∪ operandₙ`.
///
/// The old left-hand value is part of the union, so the result can only
/// grow and re-evaluation at the fixed point reports
/// [`Evaluation::NotChanged`].
/// Unset operands contribute nothing; an unset left-hand value becomes the
/// union of the set operands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitVectorUnion;

impl MeetOperator<BitVectorVariable> for BitVectorUnion {
    fn evaluate(&self, lhs: &mut BitVectorVariable, operands: &[&BitVectorVariable]) -> Evaluation {
        let mut result = match lhs.get_value() {
            Some(value) => value.clone(),
            None => BitVector::with_capacity(0),
        };
        for operand in operands {
            if let Some(value) = operand.get_value() {
                result.union_with(value);
            }
        }
        let result = BitVectorVariable::from(result);
        if *lhs == result {
            Evaluation::NotChanged
        } else {
            *lhs = result;
            Evaluation::Changed
        }
    }

    fn is_unary_no_op(&self) -> bool {
        true
    }
}

/// The intersection meet operator, i.e. `lhs = operand₁ ∩ .. ∩ operandₙ`.
///
/// Unset operands are treated as empty sets, so a meet with an unreached
/// predecessor is empty.
/// The old left-hand value does not take part in the intersection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitVectorIntersection;

impl MeetOperator<BitVectorVariable> for BitVectorIntersection {
    fn evaluate(&self, lhs: &mut BitVectorVariable, operands: &[&BitVectorVariable]) -> Evaluation {
        let mut operand_values = operands.iter().map(|operand| operand.get_value());
        let mut result = match operand_values.next() {
            Some(Some(value)) => value.clone(),
            _ => BitVector::with_capacity(0),
        };
        for value in operand_values {
            match value {
                Some(value) => result.intersect_with(value),
                None => result.clear(),
            }
        }
        let result = BitVectorVariable::from(result);
        if *lhs == result {
            Evaluation::NotChanged
        } else {
            *lhs = result;
            Evaluation::Changed
        }
    }

    fn is_unary_no_op(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitvector::BitVectorExtended;

    fn bitvector(bits: &[usize]) -> BitVector {
        let mut bitvector = BitVector::with_capacity(8);
        for &bit in bits {
            bitvector.insert_grow(bit);
        }
        bitvector
    }

    #[test]
    fn identity_copies_the_input() {
        let mut lhs = BitVectorVariable::mock(&[]);
        let rhs = BitVectorVariable::mock(&[1, 3]);
        assert_eq!(BitVectorIdentity.evaluate(&mut lhs, &rhs), Evaluation::Changed);
        assert_eq!(lhs, rhs);
        assert_eq!(BitVectorIdentity.evaluate(&mut lhs, &rhs), Evaluation::NotChanged);
    }

    #[test]
    fn identity_leaves_the_output_alone_for_unset_inputs() {
        let mut lhs = BitVectorVariable::mock(&[2]);
        let rhs = BitVectorVariable::new();
        assert_eq!(BitVectorIdentity.evaluate(&mut lhs, &rhs), Evaluation::NotChanged);
        assert_eq!(lhs, BitVectorVariable::mock(&[2]));
    }

    #[test]
    #[should_panic(expected = "never initialized")]
    fn identity_rejects_an_unset_output() {
        let mut lhs = BitVectorVariable::new();
        let rhs = BitVectorVariable::mock(&[1]);
        BitVectorIdentity.evaluate(&mut lhs, &rhs);
    }

    #[test]
    fn or_adds_its_constant_and_the_input() {
        let operator = BitVectorOr::new(bitvector(&[0]));
        let mut lhs = BitVectorVariable::mock(&[]);
        let rhs = BitVectorVariable::mock(&[4]);
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::Changed);
        assert_eq!(lhs, BitVectorVariable::mock(&[0, 4]));
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::NotChanged);
    }

    #[test]
    fn or_keeps_the_old_output_bits() {
        let operator = BitVectorOr::new(bitvector(&[1]));
        let mut lhs = BitVectorVariable::mock(&[7]);
        let rhs = BitVectorVariable::new();
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::Changed);
        assert_eq!(lhs, BitVectorVariable::mock(&[1, 7]));
    }

    #[test]
    fn or_ignores_capacity_differences() {
        let operator = BitVectorOr::new(bitvector(&[2]));
        let mut wide = BitVector::with_capacity(500);
        wide.insert(2);
        let mut lhs = BitVectorVariable::from(wide);
        let rhs = BitVectorVariable::mock(&[]);
        // Same bits in a wider bitvector, so nothing changes.
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::NotChanged);
    }

    #[test]
    fn equal_operators_hash_identically() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(operator: &impl Hash) -> u64 {
            let mut hasher = DefaultHasher::new();
            operator.hash(&mut hasher);
            hasher.finish()
        }

        let narrow = BitVectorOr::new(bitvector(&[2]));
        let mut wide_bits = BitVector::with_capacity(500);
        wide_bits.insert(2);
        let wide = BitVectorOr::new(wide_bits);
        assert_eq!(narrow, wide);
        assert_eq!(hash_of(&narrow), hash_of(&wide));
        assert_eq!(hash_of(&BitVectorIdentity), hash_of(&BitVectorIdentity));
    }

    #[test]
    fn kill_gen_removes_and_adds_bits() {
        let operator = BitVectorKillGen::new(bitvector(&[0, 1]), bitvector(&[5]));
        let mut lhs = BitVectorVariable::mock(&[]);
        let rhs = BitVectorVariable::mock(&[1, 2]);
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::Changed);
        assert_eq!(lhs, BitVectorVariable::mock(&[2, 5]));
    }

    #[test]
    fn kill_gen_overwrites_the_old_output() {
        let operator = BitVectorKillGen::new(bitvector(&[]), bitvector(&[0]));
        let mut lhs = BitVectorVariable::mock(&[9]);
        let rhs = BitVectorVariable::mock(&[]);
        // The result is a pure function of the input.
        assert_eq!(operator.evaluate(&mut lhs, &rhs), Evaluation::Changed);
        assert_eq!(lhs, BitVectorVariable::mock(&[0]));
    }

    #[test]
    fn union_is_idempotent() {
        let mut lhs = BitVectorVariable::mock(&[0]);
        let first = BitVectorVariable::mock(&[1]);
        let second = BitVectorVariable::mock(&[2]);
        assert_eq!(
            BitVectorUnion.evaluate(&mut lhs, &[&first, &second]),
            Evaluation::Changed
        );
        assert_eq!(lhs, BitVectorVariable::mock(&[0, 1, 2]));
        assert_eq!(
            BitVectorUnion.evaluate(&mut lhs, &[&first, &second]),
            Evaluation::NotChanged
        );
    }

    #[test]
    fn union_skips_unset_operands() {
        let mut lhs = BitVectorVariable::new();
        let set = BitVectorVariable::mock(&[3]);
        let unset = BitVectorVariable::new();
        assert_eq!(
            BitVectorUnion.evaluate(&mut lhs, &[&unset, &set]),
            Evaluation::Changed
        );
        assert_eq!(lhs, BitVectorVariable::mock(&[3]));
    }

    #[test]
    fn intersection_keeps_only_shared_bits() {
        let mut lhs = BitVectorVariable::mock(&[9]);
        let first = BitVectorVariable::mock(&[1, 2, 3]);
        let second = BitVectorVariable::mock(&[2, 3, 4]);
        assert_eq!(
            BitVectorIntersection.evaluate(&mut lhs, &[&first, &second]),
            Evaluation::Changed
        );
        // The old output bits are not part of the intersection.
        assert_eq!(lhs, BitVectorVariable::mock(&[2, 3]));
    }

    #[test]
    fn intersection_with_an_unset_operand_is_empty() {
        let mut lhs = BitVectorVariable::mock(&[1]);
        let set = BitVectorVariable::mock(&[1, 2]);
        let unset = BitVectorVariable::new();
        assert_eq!(
            BitVectorIntersection.evaluate(&mut lhs, &[&set, &unset]),
            Evaluation::Changed
        );
        assert_eq!(lhs, BitVectorVariable::mock(&[]));
    }
}

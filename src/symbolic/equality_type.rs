use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The set of ways two symbols are known to be related.
    ///
    /// A link of type T from A to B says that B = T(A) for every flag in T at once.
    /// Each relation is its own inverse, so the same type also says A = T(B).
    /// More than one flag being set is allowed, and usually means part of the symbol is zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EqualityType: u8 {
        const EQUAL = 1 << 0;
        const NEGATED = 1 << 1;
        const CONJUGATED = 1 << 2;
        const NEG_CONJ = 1 << 3;
    }
}

impl EqualityType {
    /// The single relation described by a sign flip and a conjugation.
    pub fn from_relation(negated: bool, conjugated: bool) -> EqualityType {
        match (negated, conjugated) {
            (false, false) => EqualityType::EQUAL,
            (true, false) => EqualityType::NEGATED,
            (false, true) => EqualityType::CONJUGATED,
            (true, true) => EqualityType::NEG_CONJ,
        }
    }

    /// Picks one relation out of the set, as (negated, conjugated).
    /// Prefers plain equality, then negation, then conjugation.
    /// Returns None for the empty set.
    pub fn preferred_relation(self) -> Option<(bool, bool)> {
        if self.contains(EqualityType::EQUAL) {
            Some((false, false))
        } else if self.contains(EqualityType::NEGATED) {
            Some((true, false))
        } else if self.contains(EqualityType::CONJUGATED) {
            Some((false, true))
        } else if self.contains(EqualityType::NEG_CONJ) {
            Some((true, true))
        } else {
            None
        }
    }
}

impl fmt::Display for EqualityType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = vec![];
        if self.contains(EqualityType::EQUAL) {
            parts.push("=");
        }
        if self.contains(EqualityType::NEGATED) {
            parts.push("-");
        }
        if self.contains(EqualityType::CONJUGATED) {
            parts.push("*");
        }
        if self.contains(EqualityType::NEG_CONJ) {
            parts.push("-*");
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Swaps EQUAL with NEGATED, and CONJUGATED with NEG_CONJ.
pub fn negate(t: EqualityType) -> EqualityType {
    let bits = t.bits();
    EqualityType::from_bits_truncate(((bits & 0b0101) << 1) | ((bits & 0b1010) >> 1))
}

/// Swaps EQUAL with CONJUGATED, and NEGATED with NEG_CONJ.
pub fn conjugate(t: EqualityType) -> EqualityType {
    let bits = t.bits();
    EqualityType::from_bits_truncate(((bits & 0b0011) << 2) | ((bits & 0b1100) >> 2))
}

/// If A relates to B by lhs, and B relates to C by rhs, then A relates to C by compose(lhs, rhs).
/// Every branch that is true in lhs is applied to rhs, and all the results are kept.
pub fn compose(lhs: EqualityType, rhs: EqualityType) -> EqualityType {
    let mut answer = EqualityType::empty();
    if lhs.contains(EqualityType::EQUAL) {
        answer |= rhs;
    }
    if lhs.contains(EqualityType::NEGATED) {
        answer |= negate(rhs);
    }
    if lhs.contains(EqualityType::CONJUGATED) {
        answer |= conjugate(rhs);
    }
    if lhs.contains(EqualityType::NEG_CONJ) {
        answer |= conjugate(negate(rhs));
    }
    answer
}

/// Which parts of the related symbols must vanish, if all relations in t hold at once.
/// Returns (real_is_zero, imaginary_is_zero).
pub fn implies_zero(t: EqualityType) -> (bool, bool) {
    let both = t.contains(EqualityType::EQUAL | EqualityType::NEGATED)
        || t.contains(EqualityType::CONJUGATED | EqualityType::NEG_CONJ);
    if both {
        return (true, true);
    }
    let real_is_zero = t.contains(EqualityType::EQUAL | EqualityType::NEG_CONJ)
        || t.contains(EqualityType::NEGATED | EqualityType::CONJUGATED);
    let im_is_zero = t.contains(EqualityType::EQUAL | EqualityType::CONJUGATED)
        || t.contains(EqualityType::NEGATED | EqualityType::NEG_CONJ);
    (real_is_zero, im_is_zero)
}

/// The nullity implied by a symbol being related to itself by t.
/// A symbol always equals itself, so the EQUAL branch is implicitly present.
pub fn reflexive_implies_zero(t: EqualityType) -> (bool, bool) {
    implies_zero(t | EqualityType::EQUAL)
}

/// Simplifies t for symbols whose nullity is known.
/// For a real symbol, conjugation does nothing. For an imaginary one, it negates.
/// What remains is expressed with EQUAL and NEGATED only.
pub fn degenerate(t: EqualityType, real_is_zero: bool, im_is_zero: bool) -> EqualityType {
    let (same, opposite) = match (real_is_zero, im_is_zero) {
        (true, true) => return EqualityType::EQUAL,
        (false, false) => return t,
        (false, true) => (
            EqualityType::EQUAL | EqualityType::CONJUGATED,
            EqualityType::NEGATED | EqualityType::NEG_CONJ,
        ),
        (true, false) => (
            EqualityType::EQUAL | EqualityType::NEG_CONJ,
            EqualityType::NEGATED | EqualityType::CONJUGATED,
        ),
    };
    let mut answer = EqualityType::empty();
    if t.intersects(same) {
        answer |= EqualityType::EQUAL;
    }
    if t.intersects(opposite) {
        answer |= EqualityType::NEGATED;
    }
    answer
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbolic::equality_type::EqualityType;
use crate::symbolic::symbol::SymbolId;

/// A reference to a symbol, possibly negated and/or complex conjugated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct SymbolExpression {
    pub id: SymbolId,
    pub negated: bool,
    pub conjugated: bool,
}

impl SymbolExpression {
    pub fn new(id: SymbolId) -> SymbolExpression {
        SymbolExpression {
            id,
            negated: false,
            conjugated: false,
        }
    }

    pub fn with(id: SymbolId, negated: bool, conjugated: bool) -> SymbolExpression {
        SymbolExpression {
            id,
            negated,
            conjugated,
        }
    }

    /// A negative value refers to the negation of the symbol with the absolute value as id.
    pub fn from_signed(value: i64) -> SymbolExpression {
        SymbolExpression {
            id: value.unsigned_abs() as SymbolId,
            negated: value < 0,
            conjugated: false,
        }
    }

    pub fn zero() -> SymbolExpression {
        SymbolExpression::new(0)
    }

    pub fn is_zero(&self) -> bool {
        self.id == 0
    }
}

impl fmt::Display for SymbolExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negated {
            write!(f, "-")?;
        }
        write!(f, "{}", self.id)?;
        if self.conjugated {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// The statement that two symbols are equal, up to a sign and a conjugation.
/// The lower id is always on the left. Sign and conjugation are relative, so swapping
/// the sides doesn't change them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct SymbolPair {
    pub left_id: SymbolId,
    pub right_id: SymbolId,
    pub negated: bool,
    pub conjugated: bool,
}

impl SymbolPair {
    /// States that left == right.
    pub fn new(left: SymbolExpression, right: SymbolExpression) -> SymbolPair {
        SymbolPair::with(
            left.id,
            right.id,
            left.negated != right.negated,
            left.conjugated != right.conjugated,
        )
    }

    pub fn with(id1: SymbolId, id2: SymbolId, negated: bool, conjugated: bool) -> SymbolPair {
        SymbolPair {
            left_id: id1.min(id2),
            right_id: id1.max(id2),
            negated,
            conjugated,
        }
    }

    pub fn equality_type(&self) -> EqualityType {
        EqualityType::from_relation(self.negated, self.conjugated)
    }
}

impl fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let right = SymbolExpression::with(self.right_id, self.negated, self.conjugated);
        write!(f, "{} == {}", self.left_id, right)
    }
}

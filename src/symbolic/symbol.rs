use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbols are numbered. Symbol 0 is always the zero symbol.
pub type SymbolId = usize;

/// An unknown scalar, along with what we know about which of its parts vanish.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,

    // Whether the real part of this symbol is known to be zero.
    pub real_is_zero: bool,

    // Whether the imaginary part of this symbol is known to be zero.
    pub im_is_zero: bool,
}

impl Symbol {
    /// A symbol that could be any complex number.
    pub fn new(id: SymbolId) -> Symbol {
        Symbol {
            id,
            real_is_zero: false,
            im_is_zero: false,
        }
    }

    /// A symbol known to be real.
    pub fn real(id: SymbolId) -> Symbol {
        Symbol {
            id,
            real_is_zero: false,
            im_is_zero: true,
        }
    }

    /// A symbol known to be purely imaginary.
    pub fn imaginary(id: SymbolId) -> Symbol {
        Symbol {
            id,
            real_is_zero: true,
            im_is_zero: false,
        }
    }

    /// The distinguished zero symbol.
    pub fn zero() -> Symbol {
        Symbol {
            id: 0,
            real_is_zero: true,
            im_is_zero: true,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.real_is_zero && self.im_is_zero
    }

    /// Adds the nullity flags. Flags are never removed.
    pub fn apply_nullity(&mut self, real_is_zero: bool, im_is_zero: bool) {
        self.real_is_zero |= real_is_zero;
        self.im_is_zero |= im_is_zero;
    }

    /// Absorbs what another description of the same symbol knows.
    pub fn merge_in(&mut self, other: &Symbol) {
        assert_eq!(
            self.id, other.id,
            "cannot merge symbol {} into symbol {}",
            other.id, self.id
        );
        self.apply_nullity(other.real_is_zero, other.im_is_zero);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.id)?;
        match (self.real_is_zero, self.im_is_zero) {
            (true, true) => write!(f, " [zero]"),
            (true, false) => write!(f, " [imaginary]"),
            (false, true) => write!(f, " [real]"),
            (false, false) => Ok(()),
        }
    }
}

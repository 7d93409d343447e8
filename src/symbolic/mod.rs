pub mod equality_type;
mod simplify;
pub mod symbol;
pub mod symbol_basis;
pub mod symbol_expression;
pub mod symbol_set;
pub mod symbol_tree;

pub use equality_type::EqualityType;
pub use symbol::{Symbol, SymbolId};
pub use symbol_basis::SymbolBasis;
pub use symbol_expression::{SymbolExpression, SymbolPair};
pub use symbol_set::SymbolSet;
pub use symbol_tree::{LinkId, SymbolLink, SymbolNode, SymbolTree};

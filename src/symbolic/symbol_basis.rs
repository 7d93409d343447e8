use crate::symbolic::symbol::SymbolId;
use crate::symbolic::symbol_tree::SymbolTree;

/// Numbers the real and imaginary parts of the canonical symbols of a simplified tree.
///
/// Parts known to be zero get no number. Aliases share the numbers of their canonical
/// symbol, so a caller can build a basis with one element per independent unknown.
#[derive(Clone, Debug)]
pub struct SymbolBasis {
    // keys[id] is the (real, imaginary) basis index of symbol id.
    keys: Vec<(Option<usize>, Option<usize>)>,

    real_count: usize,
    imaginary_count: usize,
    canonical_count: usize,
}

impl SymbolBasis {
    pub fn new(tree: &SymbolTree) -> SymbolBasis {
        assert!(tree.ready(), "the symbol tree has not been simplified");

        let mut keys = vec![(None, None); tree.count_nodes()];
        let mut real_count = 0;
        let mut imaginary_count = 0;
        let mut canonical_count = 0;

        for node in tree.nodes() {
            if !node.is_canonical() || node.is_zero() {
                continue;
            }
            canonical_count += 1;
            let mut key = (None, None);
            if !node.real_is_zero() {
                key.0 = Some(real_count);
                real_count += 1;
            }
            if !node.im_is_zero() {
                key.1 = Some(imaginary_count);
                imaginary_count += 1;
            }
            keys[node.id()] = key;
        }

        // Canonical nodes always have lower ids than their aliases
        for node in tree.nodes() {
            if !node.is_canonical() {
                keys[node.id()] = keys[tree.canonical_id(node.id())];
            }
        }

        SymbolBasis {
            keys,
            real_count,
            imaginary_count,
            canonical_count,
        }
    }

    /// The (real, imaginary) basis indices for a symbol.
    /// Both are None for unknown symbols and for symbols that are zero.
    pub fn basis_key(&self, id: SymbolId) -> (Option<usize>, Option<usize>) {
        self.keys.get(id).copied().unwrap_or((None, None))
    }

    pub fn real_count(&self) -> usize {
        self.real_count
    }

    pub fn imaginary_count(&self) -> usize {
        self.imaginary_count
    }

    /// The number of canonical symbols that are not zero.
    pub fn canonical_count(&self) -> usize {
        self.canonical_count
    }
}

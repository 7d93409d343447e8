use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::symbolic::equality_type::EqualityType;
use crate::symbolic::symbol::{Symbol, SymbolId};
use crate::symbolic::symbol_expression::SymbolPair;

/// A collection of symbols and the raw relations between them.
///
/// Relations are keyed by (lower id, higher id). Adding a relation between a pair that
/// is already related keeps both relations, by or-ing the equality types together.
///
/// Before a SymbolTree can be built, the set must be packed, which renumbers the symbols
/// densely as 0..N in the same order as their original ids.
#[derive(Clone, Debug)]
pub struct SymbolSet {
    // Every symbol that has been referenced, with everything known about its nullity.
    symbols: BTreeMap<SymbolId, Symbol>,

    // The relations between pairs of symbols.
    links: BTreeMap<(SymbolId, SymbolId), EqualityType>,

    // Maps original ids to packed ids. Only populated when packed.
    packing_key: BTreeMap<SymbolId, SymbolId>,

    // unpacking_key[packed id] is the original id. Only populated when packed.
    unpacking_key: Vec<SymbolId>,

    packed: bool,
}

impl Default for SymbolSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolSet {
    /// A set containing only the zero symbol.
    pub fn new() -> SymbolSet {
        let mut answer = SymbolSet {
            symbols: BTreeMap::new(),
            links: BTreeMap::new(),
            packing_key: BTreeMap::new(),
            unpacking_key: vec![],
            packed: false,
        };
        answer.add_or_merge(Symbol::zero());
        answer
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = SymbolPair>) -> SymbolSet {
        let mut answer = SymbolSet::new();
        for pair in pairs {
            answer.add_or_merge_pair(pair, false);
        }
        answer
    }

    /// Symbols are added first, so that their nullity is known regardless of the pairs.
    pub fn from_parts(
        symbols: impl IntoIterator<Item = Symbol>,
        pairs: impl IntoIterator<Item = SymbolPair>,
    ) -> SymbolSet {
        let mut answer = SymbolSet::new();
        for symbol in symbols {
            answer.add_or_merge(symbol);
        }
        for pair in pairs {
            answer.add_or_merge_pair(pair, false);
        }
        answer
    }

    /// Returns whether this symbol was not previously in the set.
    pub fn add_or_merge(&mut self, symbol: Symbol) -> bool {
        if self.packed {
            panic!("cannot add symbol {} to a packed symbol set", symbol.id);
        }
        match self.symbols.entry(symbol.id) {
            Entry::Vacant(entry) => {
                entry.insert(symbol);
                true
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().merge_in(&symbol);
                false
            }
        }
    }

    /// Adds a relation, and both of the symbols it mentions.
    /// If force_real is set, the symbols are registered as having no imaginary part.
    /// Returns whether this pair of symbols was not previously related.
    pub fn add_or_merge_pair(&mut self, pair: SymbolPair, force_real: bool) -> bool {
        if self.packed {
            panic!("cannot add relation {} to a packed symbol set", pair);
        }
        let make_symbol = |id| {
            if force_real {
                Symbol::real(id)
            } else {
                Symbol::new(id)
            }
        };
        self.add_or_merge(make_symbol(pair.left_id));
        self.add_or_merge(make_symbol(pair.right_id));

        let link_type = pair.equality_type();
        match self.links.entry((pair.left_id, pair.right_id)) {
            Entry::Vacant(entry) => {
                entry.insert(link_type);
                true
            }
            Entry::Occupied(mut entry) => {
                *entry.get_mut() |= link_type;
                false
            }
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// The symbols in ascending id order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// The relations, ordered by (lower id, higher id).
    pub fn links(&self) -> impl Iterator<Item = ((SymbolId, SymbolId), EqualityType)> + '_ {
        self.links.iter().map(|(&key, &value)| (key, value))
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// The packed id for an original id, if this set is packed and contains it.
    pub fn packed_key(&self, original_id: SymbolId) -> Option<SymbolId> {
        self.packing_key.get(&original_id).copied()
    }

    /// The original id for a packed id, if this set is packed and contains it.
    pub fn unpacked_key(&self, packed_id: SymbolId) -> Option<SymbolId> {
        self.unpacking_key.get(packed_id).copied()
    }

    /// Renumbers the symbols as 0..N, keeping their relative order.
    pub fn pack(&mut self) {
        assert!(!self.packed, "symbol set is already packed");

        self.unpacking_key = self.symbols.keys().copied().collect();
        self.packing_key = self
            .unpacking_key
            .iter()
            .enumerate()
            .map(|(packed_id, &original_id)| (original_id, packed_id))
            .collect();

        let symbols = std::mem::take(&mut self.symbols);
        self.symbols = symbols
            .into_values()
            .enumerate()
            .map(|(packed_id, mut symbol)| {
                symbol.id = packed_id;
                (packed_id, symbol)
            })
            .collect();

        let links = std::mem::take(&mut self.links);
        self.links = links
            .into_iter()
            .map(|((left, right), link_type)| {
                ((self.packing_key[&left], self.packing_key[&right]), link_type)
            })
            .collect();

        self.packed = true;
    }

    /// Restores the original ids.
    pub fn unpack(&mut self) {
        assert!(self.packed, "symbol set is not packed");

        let symbols = std::mem::take(&mut self.symbols);
        self.symbols = symbols
            .into_values()
            .map(|mut symbol| {
                symbol.id = self.unpacking_key[symbol.id];
                (symbol.id, symbol)
            })
            .collect();

        let links = std::mem::take(&mut self.links);
        self.links = links
            .into_iter()
            .map(|((left, right), link_type)| {
                (
                    (self.unpacking_key[left], self.unpacking_key[right]),
                    link_type,
                )
            })
            .collect();

        self.packing_key.clear();
        self.unpacking_key.clear();
        self.packed = false;
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "symbols:")?;
        for symbol in self.symbols.values() {
            writeln!(f, "  {}", symbol)?;
        }
        writeln!(f, "links:")?;
        for (&(left, right), link_type) in &self.links {
            writeln!(f, "  {} -> {} {}", left, right, link_type)?;
        }
        Ok(())
    }
}

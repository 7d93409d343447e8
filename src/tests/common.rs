use crate::symbolic::{Symbol, SymbolExpression, SymbolId, SymbolPair, SymbolSet, SymbolTree};

/// Parses an expression like "3", "-3", "3*" or "-3*".
pub fn parse_expr(s: &str) -> SymbolExpression {
    let s = s.trim();
    let (negated, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (conjugated, s) = match s.strip_suffix('*') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let id = s
        .parse::<SymbolId>()
        .unwrap_or_else(|_| panic!("bad symbol expression: {}", s));
    SymbolExpression::with(id, negated, conjugated)
}

/// Parses a relation like "1 = -2*".
pub fn parse_pair(s: &str) -> SymbolPair {
    let (left, right) = s
        .split_once('=')
        .unwrap_or_else(|| panic!("bad relation: {}", s));
    SymbolPair::new(parse_expr(left), parse_expr(right))
}

/// A simplified tree, along with the symbol set it came from.
/// Lookups take and return the original ids.
pub struct TestTree {
    pub set: SymbolSet,
    pub tree: SymbolTree,
}

impl TestTree {
    pub fn new(mut set: SymbolSet) -> TestTree {
        set.pack();
        let mut tree = SymbolTree::new(&set);
        tree.simplify();
        tree.validate();
        TestTree { set, tree }
    }

    pub fn with_relations(relations: &[&str]) -> TestTree {
        TestTree::new(SymbolSet::from_pairs(
            relations.iter().map(|s| parse_pair(s)),
        ))
    }

    pub fn with_parts(symbols: &[Symbol], relations: &[&str]) -> TestTree {
        TestTree::new(SymbolSet::from_parts(
            symbols.iter().copied(),
            relations.iter().map(|s| parse_pair(s)),
        ))
    }

    fn packed(&self, id: SymbolId) -> SymbolId {
        self.set
            .packed_key(id)
            .unwrap_or_else(|| panic!("symbol {} is not in the tree", id))
    }

    fn unpacked(&self, id: SymbolId) -> SymbolId {
        self.set
            .unpacked_key(id)
            .unwrap_or_else(|| panic!("node {} is not in the tree", id))
    }

    pub fn substitute(&self, expr: SymbolExpression) -> SymbolExpression {
        let packed = SymbolExpression::with(self.packed(expr.id), expr.negated, expr.conjugated);
        let mut answer = self.tree.substitute(packed);
        answer.id = self.unpacked(answer.id);
        answer
    }

    pub fn canonical_id(&self, id: SymbolId) -> SymbolId {
        self.unpacked(self.tree.canonical_id(self.packed(id)))
    }

    pub fn symbol(&self, id: SymbolId) -> Symbol {
        let mut symbol = *self.tree.node(self.packed(id)).symbol();
        symbol.id = id;
        symbol
    }

    /// The targets of the links from a node, in original ids.
    pub fn children(&self, id: SymbolId) -> Vec<SymbolId> {
        self.tree
            .children(self.packed(id))
            .map(|link| self.unpacked(link.target()))
            .collect()
    }

    /// Checks that the left side substitutes to the right side.
    pub fn assert_substitutes(&self, input: &str, output: &str) {
        let actual = self.substitute(parse_expr(input));
        let expected = parse_expr(output);
        if actual != expected {
            panic!(
                "expected {} to become {}, but got {}\ntree:\n{}",
                input, expected, actual, self.tree
            );
        }
    }

    pub fn assert_canonical(&self, id: SymbolId) {
        assert!(
            self.tree.node(self.packed(id)).is_canonical(),
            "expected {} to be canonical\ntree:\n{}",
            id,
            self.tree
        );
    }

    pub fn assert_zero(&self, id: SymbolId) {
        assert!(self.symbol(id).is_zero(), "expected {} to be zero", id);
        assert_eq!(self.canonical_id(id), 0);
        self.assert_substitutes(&format!("-{}*", id), "0");
    }
}

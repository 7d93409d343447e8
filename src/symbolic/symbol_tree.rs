use std::fmt;

use crate::symbolic::equality_type::{implies_zero, reflexive_implies_zero, EqualityType};
use crate::symbolic::symbol::{Symbol, SymbolId};
use crate::symbolic::symbol_expression::{SymbolExpression, SymbolPair};
use crate::symbolic::symbol_set::SymbolSet;

/// Links live in an arena owned by the tree, and are referred to by their index in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u32);

impl LinkId {
    pub fn get(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A directed relation between two nodes of the tree.
///
/// While a link is attached, it sits in the outgoing list of its origin node.
/// The list is doubly linked through prev and next, and ordered by target id.
/// A detached link has no origin. Free links are chained through next.
#[derive(Debug, Clone)]
pub struct SymbolLink {
    pub(crate) link_type: EqualityType,
    pub(crate) origin: Option<SymbolId>,
    pub(crate) target: SymbolId,
    pub(crate) prev: Option<LinkId>,
    pub(crate) next: Option<LinkId>,
}

impl SymbolLink {
    fn new(link_type: EqualityType, target: SymbolId) -> SymbolLink {
        SymbolLink {
            link_type,
            origin: None,
            target,
            prev: None,
            next: None,
        }
    }

    pub fn link_type(&self) -> EqualityType {
        self.link_type
    }

    pub fn origin(&self) -> Option<SymbolId> {
        self.origin
    }

    pub fn target(&self) -> SymbolId {
        self.target
    }

    pub fn is_reflexive(&self) -> bool {
        self.origin == Some(self.target)
    }

    /// The nullity implied for both ends of this link.
    /// Returns (real_is_zero, imaginary_is_zero).
    pub fn implies_zero(&self) -> (bool, bool) {
        if self.is_reflexive() {
            reflexive_implies_zero(self.link_type)
        } else {
            implies_zero(self.link_type)
        }
    }

    fn reset(&mut self) {
        self.link_type = EqualityType::empty();
        self.origin = None;
        self.prev = None;
        self.next = None;
    }
}

/// One symbol in the tree.
#[derive(Debug, Clone)]
pub struct SymbolNode {
    pub(crate) symbol: Symbol,

    // The link from this node's canonical representative, if this node is an alias.
    // This is a back-reference. The link itself belongs to the canonical node's list.
    pub(crate) canonical_origin: Option<LinkId>,

    // The outgoing links, ordered by target id.
    pub(crate) first_link: Option<LinkId>,
    pub(crate) last_link: Option<LinkId>,
}

impl SymbolNode {
    fn new(symbol: Symbol) -> SymbolNode {
        SymbolNode {
            symbol,
            canonical_origin: None,
            first_link: None,
            last_link: None,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.symbol.id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn is_zero(&self) -> bool {
        self.symbol.is_zero()
    }

    pub fn real_is_zero(&self) -> bool {
        self.symbol.real_is_zero
    }

    pub fn im_is_zero(&self) -> bool {
        self.symbol.im_is_zero
    }

    pub fn canonical_origin(&self) -> Option<LinkId> {
        self.canonical_origin
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical_origin.is_none()
    }

    pub fn has_children(&self) -> bool {
        self.first_link.is_some()
    }
}

/// The SymbolTree finds, for every symbol, the simplest symbol it is provably equal to,
/// up to sign and conjugation.
///
/// It is built from a packed SymbolSet, so node i is symbol i. Every relation in the set
/// becomes a link hanging off its lower-id end. Simplification then collapses each
/// connected group of symbols into a star: one canonical node, with a direct link to every
/// other member of the group.
#[derive(Clone)]
pub struct SymbolTree {
    pub(crate) nodes: Vec<SymbolNode>,

    // All links ever created. Links are recycled through the free list, never removed.
    pub(crate) links: Vec<SymbolLink>,

    // The most recently freed link. Further free links follow through their next field.
    pub(crate) free_head: Option<LinkId>,

    pub(crate) done_simplification: bool,

    pub(crate) alias_count: usize,
}

impl SymbolTree {
    /// Builds a tree from a packed symbol set. The tree is not yet simplified.
    pub fn new(symbols: &SymbolSet) -> SymbolTree {
        assert!(
            symbols.is_packed(),
            "a symbol tree can only be built from a packed symbol set"
        );

        let mut tree = SymbolTree {
            nodes: Vec::with_capacity(symbols.symbol_count()),
            links: Vec::with_capacity(symbols.link_count()),
            free_head: None,
            done_simplification: false,
            alias_count: 0,
        };

        for symbol in symbols.symbols() {
            assert_eq!(symbol.id, tree.nodes.len(), "symbol set ids are not dense");
            tree.nodes.push(SymbolNode::new(*symbol));
        }

        for ((left, right), link_type) in symbols.links() {
            let link = tree.allocate_link(link_type, right);
            tree.insert_ordered(left, link);
        }

        tree
    }

    pub fn count_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The number of links in the arena, including free ones.
    pub fn count_links(&self) -> usize {
        self.links.len()
    }

    pub fn count_free_links(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.free_head;
        while let Some(link_id) = cursor {
            count += 1;
            cursor = self.links[link_id.index()].next;
        }
        count
    }

    /// The number of symbols that are aliases of some other symbol.
    /// Only meaningful after simplification.
    pub fn alias_count(&self) -> usize {
        self.alias_count
    }

    /// Whether simplification has been done.
    pub fn ready(&self) -> bool {
        self.done_simplification
    }

    /// Panics if the id is not in the tree.
    pub fn node(&self, id: SymbolId) -> &SymbolNode {
        &self.nodes[id]
    }

    pub fn link(&self, link_id: LinkId) -> &SymbolLink {
        &self.links[link_id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SymbolNode> {
        self.nodes.iter()
    }

    /// The links leaving a node, in target order.
    pub fn children(&self, id: SymbolId) -> Children<'_> {
        Children {
            tree: self,
            cursor: self.nodes[id].first_link,
        }
    }

    /// The id of the canonical node that this node belongs to.
    /// Panics if the id is not in the tree. Use substitute for ids that may be unknown.
    pub fn canonical_id(&self, id: SymbolId) -> SymbolId {
        match self.nodes[id].canonical_origin {
            Some(link_id) => self.links[link_id.index()]
                .origin
                .expect("canonical origin link is detached"),
            None => id,
        }
    }

    /// This node, in terms of its canonical node.
    /// Panics if the id is not in the tree.
    pub fn canonical_expression(&self, id: SymbolId) -> SymbolExpression {
        let link_id = match self.nodes[id].canonical_origin {
            Some(link_id) => link_id,
            None => return SymbolExpression::new(id),
        };
        let link = &self.links[link_id.index()];
        let origin = link.origin.expect("canonical origin link is detached");
        let (negated, conjugated) = link.link_type.preferred_relation().unwrap_or_else(|| {
            panic!("link from {} to {} has no relation", origin, link.target)
        });
        SymbolExpression::with(origin, negated, conjugated)
    }

    /// Rewrites an expression in terms of canonical symbols.
    /// Expressions referring to symbols outside the tree are returned unchanged.
    pub fn substitute(&self, expr: SymbolExpression) -> SymbolExpression {
        let node = match self.nodes.get(expr.id) {
            Some(node) => node,
            None => return expr,
        };
        if node.is_zero() {
            return SymbolExpression::zero();
        }

        let mut answer = self.canonical_expression(expr.id);
        answer.negated ^= expr.negated;
        answer.conjugated ^= expr.conjugated;

        if node.im_is_zero() {
            // Real, so conjugation does nothing
            answer.conjugated = false;
        } else if node.real_is_zero() && answer.conjugated {
            // Imaginary, so conjugation is negation
            answer.conjugated = false;
            answer.negated = !answer.negated;
        }
        answer
    }

    /// Describes what the tree has concluded, with one relation per alias.
    /// The ids are the ids of this tree.
    pub fn export_symbol_set(&self) -> SymbolSet {
        let mut output = SymbolSet::new();
        for node in &self.nodes {
            output.add_or_merge(node.symbol);
        }
        for node in &self.nodes {
            if node.is_canonical() {
                continue;
            }
            let canonical = self.substitute(SymbolExpression::new(node.id()));
            output.add_or_merge_pair(
                SymbolPair::new(canonical, SymbolExpression::new(node.id())),
                false,
            );
        }
        output
    }

    /// Takes a link from the free list, or makes a new one.
    pub(crate) fn allocate_link(&mut self, link_type: EqualityType, target: SymbolId) -> LinkId {
        if let Some(link_id) = self.free_head {
            let link = &mut self.links[link_id.index()];
            self.free_head = link.next;
            *link = SymbolLink::new(link_type, target);
            return link_id;
        }
        let index = u32::try_from(self.links.len()).expect("too many links for a LinkId");
        let link_id = LinkId(index);
        self.links.push(SymbolLink::new(link_type, target));
        link_id
    }

    /// Returns a detached link to the free list.
    pub(crate) fn release_link(&mut self, link_id: LinkId) {
        let link = &mut self.links[link_id.index()];
        if let Some(origin) = link.origin {
            panic!("link {} is still attached to node {}", link_id, origin);
        }
        link.reset();
        link.next = self.free_head;
        self.free_head = Some(link_id);
    }

    /// Puts a detached link into a node's outgoing list, keeping it ordered by target.
    /// If the node already links to the same target, the types are merged and the incoming
    /// link is released.
    /// Returns the link that now represents the relation.
    pub(crate) fn insert_ordered(&mut self, node_id: SymbolId, link_id: LinkId) -> LinkId {
        if let Some(origin) = self.links[link_id.index()].origin {
            panic!(
                "cannot insert link {} into node {}, it already belongs to node {}",
                link_id, node_id, origin
            );
        }
        let target = self.links[link_id.index()].target;

        // Most insertions are in ascending order, so check the tail first.
        let mut before = None;
        if let Some(last) = self.nodes[node_id].last_link {
            if self.links[last.index()].target >= target {
                let mut cursor = self.nodes[node_id].first_link;
                while let Some(existing) = cursor {
                    let existing_target = self.links[existing.index()].target;
                    if existing_target == target {
                        let link_type = self.links[link_id.index()].link_type;
                        self.links[existing.index()].link_type |= link_type;
                        self.release_link(link_id);
                        return existing;
                    }
                    if existing_target > target {
                        before = Some(existing);
                        break;
                    }
                    cursor = self.links[existing.index()].next;
                }
            }
        }

        match before {
            Some(next) => {
                let prev = self.links[next.index()].prev;
                let link = &mut self.links[link_id.index()];
                link.prev = prev;
                link.next = Some(next);
                self.links[next.index()].prev = Some(link_id);
                match prev {
                    Some(prev) => self.links[prev.index()].next = Some(link_id),
                    None => self.nodes[node_id].first_link = Some(link_id),
                }
            }
            None => {
                let last = self.nodes[node_id].last_link;
                let link = &mut self.links[link_id.index()];
                link.prev = last;
                link.next = None;
                match last {
                    Some(last) => self.links[last.index()].next = Some(link_id),
                    None => self.nodes[node_id].first_link = Some(link_id),
                }
                self.nodes[node_id].last_link = Some(link_id);
            }
        }
        self.links[link_id.index()].origin = Some(node_id);
        link_id
    }

    /// Removes a link from its origin's list. The link keeps its type and target.
    pub(crate) fn detach(&mut self, link_id: LinkId) {
        let link = &mut self.links[link_id.index()];
        let origin = match link.origin.take() {
            Some(origin) => origin,
            None => panic!("link {} is not attached", link_id),
        };
        let prev = link.prev.take();
        let next = link.next.take();
        match prev {
            Some(prev) => self.links[prev.index()].next = next,
            None => self.nodes[origin].first_link = next,
        }
        match next {
            Some(next) => self.links[next.index()].prev = prev,
            None => self.nodes[origin].last_link = prev,
        }
    }

    /// Empties a node's outgoing list, returning the head of the former list.
    /// The links stay chained through next, and still name the node as their origin,
    /// until each one is loosened.
    pub(crate) fn take_children(&mut self, node_id: SymbolId) -> Option<LinkId> {
        let node = &mut self.nodes[node_id];
        node.last_link = None;
        node.first_link.take()
    }

    /// Clears the list fields of a link that was part of a taken chain.
    /// Returns the next link in the chain.
    pub(crate) fn loosen(&mut self, link_id: LinkId) -> Option<LinkId> {
        let link = &mut self.links[link_id.index()];
        link.origin = None;
        link.prev = None;
        link.next.take()
    }

    /// Checks the structure of the tree, panicking if anything is inconsistent.
    pub fn validate(&self) {
        for (id, node) in self.nodes.iter().enumerate() {
            assert_eq!(node.id(), id, "node {} has id {}", id, node.id());

            // The outgoing list is consistent, strictly ordered, and owned by this node
            let mut prev: Option<LinkId> = None;
            let mut cursor = node.first_link;
            while let Some(link_id) = cursor {
                let link = &self.links[link_id.index()];
                assert_eq!(link.origin, Some(id), "link {} is in the wrong list", link_id);
                assert_eq!(link.prev, prev, "link {} has a broken prev", link_id);
                if let Some(prev) = prev {
                    assert!(
                        self.links[prev.index()].target < link.target,
                        "node {} links are out of order",
                        id
                    );
                }
                prev = Some(link_id);
                cursor = link.next;
            }
            assert_eq!(node.last_link, prev, "node {} has a broken last link", id);

            if let Some(link_id) = node.canonical_origin {
                let link = &self.links[link_id.index()];
                assert_eq!(link.target, id, "canonical link of {} points elsewhere", id);
                let origin = match link.origin {
                    Some(origin) => origin,
                    None => panic!("canonical link of {} is detached", id),
                };
                assert!(origin < id, "node {} is an alias of higher node {}", id, origin);
                if self.done_simplification {
                    assert!(
                        self.nodes[origin].is_canonical(),
                        "node {} is an alias of alias {}",
                        id,
                        origin
                    );
                    assert!(!node.has_children(), "alias {} still has children", id);
                }
            }
        }

        if self.done_simplification {
            let mut aliases = 0;
            for node in &self.nodes {
                for link in self.children(node.id()) {
                    let target = &self.nodes[link.target];
                    let back = target.canonical_origin.map(|l| self.links[l.index()].origin);
                    assert_eq!(
                        back,
                        Some(Some(node.id())),
                        "node {} links to {}, which is not its alias",
                        node.id(),
                        link.target
                    );
                    assert_eq!(
                        target.symbol.real_is_zero,
                        node.symbol.real_is_zero,
                        "nullity of {} differs from its canonical node",
                        link.target
                    );
                    assert_eq!(
                        target.symbol.im_is_zero,
                        node.symbol.im_is_zero,
                        "nullity of {} differs from its canonical node",
                        link.target
                    );
                    aliases += 1;
                }
                if node.id() != 0 && node.is_canonical() {
                    assert!(!node.is_zero(), "zero node {} is not under 0", node.id());
                }
            }
            assert_eq!(aliases, self.alias_count);
        }

        let mut cursor = self.free_head;
        while let Some(link_id) = cursor {
            let link = &self.links[link_id.index()];
            assert!(link.origin.is_none(), "free link {} is attached", link_id);
            cursor = link.next;
        }
    }
}

/// Iterates over the outgoing links of a node.
pub struct Children<'a> {
    tree: &'a SymbolTree,
    cursor: Option<LinkId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a SymbolLink;

    fn next(&mut self) -> Option<&'a SymbolLink> {
        let link_id = self.cursor?;
        let link = &self.tree.links[link_id.index()];
        self.cursor = link.next;
        Some(link)
    }
}

impl fmt::Display for SymbolTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node.id())?;
            if let Some(link_id) = node.canonical_origin {
                let link = &self.links[link_id.index()];
                match link.origin {
                    Some(origin) => write!(f, " -> {} {}", origin, link.link_type)?,
                    None => write!(f, " -> ? {}", link.link_type)?,
                }
            }
            match (node.real_is_zero(), node.im_is_zero()) {
                (true, true) => write!(f, " [zero]")?,
                (true, false) => write!(f, " [imaginary]")?,
                (false, true) => write!(f, " [real]")?,
                (false, false) => {}
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(SymbolId, SymbolId, bool, bool)]) -> SymbolTree {
        let mut set = SymbolSet::from_pairs(
            pairs
                .iter()
                .map(|&(l, r, n, c)| SymbolPair::with(l, r, n, c)),
        );
        set.pack();
        SymbolTree::new(&set)
    }

    fn targets(tree: &SymbolTree, id: SymbolId) -> Vec<SymbolId> {
        tree.children(id).map(|link| link.target()).collect()
    }

    #[test]
    fn test_construction_links_from_lower_end() {
        let tree = build(&[(3, 1, false, false), (1, 2, true, false), (2, 3, false, true)]);
        tree.validate();
        assert_eq!(tree.count_nodes(), 4);
        assert_eq!(tree.count_links(), 3);
        assert_eq!(targets(&tree, 1), vec![2, 3]);
        assert_eq!(targets(&tree, 2), vec![3]);
        assert!(targets(&tree, 3).is_empty());
        let link = tree.children(2).next().unwrap();
        assert_eq!(link.origin(), Some(2));
        assert_eq!(link.link_type(), EqualityType::CONJUGATED);
    }

    #[test]
    fn test_insert_ordered_out_of_order() {
        // 4 has no relations, so nothing links to it yet
        let mut set = SymbolSet::from_parts(
            vec![Symbol::new(4)],
            vec![
                SymbolPair::with(1, 2, false, false),
                SymbolPair::with(1, 3, false, false),
                SymbolPair::with(1, 5, false, false),
            ],
        );
        set.pack();
        let mut tree = SymbolTree::new(&set);
        assert_eq!(tree.count_nodes(), 6);
        assert_eq!(targets(&tree, 1), vec![2, 3, 5]);

        let link = tree.allocate_link(EqualityType::NEGATED, 4);
        assert_eq!(tree.insert_ordered(1, link), link);
        assert_eq!(targets(&tree, 1), vec![2, 3, 4, 5]);
        assert_eq!(tree.link(link).link_type(), EqualityType::NEGATED);
        assert_eq!(tree.count_free_links(), 0);
        let link = tree.allocate_link(EqualityType::NEGATED, 0);
        assert_eq!(tree.insert_ordered(1, link), link);
        tree.validate();
        assert_eq!(targets(&tree, 1), vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn test_insert_ordered_merges_duplicates() {
        let mut tree = build(&[(1, 2, false, false), (1, 3, false, false)]);
        let link = tree.allocate_link(EqualityType::CONJUGATED, 2);
        let kept = tree.insert_ordered(1, link);
        assert_ne!(kept, link);
        assert_eq!(targets(&tree, 1), vec![2, 3]);
        assert_eq!(
            tree.link(kept).link_type(),
            EqualityType::EQUAL | EqualityType::CONJUGATED
        );
        assert_eq!(tree.count_free_links(), 1);
        tree.validate();
    }

    #[test]
    fn test_detach_and_recycle() {
        let mut tree = build(&[(1, 2, false, false), (1, 3, false, false), (1, 4, false, false)]);
        let middle = tree.nodes[1].first_link.and_then(|l| tree.link(l).next).unwrap();
        tree.detach(middle);
        tree.release_link(middle);
        assert_eq!(targets(&tree, 1), vec![2, 4]);
        assert_eq!(tree.count_free_links(), 1);
        tree.validate();

        let reused = tree.allocate_link(EqualityType::NEGATED, 3);
        assert_eq!(reused, middle);
        assert_eq!(tree.count_free_links(), 0);
        tree.insert_ordered(1, reused);
        assert_eq!(targets(&tree, 1), vec![2, 3, 4]);
        assert_eq!(tree.count_links(), 3);
        tree.validate();
    }

    #[test]
    #[should_panic(expected = "still attached")]
    fn test_release_attached_link() {
        let mut tree = build(&[(1, 2, false, false)]);
        let link = tree.nodes[1].first_link.unwrap();
        tree.release_link(link);
    }

    #[test]
    #[should_panic(expected = "already belongs")]
    fn test_insert_attached_link() {
        let mut tree = build(&[(1, 2, false, false), (1, 3, false, false)]);
        let link = tree.nodes[1].first_link.unwrap();
        tree.insert_ordered(2, link);
    }

    #[test]
    #[should_panic(expected = "packed symbol set")]
    fn test_build_from_unpacked_set() {
        let set = SymbolSet::new();
        SymbolTree::new(&set);
    }

    #[test]
    fn test_take_children_and_loosen() {
        let mut tree = build(&[(1, 2, false, false), (1, 3, false, false)]);
        let head = tree.take_children(1).unwrap();
        assert!(!tree.nodes[1].has_children());
        let next = tree.loosen(head).unwrap();
        assert_eq!(tree.link(head).origin(), None);
        assert_eq!(tree.loosen(next), None);
        tree.release_link(head);
        tree.release_link(next);
        assert_eq!(tree.count_free_links(), 2);
        tree.validate();
    }

    #[test]
    fn test_reflexive_link_implies_zero() {
        let tree = build(&[(1, 1, false, true), (1, 2, false, true)]);
        let links: Vec<_> = tree.children(1).collect();
        assert!(links[0].is_reflexive());
        assert_eq!(links[0].implies_zero(), (false, true));
        assert!(!links[1].is_reflexive());
        assert_eq!(links[1].implies_zero(), (false, false));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_canonical_id_unknown_id() {
        let tree = build(&[(1, 2, false, false)]);
        tree.canonical_id(3);
    }

    #[test]
    fn test_substitute_unknown_id() {
        let tree = build(&[(1, 2, false, false)]);
        let expr = SymbolExpression::with(17, true, true);
        assert_eq!(tree.substitute(expr), expr);
    }

    #[test]
    fn test_unsimplified_nodes_are_their_own_canon() {
        let tree = build(&[(1, 2, true, false)]);
        assert!(!tree.ready());
        assert_eq!(tree.canonical_id(2), 2);
        assert_eq!(tree.canonical_expression(2), SymbolExpression::new(2));
        assert_eq!(
            tree.substitute(SymbolExpression::with(2, true, true)),
            SymbolExpression::with(2, true, true)
        );
    }
}

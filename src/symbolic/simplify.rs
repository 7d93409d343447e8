use std::collections::HashSet;

use tracing::{debug, trace};

use crate::symbolic::equality_type::{compose, degenerate, reflexive_implies_zero, EqualityType};
use crate::symbolic::symbol::SymbolId;
use crate::symbolic::symbol_tree::{LinkId, SymbolTree};

// A link found below the node being simplified, whose target already has a canonical origin.
#[derive(Debug, Clone, Copy)]
struct RebaseCandidate {
    // The link below the base node.
    link: LinkId,

    // The canonical origin of the link's target.
    canonical_link: LinkId,

    // How the link's target relates to the base node.
    relation_to_base: EqualityType,
}

// A candidate, resolved against the canonical node it leads to.
// Recorded before any merging, since merging rewrites the canonical links.
#[derive(Debug, Clone, Copy)]
struct ResolvedCandidate {
    canonical_link: LinkId,

    canonical_node: SymbolId,

    // The base node is base_relation applied to canonical_node.
    base_relation: EqualityType,
}

// How a candidate relates to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PivotKind {
    // Reached through the pivot's own canonical link.
    Pivot,

    // Reached through a different link from the pivot's canonical node.
    FalsePivot,

    // Reached through a different canonical node, which has to be merged in.
    NotPivot,
}

// One level of an explicit depth-first traversal.
// The cursor walks a list of links. Every link below it relates to the root by relation.
struct Frame {
    cursor: Option<LinkId>,
    relation: EqualityType,
}

impl SymbolTree {
    /// Collapses every connected group of symbols into a star around its lowest-id member.
    /// Calling this more than once does nothing.
    pub fn simplify(&mut self) {
        if self.done_simplification {
            return;
        }

        for base in 0..self.nodes.len() {
            self.simplify_node(base);
        }

        self.propagate_nullity();
        self.sweep_zero();
        self.alias_count = self.count_noncanonical_nodes();
        self.done_simplification = true;

        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            aliases = self.alias_count,
            "simplified symbol tree"
        );

        #[cfg(any(test, feature = "validate"))]
        self.validate();
    }

    fn simplify_node(&mut self, base: SymbolId) {
        let node = &self.nodes[base];
        if !node.is_canonical() || !node.has_children() {
            return;
        }

        let candidates = self.find_already_linked(base);
        if candidates.is_empty() {
            self.incorporate_all_descendants(base, base, EqualityType::EQUAL);
            return;
        }

        let root = self.rebase(base, &candidates);
        let base_link = self.nodes[base]
            .canonical_origin
            .expect("rebased node has no canonical origin");
        let base_relation = self.links[base_link.index()].link_type;
        self.incorporate_all_descendants(base, root, base_relation);
    }

    // Finds every link below the base node that leads to an already-aliased node.
    // Aliased nodes have no children, so the search doesn't go past them.
    fn find_already_linked(&self, base: SymbolId) -> Vec<RebaseCandidate> {
        let mut candidates = vec![];
        let mut visited = HashSet::new();
        visited.insert(base);

        let mut stack = vec![Frame {
            cursor: self.nodes[base].first_link,
            relation: EqualityType::EQUAL,
        }];
        while let Some(frame) = stack.last_mut() {
            let Some(link_id) = frame.cursor else {
                stack.pop();
                continue;
            };
            let link = &self.links[link_id.index()];
            frame.cursor = link.next;
            if link.is_reflexive() {
                continue;
            }
            let relation = compose(frame.relation, link.link_type);

            let target = &self.nodes[link.target];
            if let Some(canonical_link) = target.canonical_origin {
                candidates.push(RebaseCandidate {
                    link: link_id,
                    canonical_link,
                    relation_to_base: relation,
                });
            } else if target.has_children() && visited.insert(link.target) {
                stack.push(Frame {
                    cursor: target.first_link,
                    relation,
                });
            }
        }
        candidates
    }

    fn classify(&self, candidate: &ResolvedCandidate, pivot: &ResolvedCandidate) -> PivotKind {
        if candidate.canonical_link == pivot.canonical_link {
            PivotKind::Pivot
        } else if candidate.canonical_node == pivot.canonical_node {
            PivotKind::FalsePivot
        } else {
            PivotKind::NotPivot
        }
    }

    // Makes the base node an alias of the lowest canonical node found below it, merging
    // any other canonical nodes found into that one.
    // Returns the canonical node.
    fn rebase(&mut self, base: SymbolId, candidates: &[RebaseCandidate]) -> SymbolId {
        let resolved: Vec<ResolvedCandidate> = candidates
            .iter()
            .map(|candidate| {
                let canonical_link = &self.links[candidate.canonical_link.index()];
                ResolvedCandidate {
                    canonical_link: candidate.canonical_link,
                    canonical_node: canonical_link
                        .origin
                        .expect("canonical origin link is detached"),
                    base_relation: compose(
                        canonical_link.link_type,
                        candidate.relation_to_base,
                    ),
                }
            })
            .collect();

        // The lowest canonical node wins, no matter which order things were found in.
        let pivot = *resolved
            .iter()
            .min_by_key(|candidate| candidate.canonical_node)
            .expect("rebase needs at least one candidate");
        let root = pivot.canonical_node;
        trace!(
            node = base,
            pivot = root,
            candidates = candidates.len(),
            "rebasing node"
        );

        // What the candidate links said is captured in the resolved relations.
        for candidate in candidates {
            self.detach(candidate.link);
            self.release_link(candidate.link);
        }

        let mut base_type = EqualityType::empty();
        for candidate in &resolved {
            match self.classify(candidate, &pivot) {
                PivotKind::Pivot | PivotKind::FalsePivot => {
                    base_type |= candidate.base_relation;
                }
                PivotKind::NotPivot => {}
            }
        }

        for candidate in &resolved {
            if self.classify(candidate, &pivot) != PivotKind::NotPivot {
                continue;
            }
            // other = base_relation(base), and base = base_type(root)
            let other = candidate.canonical_node;
            let relation = compose(candidate.base_relation, base_type);
            match self.nodes[other].canonical_origin {
                Some(existing) => {
                    // Already merged in via an earlier candidate
                    self.links[existing.index()].link_type |= relation;
                }
                None => {
                    trace!(node = other, into = root, "subsuming canonical node");
                    let link = self.allocate_link(relation, other);
                    self.subsume(root, link);
                }
            }
        }

        let link = self.allocate_link(base_type, base);
        let link = self.insert_ordered(root, link);
        self.nodes[base].canonical_origin = Some(link);
        self.absorb_nullity(root, base);
        root
    }

    // Moves every node below the base directly under the root.
    // base_relation is how the base relates to the root.
    fn incorporate_all_descendants(
        &mut self,
        base: SymbolId,
        root: SymbolId,
        base_relation: EqualityType,
    ) {
        let mut stack = vec![Frame {
            cursor: self.take_children(base),
            relation: base_relation,
        }];
        while let Some(frame) = stack.last_mut() {
            let Some(link_id) = frame.cursor else {
                stack.pop();
                continue;
            };
            let origin_relation = frame.relation;
            let link = &self.links[link_id.index()];
            let origin = link.origin.expect("taken link has no origin");
            let target = link.target;
            let link_type = link.link_type;
            frame.cursor = self.loosen(link_id);

            if target == origin {
                let (real_is_zero, im_is_zero) = reflexive_implies_zero(link_type);
                self.nodes[origin]
                    .symbol
                    .apply_nullity(real_is_zero, im_is_zero);
                self.nodes[root]
                    .symbol
                    .apply_nullity(real_is_zero, im_is_zero);
                self.release_link(link_id);
                continue;
            }

            let relation = compose(origin_relation, link_type);
            if let Some(existing) = self.nodes[target].canonical_origin {
                // Reached again by another path
                debug_assert_eq!(self.links[existing.index()].origin, Some(root));
                self.links[existing.index()].link_type |= relation;
                self.release_link(link_id);
                continue;
            }

            self.links[link_id.index()].link_type = relation;
            let link_id = self.insert_ordered(root, link_id);
            self.nodes[target].canonical_origin = Some(link_id);
            self.absorb_nullity(root, target);

            let children = self.take_children(target);
            if children.is_some() {
                stack.push(Frame {
                    cursor: children,
                    relation,
                });
            }
        }
    }

    // Makes the target of a detached link, and everything aliased to it, into aliases of the root.
    fn subsume(&mut self, root: SymbolId, link_id: LinkId) {
        let subsumed = self.links[link_id.index()].target;
        let link_id = self.insert_ordered(root, link_id);
        self.nodes[subsumed].canonical_origin = Some(link_id);
        self.absorb_nullity(root, subsumed);

        let link_type = self.links[link_id.index()].link_type;
        let mut cursor = self.take_children(subsumed);
        while let Some(child) = cursor {
            cursor = self.loosen(child);
            let child_link = &mut self.links[child.index()];
            debug_assert_ne!(child_link.target, subsumed);
            child_link.link_type = compose(child_link.link_type, link_type);
            let target = child_link.target;
            let child = self.insert_ordered(root, child);
            self.nodes[target].canonical_origin = Some(child);
            self.absorb_nullity(root, target);
        }
    }

    fn absorb_nullity(&mut self, root: SymbolId, alias: SymbolId) {
        let alias = self.nodes[alias].symbol;
        self.nodes[root]
            .symbol
            .apply_nullity(alias.real_is_zero, alias.im_is_zero);
    }

    // Every member of a group shares the nullity of the whole group.
    // Once that is known, the relations to the canonical node can be simplified.
    fn propagate_nullity(&mut self) {
        for id in 0..self.nodes.len() {
            let node = &self.nodes[id];
            if !node.is_canonical() || !node.has_children() {
                continue;
            }

            let mut symbol = node.symbol;
            let mut cursor = node.first_link;
            while let Some(link_id) = cursor {
                let link = &self.links[link_id.index()];
                let (real_is_zero, im_is_zero) = link.implies_zero();
                symbol.apply_nullity(real_is_zero, im_is_zero);
                let alias = &self.nodes[link.target].symbol;
                symbol.apply_nullity(alias.real_is_zero, alias.im_is_zero);
                cursor = link.next;
            }
            self.nodes[id].symbol = symbol;

            let mut cursor = self.nodes[id].first_link;
            while let Some(link_id) = cursor {
                let link = &mut self.links[link_id.index()];
                link.link_type = degenerate(link.link_type, symbol.real_is_zero, symbol.im_is_zero);
                let target = link.target;
                cursor = link.next;
                self.nodes[target]
                    .symbol
                    .apply_nullity(symbol.real_is_zero, symbol.im_is_zero);
            }
        }
    }

    // Everything that is zero ends up as an alias of symbol 0.
    fn sweep_zero(&mut self) {
        for id in 1..self.nodes.len() {
            let node = &self.nodes[id];
            if !node.is_canonical() || !node.is_zero() {
                continue;
            }
            assert!(self.nodes[0].is_zero(), "symbol 0 is not zero");
            trace!(node = id, "sweeping into zero");
            let link = self.allocate_link(EqualityType::EQUAL, id);
            self.subsume(0, link);
        }
    }

    fn count_noncanonical_nodes(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_canonical()).count()
    }
}

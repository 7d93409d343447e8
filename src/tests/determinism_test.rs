use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::symbolic::{SymbolExpression, SymbolId, SymbolPair, SymbolSet};
use crate::tests::common::TestTree;

fn random_pairs(rng: &mut StdRng, max_id: SymbolId, count: usize) -> Vec<SymbolPair> {
    (0..count)
        .map(|_| {
            SymbolPair::with(
                rng.gen_range(1..=max_id),
                rng.gen_range(1..=max_id),
                rng.gen_bool(0.3),
                rng.gen_bool(0.3),
            )
        })
        .collect()
}

// The lowest id connected to each id, ignoring nullity.
fn lowest_connected(pairs: &[SymbolPair]) -> BTreeMap<SymbolId, SymbolId> {
    let mut lowest: BTreeMap<SymbolId, SymbolId> = BTreeMap::new();
    for pair in pairs {
        lowest.insert(pair.left_id, pair.left_id);
        lowest.insert(pair.right_id, pair.right_id);
    }
    loop {
        let mut changed = false;
        for pair in pairs {
            let low = lowest[&pair.left_id].min(lowest[&pair.right_id]);
            for id in [pair.left_id, pair.right_id] {
                if lowest[&id] != low {
                    lowest.insert(id, low);
                    changed = true;
                }
            }
        }
        if !changed {
            return lowest;
        }
    }
}

fn check_relations_hold(t: &TestTree, pairs: &[SymbolPair]) {
    for pair in pairs {
        let left = t.substitute(SymbolExpression::new(pair.left_id));
        let right = t.substitute(SymbolExpression::with(
            pair.right_id,
            pair.negated,
            pair.conjugated,
        ));
        assert_eq!(
            left, right,
            "relation {} does not hold\ntree:\n{}",
            pair, t.tree
        );
    }
}

#[test]
fn test_input_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..50 {
        let mut pairs = random_pairs(&mut rng, 12, 10);
        let first = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        pairs.shuffle(&mut rng);
        let second = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        assert_eq!(first.tree.to_string(), second.tree.to_string());
        assert_eq!(first.tree.alias_count(), second.tree.alias_count());
    }
}

#[test]
fn test_random_relations_hold() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..200 {
        let pairs = random_pairs(&mut rng, 15, 12);
        let t = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        check_relations_hold(&t, &pairs);
    }
}

#[test]
fn test_dense_random_relations_hold() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let pairs = random_pairs(&mut rng, 30, 60);
        let t = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        check_relations_hold(&t, &pairs);
    }
}

#[test]
fn test_lowest_id_is_canonical() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..200 {
        let pairs = random_pairs(&mut rng, 20, 8);
        let t = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        for (id, low) in lowest_connected(&pairs) {
            if t.symbol(id).is_zero() {
                assert_eq!(t.canonical_id(id), 0);
            } else {
                assert_eq!(t.canonical_id(id), low, "tree:\n{}", t.tree);
            }
        }
    }
}

#[test]
fn test_every_alias_points_at_a_canonical_node() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let pairs = random_pairs(&mut rng, 25, 30);
        let t = TestTree::new(SymbolSet::from_pairs(pairs.iter().copied()));
        let mut aliases = 0;
        for node in t.tree.nodes() {
            if node.is_canonical() {
                continue;
            }
            aliases += 1;
            let canonical = t.tree.canonical_id(node.id());
            assert!(canonical < node.id());
            assert!(t.tree.node(canonical).is_canonical());
            assert!(!node.has_children());
        }
        assert_eq!(aliases, t.tree.alias_count());
    }
}

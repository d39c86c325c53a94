use glam::Vec2;
use physics2d::{
    body::{Body, BodyArena},
    bounds::Bounds,
    broadphase::DbvhTree,
    BodyHandle,
};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Insert { center: Vec2, half: Vec2 },
    Remove(prop::sample::Index),
    Move { which: prop::sample::Index, center: Vec2, half: Vec2 },
}

fn vec2(min: f32, max: f32) -> impl Strategy<Value = Vec2> {
    (min..max, min..max).prop_map(|(x, y)| Vec2::new(x, y))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (vec2(-50.0, 50.0), vec2(0.1, 5.0)).prop_map(|(center, half)| Op::Insert { center, half }),
        1 => any::<prop::sample::Index>().prop_map(Op::Remove),
        2 => (any::<prop::sample::Index>(), vec2(-50.0, 50.0), vec2(0.1, 5.0))
            .prop_map(|(which, center, half)| Op::Move { which, center, half }),
    ]
}

/// Walks the tree from the root checking parent links and branch boxes, returning the bodies of
/// the reachable leaves.
fn reachable_leaves(tree: &DbvhTree) -> Vec<BodyHandle> {
    let mut leaves = Vec::new();
    let mut stack = Vec::new();
    if let Some(root) = tree.root() {
        assert_eq!(tree.node(root).unwrap().parent(), None);
        stack.push(root);
    }
    while let Some(index) = stack.pop() {
        let node = tree.node(index).expect("reachable node is live");
        match node.children() {
            None => leaves.push(node.body().expect("leaf has a body")),
            Some([c0, c1]) => {
                let child0 = tree.node(c0).unwrap();
                let child1 = tree.node(c1).unwrap();
                assert_eq!(child0.parent(), Some(index));
                assert_eq!(child1.parent(), Some(index));
                assert_eq!(*node.bounds(), child0.bounds().union(child1.bounds()));
                stack.push(c0);
                stack.push(c1);
            }
        }
    }
    leaves
}

proptest! {
    #[test]
    fn insert_remove_keeps_tree_valid(ops in prop::collection::vec(op(), 1..80)) {
        let mut arena = BodyArena::new();
        let mut tree = DbvhTree::default();
        // body -> (proxy, tight box)
        let mut live: HashMap<BodyHandle, (u32, Bounds)> = HashMap::new();
        let mut order: Vec<BodyHandle> = Vec::new();

        for op in ops {
            match op {
                Op::Insert { center, half } => {
                    let body = arena.add(Body::default());
                    let tight = Bounds::from_center_half_extents(center, half);
                    let proxy = tree.insert(body, tight);
                    live.insert(body, (proxy, tight));
                    order.push(body);
                }
                Op::Remove(which) => {
                    if order.is_empty() {
                        continue;
                    }
                    let body = order.remove(which.index(order.len()));
                    let (proxy, _) = live.remove(&body).unwrap();
                    tree.remove(proxy);
                    arena.remove(body);
                }
                Op::Move { which, center, half } => {
                    if order.is_empty() {
                        continue;
                    }
                    let body = order[which.index(order.len())];
                    let tight = Bounds::from_center_half_extents(center, half);
                    let entry = live.get_mut(&body).unwrap();
                    entry.0 = tree.update(entry.0, tight);
                    entry.1 = tight;
                }
            }

            let mut leaves = reachable_leaves(&tree);
            prop_assert_eq!(leaves.len(), live.len());
            prop_assert_eq!(tree.leaf_count(), live.len());
            if !live.is_empty() {
                prop_assert_eq!(tree.node_count(), 2 * live.len() - 1);
            }
            leaves.sort();
            let mut expected: Vec<_> = live.keys().copied().collect();
            expected.sort();
            prop_assert_eq!(leaves, expected);

            // every leaf still contains its body's tight box
            for (body, (proxy, tight)) in &live {
                let node = tree.node(*proxy).unwrap();
                prop_assert_eq!(node.body(), Some(*body));
                prop_assert!(tight.is_inside(node.bounds()));
            }
        }

        for body in order.drain(..) {
            let (proxy, _) = live.remove(&body).unwrap();
            tree.remove(proxy);
        }
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn collision_pairs_match_brute_force(
        boxes in prop::collection::vec((vec2(-20.0, 20.0), vec2(0.1, 3.0)), 0..40)
    ) {
        let mut arena = BodyArena::new();
        let mut tree = DbvhTree::default();
        let mut proxies = Vec::new();
        for (center, half) in boxes {
            let body = arena.add(Body::default());
            proxies.push((body, tree.insert(body, Bounds::from_center_half_extents(center, half))));
        }

        let mut expected = Vec::new();
        for (i, &(a, proxy_a)) in proxies.iter().enumerate() {
            for &(b, proxy_b) in &proxies[i + 1..] {
                let bounds_a = tree.node(proxy_a).unwrap().bounds();
                let bounds_b = tree.node(proxy_b).unwrap().bounds();
                if bounds_a.overlaps(bounds_b) {
                    expected.push((a.min(b), a.max(b)));
                }
            }
        }
        expected.sort();

        let mut found: Vec<_> = tree
            .test_collision()
            .iter()
            .map(|pair| (pair.a.min(pair.b), pair.a.max(pair.b)))
            .collect();
        found.sort();
        prop_assert_eq!(found, expected);
    }
}

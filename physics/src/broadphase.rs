use crate::{body::BodyHandle, bounds::Bounds};

pub const NULL_NODE: u32 = u32::MAX;

pub const DEFAULT_ENLARGE_FACTOR: f32 = 1.2;

/// A pair of bodies whose enlarged boxes overlap.
#[derive(Copy, Clone, Debug)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl PartialEq for CollisionPair {
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl Eq for CollisionPair {}

#[derive(Copy, Clone, Debug)]
pub struct DbvhNode {
    bounds: Bounds,
    area: f32,
    parent: u32,
    children: [u32; 2],
    body: Option<BodyHandle>,
    // which of the parent's children slots holds this node
    child_index: usize,
}

impl DbvhNode {
    fn leaf(body: BodyHandle, bounds: Bounds) -> Self {
        Self {
            bounds,
            area: bounds.area(),
            parent: NULL_NODE,
            children: [NULL_NODE; 2],
            body: Some(body),
            child_index: 0,
        }
    }

    fn branch(parent: u32, children: [u32; 2], bounds: Bounds) -> Self {
        Self {
            bounds,
            area: bounds.area(),
            parent,
            children,
            body: None,
            child_index: 0,
        }
    }

    fn free() -> Self {
        Self {
            bounds: Bounds::new(),
            area: 0.0,
            parent: NULL_NODE,
            children: [NULL_NODE; 2],
            body: None,
            child_index: 0,
        }
    }

    fn is_free(&self) -> bool {
        self.body.is_none() && self.children[0] == NULL_NODE
    }

    /// The enlarged box of a leaf, or the union of the children's boxes.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn area(&self) -> f32 {
        self.area
    }

    pub fn is_leaf(&self) -> bool {
        self.children[0] == NULL_NODE
    }

    pub fn parent(&self) -> Option<u32> {
        if self.parent == NULL_NODE {
            None
        } else {
            Some(self.parent)
        }
    }

    pub fn children(&self) -> Option<[u32; 2]> {
        if self.is_leaf() {
            None
        } else {
            Some(self.children)
        }
    }

    /// The body owning a leaf.
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

/// Dynamic bounding volume hierarchy over enlarged body boxes.
#[derive(Clone, Debug)]
pub struct DbvhTree {
    nodes: Vec<DbvhNode>,
    free_list: Vec<u32>,
    root: u32,
    leaf_count: usize,
    enlarge_factor: f32,
    pairs: Vec<CollisionPair>,
}

impl Default for DbvhTree {
    fn default() -> Self {
        Self::new(DEFAULT_ENLARGE_FACTOR)
    }
}

impl DbvhTree {
    pub fn new(enlarge_factor: f32) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NULL_NODE,
            leaf_count: 0,
            enlarge_factor,
            pairs: Vec::new(),
        }
    }

    pub fn root(&self) -> Option<u32> {
        if self.root == NULL_NODE {
            None
        } else {
            Some(self.root)
        }
    }

    /// Returns `None` for indices that are out of range or on the free list.
    pub fn node(&self, index: u32) -> Option<&DbvhNode> {
        self.nodes
            .get(index as usize)
            .filter(|node| !node.is_free())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Live nodes, leaves and branches.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root == NULL_NODE
    }

    /// Pairs found by the last call to [`DbvhTree::test_collision`].
    pub fn pairs(&self) -> &[CollisionPair] {
        &self.pairs
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = NULL_NODE;
        self.leaf_count = 0;
        self.pairs.clear();
    }

    fn allocate(&mut self, node: DbvhNode) -> u32 {
        if let Some(index) = self.free_list.pop() {
            self.nodes[index as usize] = node;
            index
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    fn release(&mut self, index: u32) {
        self.nodes[index as usize] = DbvhNode::free();
        self.free_list.push(index);
    }

    fn node_ref(&self, index: u32) -> &DbvhNode {
        &self.nodes[index as usize]
    }

    fn node_mut(&mut self, index: u32) -> &mut DbvhNode {
        &mut self.nodes[index as usize]
    }

    /// Inserts a leaf for `body`, returning its proxy index.
    pub fn insert(&mut self, body: BodyHandle, tight: Bounds) -> u32 {
        let fat = tight.enlarged(self.enlarge_factor);
        let leaf = self.allocate(DbvhNode::leaf(body, fat));
        self.leaf_count += 1;

        if self.root == NULL_NODE {
            self.root = leaf;
            return leaf;
        }

        let sibling = self.find_best_sibling(&fat);
        let old_parent = self.node_ref(sibling).parent;
        let slot = self.node_ref(sibling).child_index;
        let bounds = self.node_ref(sibling).bounds.union(&fat);

        let parent = self.allocate(DbvhNode::branch(old_parent, [sibling, leaf], bounds));
        self.node_mut(parent).child_index = slot;
        if old_parent == NULL_NODE {
            self.root = parent;
        } else {
            self.node_mut(old_parent).children[slot] = parent;
        }

        let sibling_node = self.node_mut(sibling);
        sibling_node.parent = parent;
        sibling_node.child_index = 0;
        let leaf_node = self.node_mut(leaf);
        leaf_node.parent = parent;
        leaf_node.child_index = 1;

        self.refit_from(parent);
        leaf
    }

    /// Branch and bound search for the node whose pairing with the new leaf adds the least area
    /// to the tree.
    fn find_best_sibling(&self, fat: &Bounds) -> u32 {
        let leaf_area = fat.area();
        let mut best = self.root;
        let mut best_cost = f32::MAX;

        let mut stack = vec![(self.root, 0.0f32)];
        while let Some((index, inherited_cost)) = stack.pop() {
            let node = self.node_ref(index);
            let direct_cost = node.bounds.union_area(fat);
            let cost = direct_cost + inherited_cost;
            if cost < best_cost {
                best_cost = cost;
                best = index;
            }

            if !node.is_leaf() {
                // every descendant also grows this node
                let child_inherited_cost = inherited_cost + direct_cost - node.area;
                if leaf_area + child_inherited_cost < best_cost {
                    stack.push((node.children[0], child_inherited_cost));
                    stack.push((node.children[1], child_inherited_cost));
                }
            }
        }
        best
    }

    /// Walks to the root recomputing boxes, rotating a child with its uncle whenever that
    /// shrinks the node.
    fn refit_from(&mut self, mut index: u32) {
        while index != NULL_NODE {
            let [c0, c1] = self.node_ref(index).children;
            let current_area = self
                .node_ref(c0)
                .bounds
                .union_area(&self.node_ref(c1).bounds);

            let parent = self.node_ref(index).parent;
            if parent != NULL_NODE {
                let slot = self.node_ref(index).child_index;
                let uncle = self.node_ref(parent).children[1 - slot];
                let uncle_bounds = self.node_ref(uncle).bounds;

                let keep0_area = self.node_ref(c0).bounds.union_area(&uncle_bounds);
                let keep1_area = self.node_ref(c1).bounds.union_area(&uncle_bounds);
                let (keep, rotated_area) = if keep1_area < keep0_area {
                    (1, keep1_area)
                } else {
                    (0, keep0_area)
                };

                if rotated_area < current_area {
                    let moved_slot = 1 - keep;
                    let moved = self.node_ref(index).children[moved_slot];

                    self.node_mut(index).children[moved_slot] = uncle;
                    let uncle_node = self.node_mut(uncle);
                    uncle_node.parent = index;
                    uncle_node.child_index = moved_slot;

                    self.node_mut(parent).children[1 - slot] = moved;
                    let moved_node = self.node_mut(moved);
                    moved_node.parent = parent;
                    moved_node.child_index = 1 - slot;
                }
            }

            let [c0, c1] = self.node_ref(index).children;
            let bounds = self.node_ref(c0).bounds.union(&self.node_ref(c1).bounds);
            let node = self.node_mut(index);
            node.bounds = bounds;
            node.area = bounds.area();
            index = node.parent;
        }
    }

    /// Removes a leaf. Its parent is freed and the sibling takes the parent's place.
    pub fn remove(&mut self, proxy: u32) {
        debug_assert!(
            self.node(proxy).map_or(false, |node| node.is_leaf()),
            "remove called with invalid proxy {}",
            proxy
        );
        self.leaf_count -= 1;

        let parent = self.node_ref(proxy).parent;
        if parent == NULL_NODE {
            self.release(proxy);
            self.root = NULL_NODE;
            return;
        }

        let slot = self.node_ref(proxy).child_index;
        let sibling = self.node_ref(parent).children[1 - slot];
        let grand_parent = self.node_ref(parent).parent;
        if grand_parent == NULL_NODE {
            self.root = sibling;
            let sibling_node = self.node_mut(sibling);
            sibling_node.parent = NULL_NODE;
            sibling_node.child_index = 0;
        } else {
            let parent_slot = self.node_ref(parent).child_index;
            self.node_mut(grand_parent).children[parent_slot] = sibling;
            let sibling_node = self.node_mut(sibling);
            sibling_node.parent = grand_parent;
            sibling_node.child_index = parent_slot;
            self.refit_from(grand_parent);
        }

        self.release(proxy);
        self.release(parent);
    }

    /// Keeps the leaf while the tight box stays inside its enlarged box, otherwise reinserts it.
    /// The returned proxy may differ from the one passed in.
    pub fn update(&mut self, proxy: u32, tight: Bounds) -> u32 {
        let node = self.node_ref(proxy);
        let body = match node.body {
            Some(body) => body,
            None => {
                debug_assert!(false, "update called with invalid proxy {}", proxy);
                return proxy;
            }
        };
        if tight.is_inside(&node.bounds) {
            return proxy;
        }

        self.remove(proxy);
        self.insert(body, tight)
    }

    /// Finds every pair of leaves with overlapping boxes.
    pub fn test_collision(&mut self) -> &[CollisionPair] {
        let mut pairs = std::mem::take(&mut self.pairs);
        pairs.clear();
        if self.root != NULL_NODE {
            self.collide_self(self.root, &mut pairs);
        }
        self.pairs = pairs;
        &self.pairs
    }

    fn collide_self(&self, index: u32, pairs: &mut Vec<CollisionPair>) {
        let node = self.node_ref(index);
        if node.is_leaf() {
            return;
        }
        let [c0, c1] = node.children;
        self.collide_self(c0, pairs);
        self.collide_self(c1, pairs);
        self.collide_pair(c0, c1, pairs);
    }

    fn collide_pair(&self, a: u32, b: u32, pairs: &mut Vec<CollisionPair>) {
        let node_a = self.node_ref(a);
        let node_b = self.node_ref(b);
        if !node_a.bounds.overlaps(&node_b.bounds) {
            return;
        }

        match (node_a.body, node_b.body) {
            (Some(body_a), Some(body_b)) => pairs.push(CollisionPair {
                a: body_a,
                b: body_b,
            }),
            (Some(_), None) => {
                let [c0, c1] = node_b.children;
                self.collide_pair(a, c0, pairs);
                self.collide_pair(a, c1, pairs);
            }
            (None, _) => {
                let [c0, c1] = node_a.children;
                self.collide_pair(b, c0, pairs);
                self.collide_pair(b, c1, pairs);
            }
        }
    }
}

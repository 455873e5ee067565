//! An arena-backed AVL tree mapping integer keys to string values.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A missing subtree has height -1, so a leaf has
//   height 0.
// - The balance factor of a node `x` is `h(left(x)) - h(right(x))`.
// - A node is `d`-heavy if its `d` subtree is at least two taller than the other one.
//
// The invariants upheld between public calls are:
// 1. An in-order walk yields strictly increasing keys.
// 2. Every balance factor is -1, 0 or 1.
// 3. Every cached height is `1 + max(h(left), h(right))`.
// 4. Every child's parent link names the node that owns it, and the root has no parent.
//
// Nodes live in an arena and link to one another by index. The parent link exists only so that
// rebalancing can climb from the point of a mutation to the root without recursion; it never
// owns anything.

mod arena;
mod debug;
mod error;
mod iter;

#[cfg(any(test, feature = "model"))]
pub mod model;


use core::{cmp::Ordering, fmt, mem};

use tracing::{debug, trace};

use crate::arena::{Arena, Dir, Link, Node, NodeId};

pub use crate::{error::InvariantError, iter::Iter};

/// A self-balancing binary search tree with `i64` keys and `String` values.
///
/// Lookups, insertions, updates and deletions all complete in _O(log(n))_ time.
///
/// Deleting a node with two children moves its in-order successor's entry into its slot, so
/// deletion invalidates any position previously observed for either key.
pub struct AvlTree {
    nodes: Arena,
    root: Link,
}

impl AvlTree {
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree {
        AvlTree {
            nodes: Arena::new(),
            root: None,
        }
    }

    /// Returns a new empty tree with room for `capacity` nodes before reallocating.
    pub fn with_capacity(capacity: usize) -> AvlTree {
        AvlTree {
            nodes: Arena::with_capacity(capacity),
            root: None,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        let empty = self.len() == 0;
        debug_assert_eq!(empty, self.root.is_none());
        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the height of the tree: -1 when empty, 0 for a single node.
    pub fn height(&self) -> i8 {
        self.height_of(self.root)
    }

    /// Returns `true` if the tree contains `key`.
    pub fn contains_key(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: i64) -> Option<&str> {
        let node = self.find(key)?;
        Some(&self.nodes[node].value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: i64) -> Option<&mut String> {
        let node = self.find(key)?;
        Some(&mut self.nodes[node].value)
    }

    /// Replaces the value stored under `key`, returning the previous one.
    ///
    /// If `key` is not present this does nothing and returns `None`; it never inserts.
    pub fn update(&mut self, key: i64, value: impl Into<String>) -> Option<String> {
        let node = self.find(key)?;
        Some(mem::replace(&mut self.nodes[node].value, value.into()))
    }

    /// Returns the entry with the minimum key.
    pub fn first(&self) -> Option<(i64, &str)> {
        let first = self.min_in_subtree(self.root?);
        Some(self.entry(first))
    }

    /// Returns the entry with the maximum key.
    pub fn last(&self) -> Option<(i64, &str)> {
        let last = self.max_in_subtree(self.root?);
        Some(self.entry(last))
    }

    /// Removes and returns the entry with the minimum key.
    pub fn pop_first(&mut self) -> Option<(i64, String)> {
        let first = self.min_in_subtree(self.root?);
        Some(self.remove_at(first))
    }

    /// Removes and returns the entry with the maximum key.
    pub fn pop_last(&mut self) -> Option<(i64, String)> {
        let last = self.max_in_subtree(self.root?);
        Some(self.remove_at(last))
    }

    /// Returns an iterator over the entries of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Inserts `value` under `key`.
    ///
    /// If `key` is already present its value is replaced in place and the previous value is
    /// returned; the shape of the tree does not change. Otherwise a new leaf is attached and the
    /// tree is rebalanced from the leaf's parent up to the root.
    pub fn insert(&mut self, key: i64, value: impl Into<String>) -> Option<String> {
        let value = value.into();

        let Some(root) = self.root else {
            // Tree is empty. The new node becomes the root.
            debug!(key, "inserting root");
            self.root = Some(self.nodes.alloc(Node::new(key, value, None)));
            return None;
        };

        let mut parent = root;

        // Descend the tree, looking for an empty slot.
        let dir = loop {
            let dir = match key.cmp(&self.nodes[parent].key) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    debug!(key, "key already present, replacing value");
                    return Some(mem::replace(&mut self.nodes[parent].value, value));
                }
                Ordering::Greater => Dir::Right,
            };

            match self.nodes[parent].child(dir) {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let node = self.nodes.alloc(Node::new(key, value, Some(parent)));
        self.nodes[parent].set_child(dir, Some(node));
        debug!(key, parent = self.nodes[parent].key, ?dir, "attached new leaf");

        self.rebalance(Some(parent));

        None
    }

    /// Removes `key` from the tree, returning its value.
    ///
    /// Does nothing and returns `None` if `key` is not present.
    pub fn delete(&mut self, key: i64) -> Option<String> {
        let node = self.find(key)?;
        let (_, value) = self.remove_at(node);
        Some(value)
    }

    /// Verifies every structural invariant of the tree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if let Some(root) = self.root {
            if self.nodes[root].parent.is_some() {
                return Err(InvariantError::RootHasParent {
                    root: self.nodes[root].key,
                });
            }
        }

        let mut reachable = 0;
        self.check_subtree(self.root, None, None, &mut reachable)?;

        if reachable != self.len() {
            return Err(InvariantError::LengthMismatch {
                reachable,
                len: self.len(),
            });
        }

        Ok(())
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(error) = self.check_invariants() {
            panic!("AVL invariant violated: {error}");
        }
    }

    // Checks the subtree at `link`, whose keys must lie strictly between `lower` and `upper`.
    //
    // Returns the recomputed height of the subtree.
    fn check_subtree(
        &self,
        link: Link,
        lower: Option<i64>,
        upper: Option<i64>,
        reachable: &mut usize,
    ) -> Result<i8, InvariantError> {
        let Some(id) = link else {
            return Ok(-1);
        };

        // More nodes than the arena holds means the links form a cycle.
        *reachable += 1;
        if *reachable > self.len() {
            return Err(InvariantError::LengthMismatch {
                reachable: *reachable,
                len: self.len(),
            });
        }

        let node = &self.nodes[id];

        let below = lower.is_some_and(|lo| node.key <= lo);
        let above = upper.is_some_and(|hi| node.key >= hi);
        if below || above {
            return Err(InvariantError::OutOfOrder {
                key: node.key,
                lower,
                upper,
            });
        }

        for dir in [Dir::Left, Dir::Right] {
            if let Some(child) = node.child(dir) {
                if self.nodes[child].parent != Some(id) {
                    return Err(InvariantError::BrokenParentLink {
                        parent: node.key,
                        child: self.nodes[child].key,
                    });
                }
            }
        }

        let left = self.check_subtree(node.left(), lower, Some(node.key), reachable)?;
        let right = self.check_subtree(node.right(), Some(node.key), upper, reachable)?;

        let actual = 1 + left.max(right);
        if node.height != actual {
            return Err(InvariantError::StaleHeight {
                key: node.key,
                cached: node.height,
                actual,
            });
        }

        let balance = left - right;
        if !(-1..=1).contains(&balance) {
            return Err(InvariantError::Unbalanced {
                key: node.key,
                balance,
            });
        }

        Ok(actual)
    }

    fn find(&self, key: i64) -> Link {
        let mut opt_cur = self.root;
        let mut depth = 0_usize;

        loop {
            let Some(cur) = opt_cur else {
                trace!(key, depth, "key not found");
                return None;
            };

            match key.cmp(&self.nodes[cur].key) {
                Ordering::Less => opt_cur = self.nodes[cur].left(),
                Ordering::Equal => {
                    trace!(key, depth, "key found");
                    return Some(cur);
                }
                Ordering::Greater => opt_cur = self.nodes[cur].right(),
            }

            depth += 1;
        }
    }

    #[inline]
    fn entry(&self, node: NodeId) -> (i64, &str) {
        let node = &self.nodes[node];
        (node.key, &node.value)
    }

    // Returns the minimum node in the subtree rooted at `root`.
    fn min_in_subtree(&self, root: NodeId) -> NodeId {
        let mut cur = root;

        while let Some(left) = self.nodes[cur].left() {
            cur = left;
        }

        cur
    }

    // Returns the maximum node in the subtree rooted at `root`.
    fn max_in_subtree(&self, root: NodeId) -> NodeId {
        let mut cur = root;

        while let Some(right) = self.nodes[cur].right() {
            cur = right;
        }

        cur
    }

    // Unlinks `node` from the tree, frees it and rebalances.
    //
    // Returns the entry that was stored at `node` when this was called.
    fn remove_at(&mut self, node: NodeId) -> (i64, String) {
        // A node with two children trades entries with its successor[^1], which has no left
        // child. The successor's slot is then removed in its place.
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.
        let target = match (self.nodes[node].left(), self.nodes[node].right()) {
            (Some(_), Some(right)) => {
                let successor = self.min_in_subtree(right);
                let (a, b) = self.nodes.pair_mut(node, successor);
                mem::swap(&mut a.key, &mut b.key);
                mem::swap(&mut a.value, &mut b.value);
                successor
            }

            _ => node,
        };

        // `target` has at most one child, which is elevated to take its place.
        let parent = self.nodes[target].parent;
        let child = self.nodes[target].left().or(self.nodes[target].right());

        self.replace_child_or_set_root(parent, target, child);
        self.maybe_set_parent(child, parent);

        let removed = self.nodes.free(target);
        debug!(key = removed.key, "removed node");

        // If the root was removed, its child is the new root and the climb starts there.
        self.rebalance(parent.or(child));

        (removed.key, removed.value)
    }

    // Restores the height and balance invariants on `start` and all of its ancestors.
    //
    // The climb always runs to the root. After a deletion a rotation can shorten a subtree and
    // unbalance an ancestor further up, and even without rotations the ancestors' cached heights
    // must be refreshed.
    fn rebalance(&mut self, start: Link) {
        let mut opt_cur = start;

        while let Some(cur) = opt_cur {
            self.update_height(cur);

            let top = match self.heavy_side(cur) {
                None => cur,

                Some((dir, child)) => {
                    // If `child` leans away from `dir`, straighten it first so that a single
                    // rotation at `cur` suffices. Ties take the single rotation.
                    let outer = self.height_of(self.nodes[child].child(dir));
                    let inner = self.height_of(self.nodes[child].child(!dir));

                    if outer < inner {
                        self.rotate(child, dir);
                    }

                    self.rotate(cur, !dir)
                }
            };

            opt_cur = self.nodes[top].parent;
        }
    }

    // Returns the side on which `node` is too tall, along with the child on that side.
    fn heavy_side(&self, node: NodeId) -> Option<(Dir, NodeId)> {
        let left = self.nodes[node].left();
        let right = self.nodes[node].right();
        let (left_height, right_height) = (self.height_of(left), self.height_of(right));

        if left_height >= right_height + 2 {
            left.map(|l| (Dir::Left, l))
        } else if right_height >= left_height + 2 {
            right.map(|r| (Dir::Right, r))
        } else {
            None
        }
    }

    // Rotates `down` toward `dir`, lifting its `!dir` child into its place.
    //
    // Rotating toward `Dir::Left` is a left rotation: `down`'s right child rises and `down`
    // becomes its left child. The rising node's `dir` subtree moves across to `down`.
    //
    // Returns the node that rose. Heights of both moved nodes are recomputed, `down` first since
    // it now sits below the other.
    fn rotate(&mut self, down: NodeId, dir: Dir) -> NodeId {
        let Some(up) = self.nodes[down].child(!dir) else {
            panic!("cannot rotate node {:?} without a {:?} child", down, !dir);
        };

        let across = self.nodes[up].child(dir);
        let parent = self.nodes[down].parent;

        self.nodes[down].set_child(!dir, across);
        self.maybe_set_parent(across, Some(down));

        self.nodes[up].set_child(dir, Some(down));
        self.nodes[down].parent = Some(up);
        self.nodes[up].parent = parent;
        self.replace_child_or_set_root(parent, down, Some(up));

        self.update_height(down);
        self.update_height(up);

        debug!(
            down = self.nodes[down].key,
            up = self.nodes[up].key,
            ?dir,
            "rotated"
        );

        up
    }

    #[inline]
    fn maybe_set_parent(&mut self, opt_node: Link, parent: Link) {
        if let Some(node) = opt_node {
            self.nodes[node].parent = parent;
        }
    }

    #[inline]
    fn replace_child_or_set_root(&mut self, parent: Link, old_child: NodeId, new_child: Link) {
        match parent {
            Some(parent) => self.replace_child(parent, old_child, new_child),
            None => self.root = new_child,
        }
    }

    // Replaces the child link of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent link is not updated.
    fn replace_child(&mut self, parent: NodeId, old_child: NodeId, new_child: Link) {
        let Some(dir) = self.nodes[parent].which_child(old_child) else {
            panic!("node {old_child:?} is not a child of {parent:?}");
        };

        self.nodes[parent].set_child(dir, new_child);
    }

    #[inline]
    fn height_of(&self, link: Link) -> i8 {
        link.map_or(-1, |node| self.nodes[node].height)
    }

    #[inline]
    fn update_height(&mut self, node: NodeId) {
        let left = self.height_of(self.nodes[node].left());
        let right = self.height_of(self.nodes[node].right());
        self.nodes[node].height = 1 + left.max(right);
    }
}

impl Default for AvlTree {
    fn default() -> Self {
        AvlTree::new()
    }
}

impl fmt::Debug for AvlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'tree> IntoIterator for &'tree AvlTree {
    type Item = (i64, &'tree str);
    type IntoIter = Iter<'tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Into<String>> Extend<(i64, V)> for AvlTree {
    fn extend<I: IntoIterator<Item = (i64, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V: Into<String>> FromIterator<(i64, V)> for AvlTree {
    fn from_iter<I: IntoIterator<Item = (i64, V)>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

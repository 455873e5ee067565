use core::iter::FusedIterator;

use crate::{
    arena::{Dir, Link},
    AvlTree,
};

enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An in-order iterator over the entries of an [`AvlTree`].
///
/// The walk follows parent links, so it needs no stack.
pub struct Iter<'tree> {
    tree: &'tree AvlTree,

    front_cur: Link,
    front_from: CameFrom,

    len: usize,
}

impl<'tree> Iter<'tree> {
    pub(crate) fn new(tree: &'tree AvlTree) -> Self {
        Iter {
            tree,

            front_cur: tree.root,
            front_from: CameFrom::Parent,
            len: tree.len(),
        }
    }
}

impl<'tree> Iterator for Iter<'tree> {
    type Item = (i64, &'tree str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let tree = self.tree;
        let nodes = &tree.nodes;
        let mut cur = self.front_cur?;

        loop {
            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    while let Some(left) = nodes[cur].left() {
                        cur = left;
                    }

                    // Once the minimum is found, its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(tree.entry(cur));
                }

                CameFrom::Here => {
                    if let Some(right) = nodes[cur].right() {
                        self.front_from = CameFrom::Parent;
                        cur = right;
                    } else {
                        let Some(parent) = nodes[cur].parent else {
                            // The root had no right subtree left to visit.
                            self.front_cur = None;
                            return None;
                        };

                        self.front_from = match nodes[parent].which_child(cur) {
                            Some(Dir::Left) => CameFrom::LeftChild,
                            Some(Dir::Right) => CameFrom::RightChild,
                            None => unreachable!("parent link of {cur:?} is stale"),
                        };

                        cur = parent;
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we find a node whose left subtree we came out of.
                    loop {
                        let Some(parent) = nodes[cur].parent else {
                            self.front_cur = None;
                            return None;
                        };

                        let came_from_left = nodes[parent].left() == Some(cur);
                        cur = parent;

                        if came_from_left {
                            break;
                        }
                    }

                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

use core::{
    fmt, mem,
    ops::{Index, IndexMut, Not},
};

/// Index of a node slot in an [`Arena`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type Link = Option<NodeId>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) key: i64,
    pub(crate) value: String,
    pub(crate) height: i8,
    /// Non-owning back-reference; `None` for the root.
    pub(crate) parent: Link,
    children: [Link; 2],
}

impl Node {
    /// Returns a new leaf.
    pub(crate) fn new(key: i64, value: String, parent: Link) -> Node {
        Node {
            key,
            value,
            height: 0,
            parent,
            children: [None; 2],
        }
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link {
        self.children[dir as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> Link {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link) -> Link {
        mem::replace(&mut self.children[dir as usize], child)
    }

    /// Returns the side of this node that links to `child`, if any.
    #[inline]
    pub(crate) fn which_child(&self, child: NodeId) -> Option<Dir> {
        if self.left() == Some(child) {
            Some(Dir::Left)
        } else if self.right() == Some(child) {
            Some(Dir::Right)
        } else {
            None
        }
    }
}

enum Slot {
    Occupied(Node),
    Vacant { next_free: Link },
}

/// Slab storage for tree nodes.
///
/// Freed slots are threaded into a free list and reused by later allocations, so a `NodeId` is
/// only meaningful until the node it names is freed.
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free_head: Link,
    len: usize,
}

impl Arena {
    pub(crate) const fn new() -> Arena {
        Arena {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Arena {
        Arena {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.len += 1;

        match self.free_head {
            Some(id) => {
                match mem::replace(&mut self.slots[id.index()], Slot::Occupied(node)) {
                    Slot::Vacant { next_free } => self.free_head = next_free,
                    Slot::Occupied(_) => unreachable!("free list points at occupied slot {id:?}"),
                }
                id
            }

            None => {
                let raw = u32::try_from(self.slots.len()).expect("node arena exhausted");
                self.slots.push(Slot::Occupied(node));
                NodeId(raw)
            }
        }
    }

    pub(crate) fn free(&mut self, id: NodeId) -> Node {
        let vacant = Slot::Vacant {
            next_free: self.free_head,
        };

        match mem::replace(&mut self.slots[id.index()], vacant) {
            Slot::Occupied(node) => {
                self.free_head = Some(id);
                self.len -= 1;
                node
            }
            Slot::Vacant { .. } => panic!("double free of node {id:?}"),
        }
    }

    /// Returns mutable references to two distinct nodes.
    pub(crate) fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut Node, &mut Node) {
        assert_ne!(a, b, "`pair_mut` requires distinct nodes");

        let (lo, hi) = if a.index() < b.index() {
            (a, b)
        } else {
            (b, a)
        };

        let (head, tail) = self.slots.split_at_mut(hi.index());
        let lo_node = occupied_mut(&mut head[lo.index()], lo);
        let hi_node = occupied_mut(&mut tail[0], hi);

        if lo == a {
            (lo_node, hi_node)
        } else {
            (hi_node, lo_node)
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.len = 0;
    }
}

fn occupied_mut(slot: &mut Slot, id: NodeId) -> &mut Node {
    match slot {
        Slot::Occupied(node) => node,
        Slot::Vacant { .. } => panic!("dangling node id {id:?}"),
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("dangling node id {id:?}"),
        }
    }
}

impl IndexMut<NodeId> for Arena {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        occupied_mut(&mut self.slots[id.index()], id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(key: i64) -> Node {
        Node::new(key, format!("v{key}"), None)
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = Arena::new();

        let a = arena.alloc(leaf(1));
        let b = arena.alloc(leaf(2));
        assert_eq!(arena.len(), 2);

        let freed = arena.free(a);
        assert_eq!(freed.key, 1);
        assert_eq!(arena.len(), 1);

        let c = arena.alloc(leaf(3));
        assert_eq!(c, a);
        assert_eq!(arena[c].key, 3);
        assert_eq!(arena[b].key, 2);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut arena = Arena::new();

        let ids: Vec<NodeId> = (0..4).map(|k| arena.alloc(leaf(k))).collect();
        arena.free(ids[1]);
        arena.free(ids[3]);

        assert_eq!(arena.alloc(leaf(10)), ids[3]);
        assert_eq!(arena.alloc(leaf(11)), ids[1]);
        assert_eq!(arena.alloc(leaf(12)), NodeId(4));
    }

    #[test]
    fn pair_mut_preserves_argument_order() {
        let mut arena = Arena::new();
        let a = arena.alloc(leaf(1));
        let b = arena.alloc(leaf(2));

        let (x, y) = arena.pair_mut(b, a);
        assert_eq!((x.key, y.key), (2, 1));
        mem::swap(&mut x.value, &mut y.value);

        assert_eq!(arena[a].value, "v2");
        assert_eq!(arena[b].value, "v1");
    }

    #[test]
    #[should_panic(expected = "dangling node id")]
    fn freed_id_is_dangling() {
        let mut arena = Arena::new();
        let a = arena.alloc(leaf(1));
        arena.free(a);
        let _ = &arena[a];
    }

    #[test]
    fn which_child() {
        let mut parent = leaf(5);
        parent.set_child(Dir::Right, Some(NodeId(7)));

        assert_eq!(parent.which_child(NodeId(7)), Some(Dir::Right));
        assert_eq!(parent.which_child(NodeId(3)), None);
        assert_eq!(!Dir::Right, Dir::Left);
    }
}

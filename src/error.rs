use thiserror::Error;

/// A structural defect found by [`AvlTree::check_invariants`](crate::AvlTree::check_invariants).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("key {key} lies outside its subtree bounds (lower {lower:?}, upper {upper:?})")]
    OutOfOrder {
        key: i64,
        lower: Option<i64>,
        upper: Option<i64>,
    },

    #[error("node {key} caches height {cached} but its subtree has height {actual}")]
    StaleHeight { key: i64, cached: i8, actual: i8 },

    #[error("node {key} has balance factor {balance}")]
    Unbalanced { key: i64, balance: i8 },

    #[error("child {child} of node {parent} does not link back to it")]
    BrokenParentLink { parent: i64, child: i64 },

    #[error("root {root} has a parent link")]
    RootHasParent { root: i64 },

    #[error("{reachable} nodes are reachable from the root but the tree holds {len}")]
    LengthMismatch { reachable: usize, len: usize },
}

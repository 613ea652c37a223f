#![forbid(unsafe_code)]

//! Structural paths between a root element and its descendants.
//!
//! A path is the sequence of zero-based element-child indices leading from
//! `root` down to a node. It is only meaningful against a tree that is
//! structurally identical to the one it was computed on, which holds for a
//! clone until either side changes its child lists. After that, resolution
//! may land on the wrong node or fail; callers treat a miss as "drop this
//! update".

use crate::dom::DomTree;

/// Compute the path from `root` to `target`.
///
/// Returns an empty path when `target == root`, and `None` when `root` is
/// not an ancestor of `target`.
pub fn path_to<T: DomTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    target: &T::Node,
) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = target.clone();
    while current != *root {
        let parent = tree.parent_element(&current)?;
        let index = tree
            .element_children(&parent)
            .iter()
            .position(|child| *child == current)?;
        path.push(index);
        current = parent;
    }
    path.reverse();
    Some(path)
}

/// Walk `path` down from `root`.
///
/// Returns `None` as soon as an index is out of range.
pub fn resolve_path<T: DomTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    path: &[usize],
) -> Option<T::Node> {
    let mut current = root.clone();
    for &index in path {
        current = tree.element_children(&current).into_iter().nth(index)?;
    }
    Some(current)
}

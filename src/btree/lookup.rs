//! Read-only descents: point search and neighbor lookups.
//!
//! All comparisons are unsigned lexicographic byte order; there is no
//! locale or collation. Each function starts from the caller's cached root
//! and reads child nodes from disk as it descends, mutating nothing.

use std::cmp::Ordering;

use crate::error::{ensure_valid, Result};
use crate::storage::{Node, NodeFile};

/// Locates `key` among a node's live keys by linear scan.
///
/// Returns `(true, i)` when `keys[i] == key`; otherwise `(false, i)` where
/// `i` is the smallest index with `keys[i] > key` (or `keys.len()` when the
/// key is greater than all present keys), the index of the subtree that
/// would contain `key`.
pub(crate) fn find_key_index(node: &Node, key: &[u8]) -> (bool, usize) {
    for (i, existing) in node.keys.iter().enumerate() {
        match key.cmp(existing.as_slice()) {
            Ordering::Equal => return (true, i),
            Ordering::Less => return (false, i),
            Ordering::Greater => {}
        }
    }
    (false, node.keys.len())
}

/// Iterative point lookup starting at the cached root.
pub(crate) fn search(file: &NodeFile, root: &Node, key: &[u8]) -> Result<Option<u64>> {
    let (found, i) = find_key_index(root, key);
    if found {
        return Ok(Some(root.values[i]));
    }
    if root.is_leaf() {
        return Ok(None);
    }

    let mut node = file.read_node(root.children[i])?;
    loop {
        let (found, i) = find_key_index(&node, key);
        if found {
            return Ok(Some(node.values[i]));
        }
        if node.is_leaf() {
            return Ok(None);
        }
        node = file.read_node(node.children[i])?;
    }
}

/// Smallest key in the tree, or `None` when the tree is empty.
pub(crate) fn first_key(file: &NodeFile, root: &Node) -> Result<Option<Vec<u8>>> {
    if root.keys.is_empty() {
        return Ok(None);
    }
    let mut node = root.clone();
    while !node.is_leaf() {
        node = file.read_node(node.children[0])?;
    }
    Ok(node.keys.first().cloned())
}

/// Largest key in the tree, or `None` when the tree is empty.
pub(crate) fn last_key(file: &NodeFile, root: &Node) -> Result<Option<Vec<u8>>> {
    if root.keys.is_empty() {
        return Ok(None);
    }
    let mut node = root.clone();
    while !node.is_leaf() {
        node = file.read_node(node.children[node.children.len() - 1])?;
    }
    Ok(node.keys.last().cloned())
}

/// Greatest stored key `< key` (or `<= key` when `inclusive`).
pub(crate) fn lower(
    file: &NodeFile,
    root: &Node,
    key: &[u8],
    inclusive: bool,
) -> Result<Option<Vec<u8>>> {
    // best = greatest key below `key` seen on the path so far
    let mut best: Option<Vec<u8>> = None;
    let mut node = root.clone();
    loop {
        let (found, i) = find_key_index(&node, key);
        if found {
            if inclusive {
                return Ok(Some(node.keys[i].clone()));
            }
            if !node.is_leaf() {
                let subtree = file.read_node(node.children[i])?;
                return subtree_max(file, subtree).map(Some);
            }
            if i > 0 {
                return Ok(Some(node.keys[i - 1].clone()));
            }
            return Ok(best);
        }
        if i > 0 {
            best = Some(node.keys[i - 1].clone());
        }
        if node.is_leaf() {
            return Ok(best);
        }
        node = file.read_node(node.children[i])?;
    }
}

/// Least stored key `> key` (or `>= key` when `inclusive`).
pub(crate) fn higher(
    file: &NodeFile,
    root: &Node,
    key: &[u8],
    inclusive: bool,
) -> Result<Option<Vec<u8>>> {
    // best = least key above `key` seen on the path so far
    let mut best: Option<Vec<u8>> = None;
    let mut node = root.clone();
    loop {
        let (found, i) = find_key_index(&node, key);
        if found {
            if inclusive {
                return Ok(Some(node.keys[i].clone()));
            }
            if !node.is_leaf() {
                let subtree = file.read_node(node.children[i + 1])?;
                return subtree_min(file, subtree).map(Some);
            }
            if i + 1 < node.keys.len() {
                return Ok(Some(node.keys[i + 1].clone()));
            }
            return Ok(best);
        }
        if i < node.keys.len() {
            best = Some(node.keys[i].clone());
        }
        if node.is_leaf() {
            return Ok(best);
        }
        node = file.read_node(node.children[i])?;
    }
}

fn subtree_max(file: &NodeFile, mut node: Node) -> Result<Vec<u8>> {
    while !node.is_leaf() {
        node = file.read_node(node.children[node.children.len() - 1])?;
    }
    ensure_valid!(
        !node.keys.is_empty(),
        "node {} reached by max-descent holds no keys",
        node.index
    );
    Ok(node.keys[node.keys.len() - 1].clone())
}

fn subtree_min(file: &NodeFile, mut node: Node) -> Result<Vec<u8>> {
    while !node.is_leaf() {
        node = file.read_node(node.children[0])?;
    }
    ensure_valid!(
        !node.keys.is_empty(),
        "node {} reached by min-descent holds no keys",
        node.index
    );
    Ok(node.keys[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[&[u8]]) -> Node {
        let mut node = Node::empty(0);
        node.keys = keys.iter().map(|k| k.to_vec()).collect();
        node.values = (0..keys.len() as u64).collect();
        node
    }

    #[test]
    fn find_key_index_locates_present_key() {
        let node = leaf(&[b"b", b"d", b"f"]);

        assert_eq!(find_key_index(&node, b"b"), (true, 0));
        assert_eq!(find_key_index(&node, b"d"), (true, 1));
        assert_eq!(find_key_index(&node, b"f"), (true, 2));
    }

    #[test]
    fn find_key_index_returns_lower_bound_for_absent_key() {
        let node = leaf(&[b"b", b"d", b"f"]);

        assert_eq!(find_key_index(&node, b"a"), (false, 0));
        assert_eq!(find_key_index(&node, b"c"), (false, 1));
        assert_eq!(find_key_index(&node, b"e"), (false, 2));
        assert_eq!(find_key_index(&node, b"g"), (false, 3));
    }

    #[test]
    fn find_key_index_on_empty_node() {
        let node = Node::empty(0);

        assert_eq!(find_key_index(&node, b"x"), (false, 0));
    }

    #[test]
    fn find_key_index_compares_bytewise_not_by_length() {
        let node = leaf(&[b"ab", b"b"]);

        // "aa" < "ab" < "abc" < "b"
        assert_eq!(find_key_index(&node, b"aa"), (false, 0));
        assert_eq!(find_key_index(&node, b"abc"), (false, 1));
    }

    #[test]
    fn find_key_index_handles_empty_key() {
        let node = leaf(&[b"", b"a"]);

        assert_eq!(find_key_index(&node, b""), (true, 0));
        let absent = leaf(&[b"a"]);
        assert_eq!(find_key_index(&absent, b""), (false, 0));
    }
}

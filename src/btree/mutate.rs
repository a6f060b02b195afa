//! Insert and delete, with their proactive rebalancing helpers.
//!
//! Both entry points take the caller's cached root by mutable reference and
//! keep its in-memory mirror in lock-step with the root slot on disk. All
//! other nodes are materialized per call and written back before being
//! discarded.
//!
//! ## Insert
//!
//! `insert` first handles the one case the downward pass cannot: a full
//! root. The root's contents move into a freshly allocated slot, the root
//! keeps that slot as its only child, and an ordinary child split follows.
//! `insert_nonfull` then descends, splitting any full child before entering
//! it, so the node it finally inserts into always has room. Inserting an
//! already-present key, whether it sits in a leaf or an internal node,
//! overwrites the value in place, writes that node back, and reports an
//! update rather than an insertion.
//!
//! ## Delete
//!
//! `remove_key` descends towards the key, but before entering any child
//! with only `min_keys` keys it calls `grow_child`, which restores slack by
//! borrowing a key through the parent from a sibling with spare keys, or
//! failing that by merging the child with a sibling (freeing the emptied
//! slot). Growth changes the parent's shape, so the descent restarts at the
//! same node. A key found in an internal node is replaced by its
//! predecessor, which `remove_max` extracts from the left subtree by the
//! same descend-and-grow discipline. After a top-level remove, an empty
//! internal root absorbs its single child and the tree loses one level.

use std::cmp::Ordering;
use std::mem;

use crate::error::{ensure_valid, Error, Result};
use crate::storage::{Node, NodeFile};

use super::lookup::find_key_index;

/// Inserts or overwrites `key`. Returns `true` when a new key was added,
/// `false` when an existing key's value was overwritten.
pub(crate) fn insert(
    file: &mut NodeFile,
    root: &mut Node,
    key: &[u8],
    value: u64,
) -> Result<bool> {
    if root.keys.len() == file.geometry().max_keys() {
        // Duplicate the full root into a fresh slot; the root keeps that
        // slot as its only child. Splitting it then lifts the median back
        // into the root. This is the only way tree height grows.
        let moved_index = file.pop_free()?;
        let mut moved = Node::empty(moved_index);
        moved.keys = mem::take(&mut root.keys);
        moved.values = mem::take(&mut root.values);
        moved.children = mem::take(&mut root.children);
        root.children.push(moved_index);
        file.write_node(&moved)?;
        file.write_node(root)?;
        split_child(file, root, 0)?;
    }
    insert_nonfull(file, root, key, value)
}

/// Splits the full child at `parent.children[child_index]` into two
/// half-full nodes, lifting the median key into `parent` at `child_index`.
fn split_child(file: &mut NodeFile, parent: &mut Node, child_index: usize) -> Result<()> {
    let geometry = file.geometry();
    let mid = geometry.min_keys();

    let mut child = file.read_node(parent.children[child_index])?;
    ensure_valid!(
        child.keys.len() == geometry.max_keys(),
        "split of node {} with {} keys (expected {})",
        child.index,
        child.keys.len(),
        geometry.max_keys()
    );

    let sibling_index = file.pop_free()?;
    let mut sibling = Node::empty(sibling_index);

    // child keeps the lower half, the new sibling takes the upper half,
    // and the median moves up between them
    sibling.keys = child.keys.split_off(mid + 1);
    sibling.values = child.values.split_off(mid + 1);
    let median_key = child.keys.remove(mid);
    let median_value = child.values.remove(mid);
    if !child.is_leaf() {
        sibling.children = child.children.split_off(geometry.degree() as usize);
    }

    parent.keys.insert(child_index, median_key);
    parent.values.insert(child_index, median_value);
    parent.children.insert(child_index + 1, sibling_index);

    file.write_node(parent)?;
    file.write_node(&child)?;
    file.write_node(&sibling)?;
    Ok(())
}

fn insert_nonfull(file: &mut NodeFile, node: &mut Node, key: &[u8], value: u64) -> Result<bool> {
    let mut i = node.keys.len();
    while i > 0 {
        match key.cmp(node.keys[i - 1].as_slice()) {
            Ordering::Equal => {
                node.values[i - 1] = value;
                file.write_node(node)?;
                return Ok(false);
            }
            Ordering::Greater => break,
            Ordering::Less => i -= 1,
        }
    }

    if node.is_leaf() {
        node.keys.insert(i, key.to_vec());
        node.values.insert(i, value);
        file.write_node(node)?;
        file.increment_key_count()?;
        return Ok(true);
    }

    let mut child = file.read_node(node.children[i])?;
    if child.keys.len() == file.geometry().max_keys() {
        split_child(file, node, i)?;
        match key.cmp(node.keys[i].as_slice()) {
            Ordering::Greater => i += 1,
            Ordering::Equal => {
                // the promoted median is this key; update it in place
                node.values[i] = value;
                file.write_node(node)?;
                return Ok(false);
            }
            Ordering::Less => {}
        }
        child = file.read_node(node.children[i])?;
    }
    insert_nonfull(file, &mut child, key, value)
}

/// Removes `key`, returning its previous value. Collapses an emptied
/// internal root afterwards; that is the only way tree height shrinks.
pub(crate) fn remove(file: &mut NodeFile, root: &mut Node, key: &[u8]) -> Result<Option<u64>> {
    let removed = remove_key(file, root, key)?;

    if root.keys.is_empty() && !root.children.is_empty() {
        ensure_valid!(
            root.children.len() == 1,
            "empty root holds {} children",
            root.children.len()
        );
        let mut child = file.read_node(root.children[0])?;
        root.keys = mem::take(&mut child.keys);
        root.values = mem::take(&mut child.values);
        root.children = mem::take(&mut child.children);
        file.write_node(&child)?;
        file.write_node(root)?;
        file.push_free(child.index)?;
    }

    Ok(removed)
}

fn remove_key(file: &mut NodeFile, node: &mut Node, key: &[u8]) -> Result<Option<u64>> {
    let (found, i) = find_key_index(node, key);

    if node.is_leaf() {
        if !found {
            return Ok(None);
        }
        let (_, value) = take_node_key(file, node, i)?;
        return Ok(Some(value));
    }

    let mut child = file.read_node(node.children[i])?;
    if child.keys.len() <= file.geometry().min_keys() {
        grow_child(file, node, child, i)?;
        // the node's shape changed; rescan it before descending
        return remove_key(file, node, key);
    }

    if found {
        // the separator is the target: capture its value, then overwrite
        // the separator pair with the predecessor stolen from the left
        // subtree
        let removed = node.values[i];
        let (predecessor_key, predecessor_value) = remove_max(file, &mut child)?;
        node.keys[i] = predecessor_key;
        node.values[i] = predecessor_value;
        file.write_node(node)?;
        return Ok(Some(removed));
    }

    remove_key(file, &mut child, key)
}

/// Removes and returns the greatest key/value pair in the subtree rooted
/// at `node`, growing under-sized children on the way down.
fn remove_max(file: &mut NodeFile, node: &mut Node) -> Result<(Vec<u8>, u64)> {
    if node.is_leaf() {
        ensure_valid!(!node.keys.is_empty(), "max-removal from empty node {}", node.index);
        let last = node.keys.len() - 1;
        return take_node_key(file, node, last);
    }

    let i = node.children.len() - 1;
    let mut child = file.read_node(node.children[i])?;
    if child.keys.len() <= file.geometry().min_keys() {
        grow_child(file, node, child, i)?;
        return remove_max(file, node);
    }
    remove_max(file, &mut child)
}

/// Removes the pair at `key_index` from a leaf, writes the leaf, and
/// updates the header's key count.
fn take_node_key(file: &mut NodeFile, node: &mut Node, key_index: usize) -> Result<(Vec<u8>, u64)> {
    let key = node.keys.remove(key_index);
    let value = node.values.remove(key_index);
    file.write_node(node)?;
    file.decrement_key_count()?;
    Ok((key, value))
}

/// Ensures `child` (at `parent.children[child_index]`, holding no more
/// than `min_keys` keys) ends up with more than `min_keys`, using one of
/// three moves: borrow from the left sibling, borrow from the right
/// sibling, or merge with a sibling.
fn grow_child(
    file: &mut NodeFile,
    parent: &mut Node,
    mut child: Node,
    child_index: usize,
) -> Result<()> {
    let min_keys = file.geometry().min_keys();

    let mut left_sibling = if child_index > 0 {
        Some(file.read_node(parent.children[child_index - 1])?)
    } else {
        None
    };
    if let Some(left) = left_sibling.as_mut() {
        if left.keys.len() > min_keys {
            // rotate right: left's last pair moves up to the parent, the
            // displaced separator moves down as child's first pair
            let last = left.keys.len() - 1;
            let separator_key =
                mem::replace(&mut parent.keys[child_index - 1], left.keys.remove(last));
            let separator_value =
                mem::replace(&mut parent.values[child_index - 1], left.values.remove(last));
            child.keys.insert(0, separator_key);
            child.values.insert(0, separator_value);
            if !left.is_leaf() {
                let moved = left.children.remove(left.children.len() - 1);
                child.children.insert(0, moved);
            }
            file.write_node(left)?;
            file.write_node(&child)?;
            file.write_node(parent)?;
            return Ok(());
        }
    }

    let mut right_sibling = if child_index + 1 < parent.children.len() {
        Some(file.read_node(parent.children[child_index + 1])?)
    } else {
        None
    };
    if let Some(right) = right_sibling.as_mut() {
        if right.keys.len() > min_keys {
            // rotate left: mirror of the borrow above
            let separator_key = mem::replace(&mut parent.keys[child_index], right.keys.remove(0));
            let separator_value =
                mem::replace(&mut parent.values[child_index], right.values.remove(0));
            child.keys.push(separator_key);
            child.values.push(separator_value);
            if !right.is_leaf() {
                child.children.push(right.children.remove(0));
            }
            file.write_node(right)?;
            file.write_node(&child)?;
            file.write_node(parent)?;
            return Ok(());
        }
    }

    // No sibling has spare keys: merge through the separator, always from
    // the right node into the left one. The right-most child merges with
    // its left sibling instead.
    let (separator_index, mut left, mut right) = match right_sibling {
        Some(right) => (child_index, child, right),
        None => {
            let left = left_sibling.take().ok_or_else(|| {
                Error::corrupt(format!("node {} has no sibling to merge with", child.index))
            })?;
            (child_index - 1, left, child)
        }
    };

    left.keys.push(parent.keys.remove(separator_index));
    left.values.push(parent.values.remove(separator_index));
    parent.children.remove(separator_index + 1);

    left.keys.append(&mut right.keys);
    left.values.append(&mut right.values);
    left.children.append(&mut right.children);

    file.write_node(&right)?;
    file.write_node(&left)?;
    file.write_node(parent)?;
    file.push_free(right.index)?;
    Ok(())
}

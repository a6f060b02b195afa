//! # B-Tree Algorithms
//!
//! The tree layer: search, insert with proactive split, and delete with
//! proactive merge/borrow, expressed over [`Node`](crate::storage::Node)
//! values fetched from the storage layer. Every node touch is a disk read
//! or write; the only cached node is the root, which the caller owns and
//! passes in.
//!
//! ## Proactive Rebalancing
//!
//! Both mutation paths fix structure on the way down rather than after the
//! fact:
//!
//! - Insert splits any full child before descending into it, so no node
//!   visited below can overflow. Splitting a full root is the only way the
//!   tree grows in height.
//! - Delete ensures every node it enters (other than the root) holds more
//!   than the minimum number of keys, so no deletion below can underflow.
//!   Collapsing an empty internal root into its single child is the only
//!   way the tree shrinks in height.
//!
//! This gives each operation a single pass with a recursion depth bounded
//! by the tree height and never requires revisiting a parent.
//!
//! ## Module Organization
//!
//! - `lookup`: read-only descents, point search and neighbor lookups
//! - `mutate`: insert and delete with their rebalancing helpers

pub(crate) mod lookup;
pub(crate) mod mutate;

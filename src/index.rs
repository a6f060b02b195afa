//! # Public Façade
//!
//! [`BTreeIndex`] opens or creates the backing file, holds the cached
//! header and root-node mirrors, and exposes the public operations. The
//! mirrors are updated in lock-step with their on-disk copies: every
//! mutation that touches the root or a header counter writes the slot or
//! header before returning.
//!
//! An instance exclusively owns its file handle for its entire lifetime.
//! Operations are strictly single-threaded and run to completion; a
//! failure mid-mutation surfaces the storage error and leaves the file in
//! whatever intermediate state it had reached.

use std::path::Path;

use crate::btree::{lookup, mutate};
use crate::error::{Error, Result};
use crate::storage::{Node, NodeFile};

/// An on-disk B-tree mapping byte-string keys to `u64` values, persisted
/// in a single regular file.
///
/// ```no_run
/// use treeline::BTreeIndex;
///
/// # fn main() -> treeline::Result<()> {
/// let mut index = BTreeIndex::open("example.btree", 32, 24)?;
/// index.put(b"alpha", 1)?;
/// assert_eq!(index.get(b"alpha")?, Some(1));
/// assert_eq!(index.remove(b"alpha")?, Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BTreeIndex {
    file: NodeFile,
    root: Node,
}

impl BTreeIndex {
    /// Opens the tree file at `path`, creating it if absent.
    ///
    /// `degree` must be at least 2 and `key_size` a multiple of 8 in
    /// `[8, 128]`; both are fixed at creation. Reopening an existing file
    /// ignores the passed parameters; the header's recorded values win.
    pub fn open<P: AsRef<Path>>(path: P, degree: u32, key_size: u32) -> Result<Self> {
        let file = NodeFile::open(path, degree, key_size)?;
        let root = file.read_node(0)?;
        Ok(Self { file, root })
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<u64>> {
        self.check_key(key)?;
        lookup::search(&self.file, &self.root, key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Inserts `key` with `value`, overwriting any previous value.
    /// Returns `true` when a new key was inserted, `false` when an
    /// existing key's value was overwritten.
    pub fn put(&mut self, key: &[u8], value: u64) -> Result<bool> {
        self.check_key(key)?;
        if self.file.key_count() == u32::MAX && self.get(key)?.is_none() {
            return Err(Error::CapacityExceeded);
        }
        mutate::insert(&mut self.file, &mut self.root, key, value)
    }

    /// Removes `key`, returning its previous value if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<u64>> {
        self.check_key(key)?;
        mutate::remove(&mut self.file, &mut self.root, key)
    }

    /// Number of live keys in the tree.
    pub fn size(&self) -> u64 {
        self.file.key_count() as u64
    }

    /// Smallest stored key, or `None` for an empty tree.
    pub fn first(&self) -> Result<Option<Vec<u8>>> {
        lookup::first_key(&self.file, &self.root)
    }

    /// Largest stored key, or `None` for an empty tree.
    pub fn last(&self) -> Result<Option<Vec<u8>>> {
        lookup::last_key(&self.file, &self.root)
    }

    /// Greatest stored key strictly less than `key`. The probe key may be
    /// arbitrarily long; it never has to fit in a key slot.
    pub fn lower(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        lookup::lower(&self.file, &self.root, key, false)
    }

    /// Greatest stored key less than or equal to `key`.
    pub fn lower_or_equal(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        lookup::lower(&self.file, &self.root, key, true)
    }

    /// Least stored key strictly greater than `key`.
    pub fn higher(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        lookup::higher(&self.file, &self.root, key, false)
    }

    /// Least stored key greater than or equal to `key`.
    pub fn higher_or_equal(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        lookup::higher(&self.file, &self.root, key, true)
    }

    /// Keys held by node `node_index`, in order. Inspection accessor.
    pub fn keys_of(&self, node_index: u32) -> Result<Vec<Vec<u8>>> {
        if node_index == 0 {
            return Ok(self.root.keys.clone());
        }
        Ok(self.file.read_node(node_index)?.keys)
    }

    /// Child slot indices held by node `node_index`. Inspection accessor.
    pub fn children_of(&self, node_index: u32) -> Result<Vec<u32>> {
        if node_index == 0 {
            return Ok(self.root.children.clone());
        }
        Ok(self.file.read_node(node_index)?.children)
    }

    /// The free-node stack, top entry first. Inspection accessor.
    pub fn free_nodes(&self) -> Result<Vec<u32>> {
        self.file.free_nodes()
    }

    /// The degree parameter recorded in the file header.
    pub fn degree(&self) -> u32 {
        self.file.geometry().degree()
    }

    /// The key slot width recorded in the file header.
    pub fn key_size(&self) -> u32 {
        self.file.geometry().key_size()
    }

    /// Maximum keys per node (`2 * degree - 1`).
    pub fn max_keys_per_node(&self) -> usize {
        self.file.geometry().max_keys()
    }

    /// Minimum keys per non-root node (`degree - 1`).
    pub fn min_keys_per_node(&self) -> usize {
        self.file.geometry().min_keys()
    }

    /// Maximum children per node (`2 * degree`).
    pub fn max_children_per_node(&self) -> usize {
        self.file.geometry().max_children()
    }

    /// Total node slots in the file, in use or free.
    pub fn node_count(&self) -> u32 {
        self.file.node_count()
    }

    /// Depth of the free-node stack.
    pub fn free_count(&self) -> u32 {
        self.file.free_count()
    }

    /// Flushes file contents to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync()
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        let max = self.file.geometry().max_key_len();
        if key.len() > max {
            return Err(Error::InvalidKey {
                len: key.len(),
                max,
            });
        }
        Ok(())
    }
}

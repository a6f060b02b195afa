//! # Node Value and Section Codecs
//!
//! The in-memory form of one node slot, and the codecs for each of its
//! on-disk sections. A slot serializes as:
//!
//! ```text
//! Offset                Size              Field
//! ------                ----              -----
//! 0                     4                 key_count
//! 4                     4                 child_count (0 for a leaf)
//! 8                     4                 free_slot (allocator-owned)
//! 12                    4                 padding, zero
//! 16                    4 * max_children  child node indices
//! ...                   key_size * max_keys   length-prefixed keys
//! ...                   8 * max_keys      values
//! ```
//!
//! Only the live prefix of each array is ever read or written; bytes past
//! `child_count`/`key_count` entries keep whatever they held before. A key
//! slot is one length byte followed by the payload, zero-padded to
//! `key_size`; the payload is therefore at most `key_size - 1` bytes.
//!
//! The `free_slot` field is not part of the node value at all: it is a
//! free-stack cell owned by the allocator in `NodeFile`, preserved across
//! node writes by never writing those bytes here.

use zerocopy::big_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use super::geometry::{Geometry, NODE_HEADER_SIZE};
use crate::error::{ensure_valid, Error, Result};

/// The fixed quartet at the start of every node slot. Read in full;
/// written only through [`encode_counts`], which covers the first two
/// fields and leaves the allocator-owned `free_slot` untouched.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct NodeHeader {
    pub key_count: U32,
    pub child_count: U32,
    pub free_slot: U32,
    pub padding: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE as usize);

impl NodeHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NODE_HEADER_SIZE as usize {
            return Err(Error::corrupt(format!(
                "buffer too small for node header: {} < {}",
                bytes.len(),
                NODE_HEADER_SIZE
            )));
        }
        Self::read_from_bytes(&bytes[..NODE_HEADER_SIZE as usize])
            .map_err(|e| Error::corrupt(format!("failed to parse node header: {e:?}")))
    }
}

/// One B-tree node, materialized from its slot for the duration of an
/// operation and written back when mutated.
///
/// Children are referred to by slot index, never by pointer; `is_leaf` is
/// encoded by having no children at all. Keys are owned byte strings in
/// strictly increasing lexicographic order, and `values` runs parallel to
/// `keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub index: u32,
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<u64>,
    pub children: Vec<u32>,
}

impl Node {
    pub fn empty(index: u32) -> Self {
        Self {
            index,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Encodes the live `key_count`/`child_count` pair. The remaining eight
/// bytes of the quartet are allocator-owned and zero padding; neither is
/// rewritten on a node write.
pub(crate) fn encode_counts(key_count: usize, child_count: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0..4].copy_from_slice(&(key_count as u32).to_be_bytes());
    out[4..8].copy_from_slice(&(child_count as u32).to_be_bytes());
    out
}

pub(crate) fn encode_children(children: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(children.len() * 4);
    for &child in children {
        out.extend_from_slice(&child.to_be_bytes());
    }
    out
}

pub(crate) fn decode_children(buf: &[u8], count: usize) -> Vec<u32> {
    debug_assert_eq!(buf.len(), count * 4);
    (0..count)
        .map(|i| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&buf[i * 4..i * 4 + 4]);
            u32::from_be_bytes(raw)
        })
        .collect()
}

/// Encodes `keys` as consecutive length-prefixed, zero-padded slots.
/// Callers validate payload length before a key ever reaches a node.
pub(crate) fn encode_keys(keys: &[Vec<u8>], geometry: &Geometry) -> Vec<u8> {
    let key_size = geometry.key_size() as usize;
    let mut out = vec![0u8; keys.len() * key_size];
    for (i, key) in keys.iter().enumerate() {
        debug_assert!(key.len() <= geometry.max_key_len());
        let slot = &mut out[i * key_size..(i + 1) * key_size];
        slot[0] = key.len() as u8;
        slot[1..1 + key.len()].copy_from_slice(key);
    }
    out
}

/// Decodes `count` key slots, rejecting any length prefix that exceeds
/// the payload capacity.
pub(crate) fn decode_keys(
    buf: &[u8],
    count: usize,
    geometry: &Geometry,
    node_index: u32,
) -> Result<Vec<Vec<u8>>> {
    debug_assert_eq!(buf.len(), count * geometry.key_size() as usize);
    let key_size = geometry.key_size() as usize;
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let slot = &buf[i * key_size..(i + 1) * key_size];
        let len = slot[0] as usize;
        ensure_valid!(
            len <= geometry.max_key_len(),
            "node {node_index} key {i} has length prefix {len} > {}",
            geometry.max_key_len()
        );
        keys.push(slot[1..1 + len].to_vec());
    }
    Ok(keys)
}

pub(crate) fn encode_values(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for &value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}

pub(crate) fn decode_values(buf: &[u8], count: usize) -> Vec<u64> {
    debug_assert_eq!(buf.len(), count * 8);
    (0..count)
        .map(|i| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[i * 8..i * 8 + 8]);
            u64::from_be_bytes(raw)
        })
        .collect()
}

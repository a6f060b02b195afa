//! # Node File
//!
//! `NodeFile` drives the backing file: it opens or creates it, keeps the
//! header mirror and slot count, and translates every logical operation
//! (read header, read/write node `i`, grow, push/pop a free slot) into
//! positioned reads and writes.
//!
//! ## Open Semantics
//!
//! `open` first attempts read-write on an existing file. If the file is
//! absent (or exists with zero length) it is initialized with a fresh
//! header and a zeroed root slot. When an existing header is found, its
//! recorded parameters always win over the ones passed in, and the file
//! length must be exactly `16 + k * node_size` for some `k >= 1`.
//!
//! ## Write Coverage
//!
//! `write_node` writes only the live prefix of each array section, so
//! bytes past the live counts keep their previous contents; they are never
//! read back. The eight bytes holding `free_slot` and the padding are not
//! rewritten at all: the padding is zeroed when the slot is created and the
//! `free_slot` cell belongs to the allocator.
//!
//! ## Allocator
//!
//! `pop_free` on an empty stack grows the file by one zeroed slot and
//! pushes its index before popping, so allocation always succeeds. Pushes
//! and pops rewrite the header, keeping the on-disk `free_count` in
//! lock-step with the mirror.
//!
//! ## Borrow Discipline
//!
//! Reads take `&self` (seeking through `&File`), mutations take
//! `&mut self`. The compiler thereby enforces the single-mutator model.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use zerocopy::IntoBytes;

use super::geometry::{Geometry, HEADER_SIZE, NODE_HEADER_SIZE};
use super::header::FileHeader;
use super::node::{self, Node, NodeHeader};
use crate::error::{ensure_valid, Error, Result};

#[derive(Debug)]
pub struct NodeFile {
    file: File,
    geometry: Geometry,
    header: FileHeader,
    node_count: u32,
}

impl NodeFile {
    /// Opens the tree file at `path`, creating and initializing it if it
    /// does not exist. For an existing file the header's recorded
    /// parameters take precedence over `degree` and `key_size`.
    pub fn open<P: AsRef<Path>>(path: P, degree: u32, key_size: u32) -> Result<Self> {
        let geometry = Geometry::new(degree, key_size)?;

        match OpenOptions::new().read(true).write(true).open(path.as_ref()) {
            Ok(file) => Self::from_existing(file, geometry),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(path.as_ref())
                    .map_err(|e| Error::io_at(0, e))?;
                Self::initialize(file, geometry)
            }
            Err(e) => Err(Error::io_at(0, e)),
        }
    }

    fn from_existing(file: File, geometry: Geometry) -> Result<Self> {
        let len = file.metadata().map_err(|e| Error::io_at(0, e))?.len();
        if len == 0 {
            return Self::initialize(file, geometry);
        }

        ensure_valid!(
            len >= HEADER_SIZE,
            "file length {len} is shorter than the header"
        );

        let mut this = Self {
            file,
            geometry,
            header: FileHeader::new(geometry),
            node_count: 0,
        };

        let mut buf = [0u8; HEADER_SIZE as usize];
        this.read_exact_at(0, &mut buf)?;
        this.header = FileHeader::from_bytes(&buf)?;
        this.geometry = this.header.geometry()?;

        let node_size = this.geometry.node_size();
        let body = len - HEADER_SIZE;
        ensure_valid!(
            body >= node_size && body % node_size == 0,
            "file length {len} is not header plus a whole number of {node_size}-byte slots"
        );
        this.node_count = (body / node_size) as u32;

        ensure_valid!(
            this.header.free_count() < this.node_count,
            "free count {} does not fit {} slots",
            this.header.free_count(),
            this.node_count
        );

        Ok(this)
    }

    fn initialize(file: File, geometry: Geometry) -> Result<Self> {
        let mut this = Self {
            file,
            geometry,
            header: FileHeader::new(geometry),
            node_count: 1,
        };
        this.write_header()?;
        let root_pos = geometry.node_pos(0);
        let zeroes = vec![0u8; geometry.node_size() as usize];
        this.write_all_at(root_pos, &zeroes)?;
        Ok(this)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn key_count(&self) -> u32 {
        self.header.key_count()
    }

    pub fn free_count(&self) -> u32 {
        self.header.free_count()
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Materializes node `index` from its slot, validating structure as it
    /// reads. Only the live prefix of each section is touched.
    pub fn read_node(&self, index: u32) -> Result<Node> {
        ensure_valid!(
            index < self.node_count,
            "node index {index} out of range (node_count={})",
            self.node_count
        );
        let geo = &self.geometry;

        let mut quartet = [0u8; NODE_HEADER_SIZE as usize];
        self.read_exact_at(geo.node_pos(index), &mut quartet)?;
        let header = NodeHeader::from_bytes(&quartet)?;
        let key_count = header.key_count.get() as usize;
        let child_count = header.child_count.get() as usize;

        ensure_valid!(
            key_count <= geo.max_keys(),
            "node {index} has key count {key_count} > {}",
            geo.max_keys()
        );
        ensure_valid!(
            child_count == 0 || child_count == key_count + 1,
            "node {index} has child count {child_count} for {key_count} keys"
        );

        let mut children = Vec::new();
        if child_count > 0 {
            let mut buf = vec![0u8; child_count * 4];
            self.read_exact_at(geo.children_pos(index), &mut buf)?;
            children = node::decode_children(&buf, child_count);
            for &child in &children {
                ensure_valid!(
                    child < self.node_count,
                    "node {index} references child {child} out of range (node_count={})",
                    self.node_count
                );
            }
        }

        let mut keys = Vec::new();
        let mut values = Vec::new();
        if key_count > 0 {
            let mut buf = vec![0u8; key_count * geo.key_size() as usize];
            self.read_exact_at(geo.keys_pos(index), &mut buf)?;
            keys = node::decode_keys(&buf, key_count, geo, index)?;

            let mut buf = vec![0u8; key_count * 8];
            self.read_exact_at(geo.values_pos(index), &mut buf)?;
            values = node::decode_values(&buf, key_count);
        }

        Ok(Node {
            index,
            keys,
            values,
            children,
        })
    }

    /// Writes the live prefix of every section of `node` back to its slot.
    pub fn write_node(&mut self, node: &Node) -> Result<()> {
        debug_assert!(node.index < self.node_count);
        debug_assert!(node.keys.len() == node.values.len());
        debug_assert!(node.children.is_empty() || node.children.len() == node.keys.len() + 1);
        debug_assert!(node.keys.len() <= self.geometry.max_keys());
        let geo = self.geometry;

        let counts = node::encode_counts(node.keys.len(), node.children.len());
        self.write_all_at(geo.node_pos(node.index), &counts)?;

        if !node.children.is_empty() {
            let buf = node::encode_children(&node.children);
            self.write_all_at(geo.children_pos(node.index), &buf)?;
        }
        if !node.keys.is_empty() {
            let buf = node::encode_keys(&node.keys, &geo);
            self.write_all_at(geo.keys_pos(node.index), &buf)?;
            let buf = node::encode_values(&node.values);
            self.write_all_at(geo.values_pos(node.index), &buf)?;
        }
        Ok(())
    }

    /// Appends one zeroed slot to the end of the file and returns its
    /// index. The new slot is not yet on the free stack.
    fn grow(&mut self) -> Result<u32> {
        let index = self.node_count;
        let zeroes = vec![0u8; self.geometry.node_size() as usize];
        self.write_all_at(self.geometry.node_pos(index), &zeroes)?;
        self.node_count += 1;
        Ok(index)
    }

    /// Pushes `index` onto the free-node stack and rewrites the header.
    pub fn push_free(&mut self, index: u32) -> Result<()> {
        let depth = self.header.free_count() + 1;
        debug_assert!(depth < self.node_count, "free stack deeper than file");
        self.write_all_at(self.geometry.free_slot_pos(depth), &index.to_be_bytes())?;
        self.header.set_free_count(depth);
        self.write_header()
    }

    /// Pops a free slot index, growing the file first when the stack is
    /// empty. The returned slot always reads back as an empty node.
    pub fn pop_free(&mut self) -> Result<u32> {
        if self.header.free_count() == 0 {
            let index = self.grow()?;
            self.push_free(index)?;
        }
        let depth = self.header.free_count();
        let index = self.read_u32_at(self.geometry.free_slot_pos(depth))?;
        ensure_valid!(
            index != 0 && index < self.node_count,
            "free stack entry {depth} holds invalid slot index {index} (node_count={})",
            self.node_count
        );
        self.header.set_free_count(depth - 1);
        self.write_header()?;
        Ok(index)
    }

    /// The free-node stack, top entry first.
    pub fn free_nodes(&self) -> Result<Vec<u32>> {
        let mut stack = Vec::with_capacity(self.header.free_count() as usize);
        for depth in (1..=self.header.free_count()).rev() {
            stack.push(self.read_u32_at(self.geometry.free_slot_pos(depth))?);
        }
        Ok(stack)
    }

    pub(crate) fn increment_key_count(&mut self) -> Result<()> {
        let count = self
            .header
            .key_count()
            .checked_add(1)
            .ok_or(Error::CapacityExceeded)?;
        self.header.set_key_count(count);
        self.write_header()
    }

    pub(crate) fn decrement_key_count(&mut self) -> Result<()> {
        let count = self
            .header
            .key_count()
            .checked_sub(1)
            .ok_or_else(|| Error::corrupt("key count underflow"))?;
        self.header.set_key_count(count);
        self.write_header()
    }

    /// Flushes file contents and metadata to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_data().map_err(|e| Error::io_at(0, e))
    }

    fn write_header(&mut self) -> Result<()> {
        let bytes: [u8; HEADER_SIZE as usize] = {
            let mut buf = [0u8; HEADER_SIZE as usize];
            buf.copy_from_slice(self.header.as_bytes());
            buf
        };
        self.write_all_at(0, &bytes)
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io_at(offset, e))?;
        file.read_exact(buf).map_err(|e| Error::io_at(offset, e))
    }

    fn read_u32_at(&self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_at(offset, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io_at(offset, e))?;
        self.file
            .write_all(buf)
            .map_err(|e| Error::io_at(offset, e))
    }
}

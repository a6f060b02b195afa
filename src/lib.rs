//! # treeline - Embedded On-Disk B-Tree Index
//!
//! treeline persists an ordered index of variable-length byte-string keys
//! to 64-bit unsigned values in a single regular file. It supports point
//! lookup, insertion with update semantics on duplicate keys, deletion,
//! and neighbor lookups, for use as an embedded index by one process with
//! exclusive access to the backing file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use treeline::BTreeIndex;
//!
//! # fn main() -> treeline::Result<()> {
//! let mut index = BTreeIndex::open("users.btree", 128, 32)?;
//!
//! let inserted = index.put(b"alice", 7)?;
//! assert!(inserted);
//! assert_eq!(index.get(b"alice")?, Some(7));
//! assert_eq!(index.size(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Three layers, each communicating by value with the one below:
//!
//! ```text
//! +-------------------------------------+
//! |      Facade (BTreeIndex)            |  open/create, header + root
//! |                                     |  mirrors, public operations
//! +-------------------------------------+
//! |      Tree layer (btree)             |  search, insert with proactive
//! |                                     |  split, delete with proactive
//! |                                     |  merge/borrow
//! +-------------------------------------+
//! |      Storage layer (storage)        |  positioned reads/writes,
//! |                                     |  big-endian codecs, free-node
//! |                                     |  allocator
//! +-------------------------------------+
//! ```
//!
//! Nodes refer to children by 32-bit slot indices into the file - an
//! arena-by-index discipline with no in-memory node graph. The only cached
//! node is the root; every other node is materialized per operation from
//! disk, written back when mutated, and discarded.
//!
//! ## File Format
//!
//! A 16-byte header (`key_size`, `degree`, `key_count`, `free_count`, all
//! big-endian `u32`) followed by fixed-width node slots; slot 0 is the
//! root. Free slots are tracked by an on-disk LIFO stored inside the slots
//! themselves. See the `storage` module docs for the byte-level layout.
//!
//! ## Concurrency and Durability
//!
//! Strictly single-threaded: no operation is re-entrant, all blocking is
//! synchronous file I/O, and callers serialize operations. The file is
//! consistent between operations of a cleanly closed process; there is no
//! journaling, so a crash mid-operation may leave the tree structurally
//! inconsistent. [`BTreeIndex::sync`] flushes to stable storage on demand.

pub mod error;
pub mod storage;

mod btree;
mod index;

pub use error::{Error, Result};
pub use index::BTreeIndex;

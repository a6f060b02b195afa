//! # File Header
//!
//! The first 16 bytes of every tree file. The header records the two
//! creation-time parameters and the two mutable counters; it is rewritten
//! whenever either counter changes.
//!
//! ## Layout
//!
//! ```text
//! Offset  Size  Field       Description
//! ------  ----  ----------  ----------------------------------------
//! 0       4     key_size    serialized key slot width; read-only
//! 4       4     degree      B-tree degree parameter; read-only
//! 8       4     key_count   total live keys in the tree
//! 12      4     free_count  depth of the free-node stack
//! ```
//!
//! All fields are big-endian `u32`. There is no magic number or version
//! field; when a file is reopened, the header's recorded parameters always
//! win over the ones passed to `open`.

use zerocopy::big_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::geometry::{Geometry, HEADER_SIZE};
use crate::error::{Error, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    key_size: U32,
    degree: U32,
    key_count: U32,
    free_count: U32,
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == HEADER_SIZE as usize);

impl FileHeader {
    /// A fresh header for an empty tree with the given geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            key_size: U32::new(geometry.key_size()),
            degree: U32::new(geometry.degree()),
            key_count: U32::new(0),
            free_count: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(Error::corrupt(format!(
                "buffer too small for file header: {} < {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        Self::read_from_bytes(&bytes[..HEADER_SIZE as usize])
            .map_err(|e| Error::corrupt(format!("failed to parse file header: {e:?}")))
    }

    /// Reconstructs the geometry recorded at creation time. Parameters that
    /// would be rejected at creation mean the header bytes are not a tree
    /// header, so the failure is reported as corruption.
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::new(self.degree(), self.key_size()).map_err(|_| {
            Error::corrupt(format!(
                "header records invalid parameters: degree={}, key_size={}",
                self.degree(),
                self.key_size()
            ))
        })
    }

    pub fn key_size(&self) -> u32 {
        self.key_size.get()
    }

    pub fn degree(&self) -> u32 {
        self.degree.get()
    }

    pub fn key_count(&self) -> u32 {
        self.key_count.get()
    }

    pub fn set_key_count(&mut self, count: u32) {
        self.key_count = U32::new(count);
    }

    pub fn free_count(&self) -> u32 {
        self.free_count.get()
    }

    pub fn set_free_count(&mut self, count: u32) {
        self.free_count = U32::new(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_16() {
        assert_eq!(std::mem::size_of::<FileHeader>(), 16);
    }

    #[test]
    fn header_roundtrip() {
        let geo = Geometry::new(4, 16).unwrap();
        let mut header = FileHeader::new(geo);
        header.set_key_count(1000);
        header.set_free_count(7);

        let parsed = FileHeader::from_bytes(header.as_bytes()).unwrap();

        assert_eq!(parsed.key_size(), 16);
        assert_eq!(parsed.degree(), 4);
        assert_eq!(parsed.key_count(), 1000);
        assert_eq!(parsed.free_count(), 7);
    }

    #[test]
    fn fields_are_big_endian_on_disk() {
        let geo = Geometry::new(2, 8).unwrap();
        let mut header = FileHeader::new(geo);
        header.set_key_count(0x0102_0304);

        let bytes = header.as_bytes();

        assert_eq!(&bytes[0..4], &[0, 0, 0, 8]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
        assert_eq!(&bytes[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn from_bytes_rejects_short_buffer() {
        let result = FileHeader::from_bytes(&[0u8; 8]);
        assert!(matches!(result, Err(Error::Corrupt { .. })));
    }

    #[test]
    fn geometry_rejects_invalid_recorded_parameters() {
        // degree 0 cannot come from a real creation
        let bytes = [0u8, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let header = FileHeader::from_bytes(&bytes).unwrap();

        assert!(matches!(header.geometry(), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn geometry_roundtrip() {
        let geo = Geometry::new(3, 24).unwrap();
        let header = FileHeader::new(geo);

        assert_eq!(header.geometry().unwrap(), geo);
    }
}

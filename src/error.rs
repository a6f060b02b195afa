//! Error types for treeline.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by tree operations.
///
/// Every public operation returns the error of the layer that provoked it;
/// the tree layer never swallows storage failures. A failure mid-mutation
/// leaves the file in whatever intermediate state it had reached.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad `degree` or `key_size` at open.
    #[error("invalid parameter: {reason}")]
    InvalidParam { reason: String },

    /// Key payload longer than the slot can hold (`key_size - 1` bytes).
    #[error("key length {len} exceeds maximum {max}")]
    InvalidKey { len: usize, max: usize },

    /// Short read/write, seek failure, or open failure. The underlying
    /// `io::ErrorKind` is carried by `source`.
    #[error("i/o failure at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Structural violation detected while reading the file.
    #[error("corrupt tree file: {reason}")]
    Corrupt { reason: String },

    /// An insertion would overflow the 32-bit key count in the header.
    #[error("tree is full: key count would exceed u32::MAX")]
    CapacityExceeded,
}

impl Error {
    pub(crate) fn invalid_param(reason: impl Into<String>) -> Self {
        Error::InvalidParam {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::Corrupt {
            reason: reason.into(),
        }
    }

    pub(crate) fn io_at(offset: u64, source: io::Error) -> Self {
        Error::Io { offset, source }
    }
}

/// Returns `Error::Corrupt` with a formatted reason unless the condition
/// holds. Used for structural assumptions about on-disk state.
macro_rules! ensure_valid {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::corrupt(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_valid;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn invalid_param_display() {
        let err = Error::invalid_param("degree must be at least 2, got 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter: degree must be at least 2, got 1"
        );
    }

    #[test]
    fn invalid_key_display() {
        let err = Error::InvalidKey { len: 12, max: 7 };
        assert_eq!(err.to_string(), "key length 12 exceeds maximum 7");
    }

    #[test]
    fn io_error_carries_offset_and_kind() {
        let err = Error::io_at(96, io::Error::new(ErrorKind::UnexpectedEof, "short read"));
        assert!(err.to_string().contains("offset 96"));

        match err {
            Error::Io { offset, source } => {
                assert_eq!(offset, 96);
                assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn corrupt_display() {
        let err = Error::corrupt("node index 9 out of range (node_count=3)");
        assert_eq!(
            err.to_string(),
            "corrupt tree file: node index 9 out of range (node_count=3)"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}

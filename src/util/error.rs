//! Error types for the RMF store.
//!
//! Every error belongs to one of three kinds (see [`ErrorKind`]):
//! usage faults, I/O faults and internal-consistency faults.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller violated a precondition.
    Usage,
    /// The backend could not open, read, write or decode the container.
    Io,
    /// A condition that should never happen was observed.
    Internal,
}

/// Main error type for store operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Node id outside of the node table
    #[error("Invalid node {node} (number of nodes: {count})")]
    InvalidNode { node: u32, count: usize },

    /// Key name already registered in this (category, type, per-frame) partition
    #[error("Attribute name {name:?} already taken for type {type_name} in category {category:?}")]
    DuplicateKey {
        name: String,
        category: String,
        type_name: &'static str,
    },

    /// Attempt to store a null sentinel
    #[error("Cannot write the null value of type {0} to a file")]
    NullValue(&'static str),

    /// Per-frame write without a current frame
    #[error("No current frame: per-frame values require set_current_frame first")]
    NoCurrentFrame,

    /// Write addressed to a frame other than the loaded one
    #[error("Frame {requested} is not the loaded frame ({loaded:?})")]
    WrongFrame { requested: usize, loaded: Option<usize> },

    /// File is opened read-only
    #[error("File is read-only")]
    ReadOnly,

    /// Key or node name rejected by the name audit
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Other precondition violation
    #[error("Usage error: {0}")]
    Usage(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Unknown magic bytes at start of file
    #[error("Not an RMF container: unrecognized magic bytes")]
    InvalidMagic,

    /// Container version tag does not match
    #[error("Unsupported rmf version string found: {found:?} expected {expected:?}")]
    UnsupportedVersion { expected: String, found: String },

    /// Record container written under another schema
    #[error("Schema mismatch: expected {expected}, got {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Truncated or malformed container
    #[error("Corrupt container: {0}")]
    Corrupt(String),

    /// Record encode/decode failure
    #[error("Record encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Internal consistency fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a usage error from a string.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create an internal-consistency error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a corrupt container error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNode { .. }
            | Self::DuplicateKey { .. }
            | Self::NullValue(_)
            | Self::NoCurrentFrame
            | Self::WrongFrame { .. }
            | Self::ReadOnly
            | Self::InvalidName { .. }
            | Self::Usage(_) => ErrorKind::Usage,
            Self::FileNotFound(_)
            | Self::InvalidMagic
            | Self::UnsupportedVersion { .. }
            | Self::SchemaMismatch { .. }
            | Self::Corrupt(_)
            | Self::Encoding(_)
            | Self::Io(_)
            | Self::Utf8(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for usage faults.
    #[inline]
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    /// True for I/O faults.
    #[inline]
    pub fn is_io(&self) -> bool {
        self.kind() == ErrorKind::Io
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidNode { node: 7, count: 3 };
        assert!(e.to_string().contains('7'));
        assert!(e.to_string().contains('3'));

        let e = Error::UnsupportedVersion {
            expected: "rmf 1".into(),
            found: "rmf 0".into(),
        };
        assert!(e.to_string().contains("rmf 0"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NoCurrentFrame.kind(), ErrorKind::Usage);
        assert_eq!(Error::InvalidMagic.kind(), ErrorKind::Io);
        assert_eq!(Error::internal("boom").kind(), ErrorKind::Internal);
        assert!(Error::ReadOnly.is_usage());
        assert!(Error::corrupt("short").is_io());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}

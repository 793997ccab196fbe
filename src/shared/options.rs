//! How a file is opened.

use std::path::Path;

use crate::backend::{share, BackendKind, DenseBackend, RecordBackend, SharedBackend};
use crate::util::{Error, Result};

/// Default zlib level of dense tables.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// Options for [`SharedData::open_with`](super::SharedData::open_with) and
/// [`SharedData::create_with`](super::SharedData::create_with).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenOptions {
    backend: Option<BackendKind>,
    read_only: bool,
    create: bool,
    compression: u32,
    use_mmap: bool,
    frames_hint: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            backend: None,
            read_only: false,
            create: false,
            compression: DEFAULT_COMPRESSION,
            use_mmap: cfg!(feature = "mmap"),
            frames_hint: 0,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a backend instead of choosing by extension or magic bytes.
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.backend = Some(kind);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Create (or truncate) the file instead of opening it.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// zlib level (0-9) of dense tables. Higher values are clamped.
    pub fn compression(mut self, level: u32) -> Self {
        self.compression = level.min(9);
        self
    }

    /// Memory-map dense containers for reading. Ignored without the `mmap`
    /// feature.
    pub fn use_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap && cfg!(feature = "mmap");
        self
    }

    /// Expected number of frames; per-frame tables are sized for it up front.
    pub fn frames_hint(mut self, frames: usize) -> Self {
        self.frames_hint = frames;
        self
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn is_create(&self) -> bool {
        self.create
    }

    #[inline]
    pub fn get_frames_hint(&self) -> usize {
        self.frames_hint
    }

    /// Open or create the backend for `path`.
    pub(crate) fn open_backend(&self, path: &Path) -> Result<SharedBackend> {
        if self.create && self.read_only {
            return Err(Error::usage("cannot create a read-only file"));
        }
        let kind = match self.backend {
            Some(kind) => kind,
            None if self.create => BackendKind::for_path(path),
            None => BackendKind::detect_file(path)?,
        };
        tracing::debug!(
            path = %path.display(),
            ?kind,
            create = self.create,
            read_only = self.read_only,
            "opening backend"
        );

        Ok(match (kind, self.create) {
            (BackendKind::Dense, true) => {
                share(Box::new(DenseBackend::create(path, self.compression)?))
            }
            (BackendKind::Dense, false) => share(Box::new(DenseBackend::open(
                path,
                self.read_only,
                self.use_mmap,
                self.compression,
            )?)),
            (BackendKind::Record, true) => share(Box::new(RecordBackend::create(path)?)),
            (BackendKind::Record, false) => {
                share(Box::new(RecordBackend::open(path, self.read_only)?))
            }
            (BackendKind::Buffer, _) => {
                return Err(Error::usage(
                    "buffer backends have no file; use create_in_buffer or open_buffer",
                ))
            }
        })
    }
}

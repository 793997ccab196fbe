//! The store engine.
//!
//! [`SharedData`] owns one open container: its backend, the caches of every
//! table it touched, the category and key registry, the row index and the
//! current frame. Operations are split over the submodules by concern:
//!
//! - [`nodes`](self) - node table and links
//! - registry - categories and keys
//! - rows - (owner, category) to row allocation
//! - values - typed attribute reads and writes
//! - frames - current frame, frame names, frame count
//! - sets - node sets of arity 2 to 4
//!
//! All caches are flushed before the backend on [`flush`](SharedData::flush),
//! [`close`](SharedData::close), [`reload`](SharedData::reload) and on drop.

mod frames;
mod nodes;
mod options;
mod registry;
mod rows;
mod sets;
mod values;

use std::path::{Path, PathBuf};

pub use options::{OpenOptions, DEFAULT_COMPRESSION};

use crate::backend::{record, share, Backend, BackendKind, BufferBackend, SharedBackend};
use crate::cache::{Caches, TableCache};
use crate::core::names::{self, MAX_ARITY, TYPE};
use crate::core::{FrameId, NodeId, NodeType};
use crate::util::{Error, IndexTraits, Result, StringTraits};

use registry::Registry;
use rows::RowIndex;

/// One open store.
pub struct SharedData {
    backend: SharedBackend,
    path: Option<PathBuf>,
    options: OpenOptions,
    node_names: TableCache<StringTraits>,
    /// Node data of arity 1 (nodes) to [`MAX_ARITY`] (sets), indexed by arity - 1.
    node_data: Vec<TableCache<IndexTraits>>,
    category_names: TableCache<StringTraits>,
    frame_names: TableCache<StringTraits>,
    /// Key lists and data tables.
    caches: Caches,
    registry: Registry,
    rows: RowIndex,
    /// Unused node slots, popped lowest first.
    free_nodes: Vec<u32>,
    current_frame: FrameId,
}

impl SharedData {
    // ========================================================================
    // Opening
    // ========================================================================

    /// Create (or truncate) a file. The backend follows the extension.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(path, OpenOptions::new())
    }

    pub fn create_with(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        Self::open_with(path, options.create(true))
    }

    /// Open an existing file for writing. The backend follows the magic bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenOptions::new())
    }

    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenOptions::new().read_only(true))
    }

    pub fn open_with(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let backend = options.open_backend(path)?;
        Self::start(backend, Some(path.to_path_buf()), options)
    }

    /// A new store with no file behind it.
    pub fn create_in_buffer() -> Result<Self> {
        let backend = share(Box::new(BufferBackend::new()));
        Self::start(
            backend,
            None,
            OpenOptions::new().backend(BackendKind::Buffer).create(true),
        )
    }

    /// A store decoded from [`to_buffer`](Self::to_buffer) output.
    pub fn open_buffer(bytes: &[u8]) -> Result<Self> {
        let store = record::decode_store(bytes)?;
        let backend = share(Box::new(BufferBackend::from_store(store, false)));
        Self::start(backend, None, OpenOptions::new().backend(BackendKind::Buffer))
    }

    fn start(backend: SharedBackend, path: Option<PathBuf>, options: OpenOptions) -> Result<Self> {
        let mut data = Self {
            node_names: TableCache::new(backend.clone(), 1),
            node_data: (1..=MAX_ARITY)
                .map(|_| TableCache::new(backend.clone(), 2))
                .collect(),
            category_names: TableCache::new(backend.clone(), 1),
            frame_names: TableCache::new(backend.clone(), 1),
            caches: Caches::new(backend.clone()),
            registry: Registry::default(),
            rows: RowIndex::default(),
            free_nodes: Vec::new(),
            current_frame: FrameId::ALL_FRAMES,
            backend,
            path,
            options,
        };
        data.initialize()?;
        data.options = data.options.clone().create(false);
        Ok(data)
    }

    fn initialize(&mut self) -> Result<()> {
        let create = self.options.is_create();
        if create {
            self.backend
                .borrow_mut()
                .set_attribute(names::VERSION_ATTRIBUTE, names::VERSION)?;
        } else {
            let found = self
                .backend
                .borrow()
                .get_attribute(names::VERSION_ATTRIBUTE)
                .unwrap_or_default();
            if found != names::VERSION {
                return Err(Error::UnsupportedVersion {
                    expected: names::VERSION.to_string(),
                    found,
                });
            }
        }

        self.node_names.set(names::NODE_NAME)?;
        for (i, cache) in self.node_data.iter_mut().enumerate() {
            cache.set(names::node_data(i + 1))?;
        }
        self.category_names.set(names::CATEGORY_NAMES)?;
        self.frame_names.set(names::FRAME_NAMES)?;
        self.caches.set_frames_hint(self.options.get_frames_hint());

        if create {
            let root = self.add_node(names::ROOT_NAME, NodeType::Root)?;
            if root != NodeId::ROOT {
                return Err(Error::internal(format!("root created as node {root}")));
            }
        } else {
            if self.get_number_of_nodes() == 0
                || self.node_names.get_value(&[NodeId::ROOT.index()]) != names::ROOT_NAME
            {
                return Err(Error::corrupt("no root node"));
            }
            self.initialize_categories();
            self.initialize_keys()?;
            self.free_nodes = (1..self.get_number_of_nodes())
                .rev()
                .filter(|&i| self.node_data[0].get_value(&[i, TYPE]) < 0)
                .map(|i| i as u32)
                .collect();
        }

        tracing::debug!(
            path = ?self.path,
            create,
            nodes = self.get_number_of_nodes(),
            categories = self.registry.number_of_categories(),
            "initialized store"
        );
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write every cache, then the backend.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_caches()?;
        self.backend.borrow_mut().flush()
    }

    fn flush_caches(&mut self) -> Result<()> {
        self.node_names.flush()?;
        for cache in &mut self.node_data {
            cache.flush()?;
        }
        self.category_names.flush()?;
        self.frame_names.flush()?;
        self.caches.flush()
    }

    /// Flush and close.
    pub fn close(mut self) -> Result<()> {
        tracing::debug!(path = ?self.path, "closing store");
        self.flush()
    }

    /// Flush, drop every cache and index, and read the container again.
    pub fn reload(&mut self) -> Result<()> {
        self.flush()?;
        tracing::debug!(path = ?self.path, "reloading store");

        let backend = match &self.path {
            Some(path) => self.options.open_backend(path)?,
            None => self.backend.clone(),
        };
        let frame = self.current_frame;

        self.node_names.reset(backend.clone())?;
        for table in &mut self.node_data {
            table.reset(backend.clone())?;
        }
        self.category_names.reset(backend.clone())?;
        self.frame_names.reset(backend.clone())?;
        self.caches = Caches::new(backend.clone());
        self.registry = Registry::default();
        self.rows = RowIndex::default();
        self.free_nodes.clear();
        self.current_frame = FrameId::ALL_FRAMES;
        self.backend = backend;

        self.initialize()?;
        self.set_current_frame(frame)
    }

    /// Encode the whole store with the record encoding.
    pub fn to_buffer(&mut self) -> Result<Vec<u8>> {
        self.flush_caches()?;
        let mut backend = self.backend.borrow_mut();
        for name in backend.store().pending_names() {
            backend.load_table(&name)?;
        }
        record::encode_store(backend.store())
    }

    // ========================================================================
    // File metadata
    // ========================================================================

    pub fn get_description(&self) -> String {
        self.get_attribute(names::DESCRIPTION_ATTRIBUTE)
    }

    /// Set the description. Non-empty values must end in a newline.
    pub fn set_description(&mut self, description: &str) -> Result<()> {
        names::audit_multiline(names::DESCRIPTION_ATTRIBUTE, description)?;
        self.backend
            .borrow_mut()
            .set_attribute(names::DESCRIPTION_ATTRIBUTE, description)
    }

    pub fn get_producer(&self) -> String {
        self.get_attribute(names::PRODUCER_ATTRIBUTE)
    }

    /// Set the producer. Non-empty values must end in a newline.
    pub fn set_producer(&mut self, producer: &str) -> Result<()> {
        names::audit_multiline(names::PRODUCER_ATTRIBUTE, producer)?;
        self.backend
            .borrow_mut()
            .set_attribute(names::PRODUCER_ATTRIBUTE, producer)
    }

    fn get_attribute(&self, name: &str) -> String {
        self.backend.borrow().get_attribute(name).unwrap_or_default()
    }

    /// File behind this store; `None` for buffers.
    pub fn get_file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Cross-process locking is not provided.
    pub fn get_supports_locking(&self) -> bool {
        false
    }

    pub fn is_read_only(&self) -> bool {
        self.backend.borrow().is_read_only()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.borrow().kind()
    }

    fn check_writable(&self) -> Result<()> {
        self.backend.borrow().check_writable()
    }
}

impl Drop for SharedData {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(path = ?self.path, error = %e, "failed to flush store on drop");
        }
    }
}

impl std::fmt::Debug for SharedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedData")
            .field("path", &self.path)
            .field("backend", &self.backend_kind())
            .field("nodes", &self.get_number_of_nodes())
            .field("current_frame", &self.current_frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_has_root() {
        let data = SharedData::create_in_buffer().unwrap();
        assert_eq!(data.get_number_of_nodes(), 1);
        assert_eq!(data.get_name(NodeId::ROOT).unwrap(), "root");
        assert_eq!(data.get_type(NodeId::ROOT).unwrap(), NodeType::Root);
        assert_eq!(data.backend_kind(), BackendKind::Buffer);
        assert!(data.get_file_path().is_none());
        assert!(!data.get_supports_locking());
    }

    #[test]
    fn test_description_needs_newline() {
        let mut data = SharedData::create_in_buffer().unwrap();
        assert!(data.set_description("no newline").unwrap_err().is_usage());
        data.set_description("a test file\n").unwrap();
        data.set_producer("").unwrap();
        assert_eq!(data.get_description(), "a test file\n");
        assert_eq!(data.get_producer(), "");
    }

    #[test]
    fn test_version_mismatch() {
        let mut store = crate::backend::TableStore::new();
        store.set_attribute(names::VERSION_ATTRIBUTE, "rmf 0");
        let backend = share(Box::new(BufferBackend::from_store(store, false)));
        match SharedData::start(backend, None, OpenOptions::new()) {
            Err(Error::UnsupportedVersion { expected, found }) => {
                assert_eq!(expected, "rmf 1");
                assert_eq!(found, "rmf 0");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_buffer_round_trip() {
        let mut data = SharedData::create_in_buffer().unwrap();
        data.add_child(NodeId::ROOT, "a", NodeType::Representation)
            .unwrap();
        data.set_description("buffered\n").unwrap();
        let bytes = data.to_buffer().unwrap();

        let back = SharedData::open_buffer(&bytes).unwrap();
        assert_eq!(back.get_number_of_nodes(), 2);
        assert_eq!(back.get_name(NodeId(1)).unwrap(), "a");
        assert_eq!(back.get_description(), "buffered\n");
    }
}

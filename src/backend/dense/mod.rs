//! Dense multi-dimensional array container.
//!
//! Every table is stored whole as a zlib-compressed block inside a
//! group/data container (see [`format`]). Opening reads only the table
//! headers; cells are decoded the first time a table is touched. Flushing
//! writes a complete new container next to the file and renames it over
//! the original, so a crash never leaves a half-written file in place.

mod codec;
pub mod format;
mod reader;
mod writer;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use reader::{DenseReader, TableEntry};
pub use writer::DenseWriter;

use super::{Backend, BackendKind, DenseArray, TableStore};
use crate::core::decompress;
use crate::util::{Error, Result};

/// Backend over a dense container file.
pub struct DenseBackend {
    path: PathBuf,
    store: TableStore,
    /// Open view of the file on disk; dropped once every table is loaded.
    reader: Option<DenseReader>,
    /// Payload position of every table not loaded yet.
    payloads: HashMap<String, u64>,
    read_only: bool,
    compression: u32,
}

impl DenseBackend {
    /// Create (or truncate) a container holding no tables.
    pub fn create(path: &Path, compression: u32) -> Result<Self> {
        let mut backend = Self {
            path: path.to_path_buf(),
            store: TableStore::new(),
            reader: None,
            payloads: HashMap::new(),
            read_only: false,
            compression,
        };
        backend.store.mark_dirty();
        backend.flush()?;
        tracing::debug!(path = %path.display(), "created dense container");
        Ok(backend)
    }

    /// Open an existing container.
    pub fn open(path: &Path, read_only: bool, use_mmap: bool, compression: u32) -> Result<Self> {
        let reader = DenseReader::open(path, use_mmap)?;
        let (attributes, entries) = reader.read_index()?;

        let mut store = TableStore::new();
        store.load_attributes(attributes);
        let mut payloads = HashMap::with_capacity(entries.len());
        for entry in entries {
            payloads.insert(entry.name.clone(), entry.payload);
            store.insert_pending(entry.name, entry.header);
        }

        tracing::debug!(
            path = %path.display(),
            tables = payloads.len(),
            read_only,
            "opened dense container"
        );
        Ok(Self {
            path: path.to_path_buf(),
            store,
            reader: Some(reader),
            payloads,
            read_only,
            compression,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl Backend for DenseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dense
    }

    fn store(&self) -> &TableStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut TableStore {
        &mut self.store
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn load_table(&mut self, name: &str) -> Result<()> {
        if !self.store.is_pending(name) {
            return Ok(());
        }
        let header = self
            .store
            .header(name)
            .ok_or_else(|| Error::internal(format!("no header for table {name}")))?;
        let pos = *self
            .payloads
            .get(name)
            .ok_or_else(|| Error::internal(format!("no payload for table {name}")))?;
        let reader = self
            .reader
            .as_ref()
            .ok_or_else(|| Error::internal("container is no longer open"))?;

        let bytes = decompress(&reader.read_data(pos)?)?;
        let cells = codec::decode_cells(&bytes, header.value_type, header.extent.num_cells())?;
        let table = DenseArray::from_cells(header.value_type, header.extent, cells)?;
        tracing::trace!(table = name, extent = %table.extent(), "loaded table");

        self.payloads.remove(name);
        self.store.insert(name, table);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.read_only || !self.store.is_dirty() {
            return Ok(());
        }
        let _span = tracing::debug_span!("dense_flush", path = %self.path.display()).entered();

        for name in self.store.pending_names() {
            self.load_table(&name)?;
        }
        self.reader = None;

        let tmp = self.temp_path();
        let mut writer = DenseWriter::create(&tmp, self.compression)?;
        let mut offsets = Vec::new();
        for (name, table) in self.store.tables() {
            offsets.push(writer.write_table(name, table)?);
        }
        writer.finish(self.store.attributes(), &offsets)?;
        std::fs::rename(&tmp, &self.path)?;

        self.store.mark_clean();
        tracing::debug!(tables = offsets.len(), "flushed dense container");
        Ok(())
    }
}
